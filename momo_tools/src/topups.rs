use anyhow::Result;
use clap::Subcommand;
use log::*;
use momo_payment_engine::{
    db_types::WalletTransactionStatus,
    events::{EventHandlers, EventHooks},
    ReconciliationConfig,
    SqliteDatabase,
    WalletApi,
};

use crate::{formatting::format_topups, store::open_store};

#[derive(Debug, Subcommand)]
pub enum TopupsCommand {
    /// List top-ups in the given status, pending ones by default
    List {
        #[arg(short, long, default_value = "pending")]
        status: WalletTransactionStatus,
    },
    /// Confirm that the money arrived and credit the customer's wallet
    Confirm {
        #[arg(required = true, index = 1)]
        id: i64,
        /// The mobile-money transaction id of the deposit
        #[arg(short, long)]
        reference: Option<String>,
    },
    /// Refuse a top-up. The wallet is not credited.
    Refuse {
        #[arg(required = true, index = 1)]
        id: i64,
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Compare a wallet's balance with its ledger
    Audit {
        #[arg(required = true, index = 1)]
        user_id: String,
    },
}

pub async fn handle_topups_command(command: TopupsCommand) -> Result<()> {
    let mut hooks = EventHooks::default();
    hooks.on_topup_confirmed(|ev| {
        info!("👛️ Top-up #{} credited. New balance: {}", ev.transaction.id, ev.balance);
        Box::pin(async {})
    });
    let config = ReconciliationConfig::from_env_or_default();
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    let tasks = handlers.start_handlers();
    let db = open_store().await?;
    let api = WalletApi::new(db.clone(), producers).with_event_timeout(config.event_timeout);
    let result = run(&api, command).await;
    drop(api);
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Event handler did not shut down cleanly. {e}");
        }
    }
    db.pool().close().await;
    result
}

async fn run(api: &WalletApi<SqliteDatabase>, command: TopupsCommand) -> Result<()> {
    match command {
        TopupsCommand::List { status } => {
            let topups = api.list_topups(status).await?;
            println!("{}", format_topups(&topups));
        },
        TopupsCommand::Confirm { id, reference } => {
            let confirmation = api.confirm_topup(id, reference).await?;
            if confirmation.credited {
                println!("Top-up #{id} confirmed. The wallet balance is now {}", confirmation.balance);
            } else {
                println!("Top-up #{id} had already been confirmed. The wallet balance is {}", confirmation.balance);
            }
        },
        TopupsCommand::Refuse { id, reason } => {
            let tx = api.refuse_topup(id, reason).await?;
            println!("Top-up #{id} refused ({})", tx.reference.unwrap_or_default());
        },
        TopupsCommand::Audit { user_id } => {
            let audit = api.audit_balance(&user_id).await?;
            let verdict = if audit.is_consistent() { "consistent" } else { "INCONSISTENT" };
            println!("Wallet of {}: recorded {}, ledger {} ({verdict})", audit.user_id, audit.recorded, audit.computed);
        },
    }
    Ok(())
}
