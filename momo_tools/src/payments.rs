use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use log::*;
use momo_payment_engine::{
    alerts::install_alert_hook,
    db_types::PaymentLogStatus,
    events::{EventHandlers, EventHooks},
    payment_objects::PaymentLogQuery,
    ReconciliationApi,
    ReconciliationConfig,
};
use tokio::io::AsyncReadExt;

use crate::{formatting::format_payment_logs, store::open_store};

#[derive(Debug, Args)]
pub struct IngestParams {
    /// The SMS text. Read from stdin when omitted.
    #[arg(short, long)]
    pub text: Option<String>,
    /// The SMS sender, e.g. "AirtelMoney"
    #[arg(short, long)]
    pub sender: Option<String>,
    /// When the SMS was received (ISO-8601). Defaults to now.
    #[arg(short = 'a', long = "at")]
    pub observed_at: Option<String>,
}

#[derive(Debug, Args)]
pub struct LogsParams {
    /// Only show entries with this status (matched, unmatched, duplicate or ignored)
    #[arg(short, long)]
    pub status: Option<PaymentLogStatus>,
    /// Only show entries for this payer
    #[arg(short, long)]
    pub phone: Option<String>,
    /// Only show entries for this transaction id
    #[arg(short, long)]
    pub tid: Option<String>,
    /// Only show entries received after this time (ISO-8601)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,
    #[arg(short, long, default_value = "50")]
    pub limit: i64,
}

pub async fn handle_ingest(params: IngestParams) -> Result<()> {
    let text = match params.text {
        Some(text) => text,
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await.context("Could not read the SMS from stdin")?;
            text
        },
    };
    let observed_at = params.observed_at.unwrap_or_else(|| Utc::now().to_rfc3339());
    let config = ReconciliationConfig::from_env_or_default();

    let mut hooks = EventHooks::default();
    install_alert_hook(&mut hooks, &config)?;
    hooks.on_order_paid(|ev| {
        info!("📦️ Order {} for {} is now paid", ev.order.id, ev.order.total);
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    let tasks = handlers.start_handlers();

    let db = open_store().await?;
    let api = ReconciliationApi::new(db.clone(), config, producers);
    let result = api.ingest_payment_notification(&text, params.sender.as_deref(), &observed_at).await;
    // Handlers stop once the API, and with it every producer, is gone
    drop(api);
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Event handler did not shut down cleanly. {e}");
        }
    }
    db.pool().close().await;
    let result = result?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn handle_logs(params: LogsParams) -> Result<()> {
    let mut query = PaymentLogQuery::default().limit(params.limit);
    query.status = params.status;
    query.customer_phone = params.phone;
    query.transaction_id = params.tid;
    query.since = params.since;
    let db = open_store().await?;
    let api = ReconciliationApi::new(db, ReconciliationConfig::from_env_or_default(), Default::default());
    let entries = api.payment_logs(query).await?;
    println!("{}", format_payment_logs(&entries));
    Ok(())
}
