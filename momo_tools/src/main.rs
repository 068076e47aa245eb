use clap::{Parser, Subcommand};

mod formatting;
mod orders;
mod payments;
mod setup;
mod store;
mod topups;

use crate::{
    orders::{handle_orders_command, OrdersCommand},
    payments::{handle_ingest, handle_logs, IngestParams, LogsParams},
    setup::{handle_setup_command, SetupCommand},
    topups::{handle_topups_command, TopupsCommand},
};

/// Operator tools for the mobile-money payment engine. The database is taken from `MOMO_DATABASE_URL`.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prepare the database
    #[command(subcommand)]
    Setup(SetupCommand),
    /// Feed a forwarded SMS notification to the reconciliation engine
    Ingest(IngestParams),
    /// Inspect the payment log
    Logs(LogsParams),
    /// Inspect or update orders
    #[command(subcommand)]
    Orders(OrdersCommand),
    /// Review wallet top-ups
    #[command(subcommand)]
    Topups(TopupsCommand),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let result = match cli.command {
        Command::Setup(cmd) => handle_setup_command(cmd).await,
        Command::Ingest(params) => handle_ingest(params).await,
        Command::Logs(params) => handle_logs(params).await,
        Command::Orders(cmd) => handle_orders_command(cmd).await,
        Command::Topups(cmd) => handle_topups_command(cmd).await,
    };
    if let Err(e) = result {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
