use anyhow::Result;
use clap::Subcommand;
use momo_payment_engine::{
    db_types::{OrderId, OrderStatusType, PaymentMethod},
    events::EventProducers,
    order_objects::OrderQueryFilter,
    OrderFlowApi,
};

use crate::{formatting::format_orders, store::open_store};

#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    /// Show a single order
    Get {
        #[arg(required = true, index = 1)]
        id: OrderId,
    },
    /// Report whether an order has been paid
    Check {
        #[arg(required = true, index = 1)]
        id: OrderId,
    },
    /// Search for orders. All filters are optional.
    List {
        /// Any number ending in the payer's last nine digits
        #[arg(short, long)]
        phone: Option<String>,
        #[arg(short, long)]
        status: Vec<OrderStatusType>,
        #[arg(short, long)]
        method: Option<PaymentMethod>,
    },
    /// Move an order to a new status (paid, processing, shipped, delivered or cancelled)
    Status {
        #[arg(required = true, index = 1)]
        id: OrderId,
        #[arg(required = true, index = 2)]
        status: OrderStatusType,
    },
    /// Delete an order. Its payment log entries are kept.
    Delete {
        #[arg(required = true, index = 1)]
        id: OrderId,
    },
}

pub async fn handle_orders_command(command: OrdersCommand) -> Result<()> {
    let db = open_store().await?;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    match command {
        OrdersCommand::Get { id } => match api.fetch_order(id).await? {
            Some(order) => println!("{}", serde_json::to_string_pretty(&order)?),
            None => println!("Order {id} does not exist"),
        },
        OrdersCommand::Check { id } => {
            let check = api.check_payment(id).await?;
            println!("{}", serde_json::to_string_pretty(&check)?);
        },
        OrdersCommand::List { phone, status, method } => {
            let mut query = OrderQueryFilter::default();
            query.customer_phone = phone;
            query.payment_method = method;
            query.status = (!status.is_empty()).then_some(status);
            let orders = api.search_orders(query).await?;
            println!("{}", format_orders(&orders));
        },
        OrdersCommand::Status { id, status } => {
            let order = api.update_order_status(id, status).await?;
            println!("Order {id} is now {}", order.status);
        },
        OrdersCommand::Delete { id } => {
            let order = api.delete_order(id).await?;
            println!("Deleted order {id} ({}, {})", order.status, order.total);
        },
    }
    db.pool().close().await;
    Ok(())
}
