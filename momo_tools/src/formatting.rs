use momo_payment_engine::{
    db_types::{Order, PaymentLogEntry},
    wallet_objects::TopupSummary,
};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Phone", "Customer", "Total", "Method", "Status", "Reference", "Created At"]);
    orders.iter().for_each(|order| {
        table.add_row(row![
            order.id,
            order.customer.phone,
            order.customer.name,
            order.total.to_string(),
            order.payment_method.to_string(),
            order.status.to_string(),
            order.payment_reference.as_deref().unwrap_or_default(),
            order.created_at.to_string()
        ]);
    });
    markdown_style(&mut table);
    format!("{table}\n")
}

pub fn format_payment_logs(entries: &[PaymentLogEntry]) -> String {
    if entries.is_empty() {
        return "No payment log entries".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Status", "Amount", "Payer", "TID", "Order", "Observed At"]);
    entries.iter().for_each(|entry| {
        table.add_row(row![
            entry.id,
            entry.status.to_string(),
            entry.amount.to_string(),
            entry.customer_phone,
            entry.transaction_id,
            entry.matched_order_id.map(|id| id.to_string()).unwrap_or_default(),
            entry.observed_at.to_string()
        ]);
    });
    markdown_style(&mut table);
    format!("{table}\n")
}

pub fn format_topups(topups: &[TopupSummary]) -> String {
    if topups.is_empty() {
        return "No top-ups".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "User", "Amount", "Status", "Deposit number", "TID", "Reference", "Created At"]);
    topups.iter().for_each(|topup| {
        let tx = &topup.transaction;
        let (number, tid) = match &tx.claim_info {
            Some(claim) => (claim.deposit_number.as_str(), claim.tid.as_str()),
            None => ("", ""),
        };
        table.add_row(row![
            tx.id,
            topup.user_id,
            tx.amount.to_string(),
            tx.status.to_string(),
            number,
            tid,
            tx.reference.as_deref().unwrap_or_default(),
            tx.created_at.to_string()
        ]);
    });
    markdown_style(&mut table);
    format!("{table}\n")
}
