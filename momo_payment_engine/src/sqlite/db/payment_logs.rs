use chrono::Utc;
use log::{debug, trace};
use momo_common::Fcfa;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewPaymentLogEntry, PaymentLogEntry, PaymentLogStatus},
    payment_objects::{PaymentLogQuery, TimeWindow},
    traits::InsertLogResult,
};

/// Appends an entry to the payment log. A unique-index violation (a second matched or unmatched entry for the same
/// transaction id) is reported as [`InsertLogResult::DuplicateTransaction`].
pub async fn insert_log_entry(
    entry: NewPaymentLogEntry,
    conn: &mut SqliteConnection,
) -> Result<InsertLogResult, sqlx::Error> {
    let result = sqlx::query_as::<_, PaymentLogEntry>(
        r#"
            INSERT INTO payment_logs (
                amount,
                customer_phone,
                transaction_id,
                raw_text,
                sender,
                observed_at,
                status,
                matched_order_id,
                received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(entry.amount.value())
    .bind(entry.customer_phone)
    .bind(entry.transaction_id.clone())
    .bind(entry.raw_text)
    .bind(entry.sender)
    .bind(entry.observed_at)
    .bind(entry.status.to_string())
    .bind(entry.matched_order_id.map(|id| id.value()))
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(logged) => {
            trace!("🗃️ Payment log entry #{} ({}) saved", logged.id, logged.status);
            Ok(InsertLogResult::Inserted(logged))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("🗃️ Transaction {} already has a matched or unmatched log entry", entry.transaction_id);
            Ok(InsertLogResult::DuplicateTransaction)
        },
        Err(e) => Err(e),
    }
}

/// The earliest non-ignored entry for the transaction id.
pub async fn fetch_entry_for_transaction(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentLogEntry>, sqlx::Error> {
    let entry = sqlx::query_as(
        "SELECT * FROM payment_logs WHERE transaction_id = $1 AND status <> $2 ORDER BY id ASC LIMIT 1",
    )
    .bind(transaction_id)
    .bind(PaymentLogStatus::Ignored.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(entry)
}

/// The earliest non-ignored entry for the same payer and amount, observed inside `window`.
pub async fn fetch_near_duplicate(
    customer_phone: &str,
    amount: Fcfa,
    window: &TimeWindow,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentLogEntry>, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
        SELECT * FROM payment_logs
        WHERE customer_phone = $1 AND amount = $2 AND status <> $3 AND observed_at >= $4 AND observed_at < $5
        ORDER BY id ASC LIMIT 1
        "#,
    )
    .bind(customer_phone)
    .bind(amount.value())
    .bind(PaymentLogStatus::Ignored.to_string())
    .bind(window.start)
    .bind(window.end)
    .fetch_optional(conn)
    .await?;
    Ok(entry)
}

/// Log entries matching the query, newest first.
pub async fn search_entries(
    query: PaymentLogQuery,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentLogEntry>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM payment_logs WHERE 1 = 1");
    if let Some(status) = query.status {
        builder.push(" AND status = ");
        builder.push_bind(status.to_string());
    }
    if let Some(tid) = query.transaction_id {
        builder.push(" AND transaction_id = ");
        builder.push_bind(tid);
    }
    if let Some(phone) = query.customer_phone {
        builder.push(" AND customer_phone = ");
        builder.push_bind(crate::helpers::phone_key(&phone));
    }
    if let Some(since) = query.since {
        builder.push(" AND received_at >= ");
        builder.push_bind(since);
    }
    builder.push(" ORDER BY received_at DESC, id DESC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit.max(0));
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let entries = builder.build_query_as::<PaymentLogEntry>().fetch_all(conn).await?;
    Ok(entries)
}
