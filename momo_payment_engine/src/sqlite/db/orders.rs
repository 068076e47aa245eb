use chrono::Utc;
use log::trace;
use momo_common::Fcfa;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, PaymentMethod},
    helpers::phone_key,
    order_objects::OrderQueryFilter,
    order_state::StatusChange,
};

/// Inserts a new order in `pending_payment` status. This is not atomic. You can embed this call inside a transaction
/// if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let items = serde_json::to_string(&order.items)
        .map_err(|e| sqlx::Error::Protocol(format!("Could not serialize the order items. {e}")))?;
    let key = phone_key(&order.customer.phone);
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                customer_phone,
                phone_key,
                customer_name,
                customer_email,
                address_city,
                address_district,
                address_details,
                items,
                subtotal,
                shipping,
                total,
                status,
                payment_method,
                user_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *;
        "#,
    )
    .bind(order.customer.phone)
    .bind(key)
    .bind(order.customer.name)
    .bind(order.customer.email)
    .bind(order.customer.address.city)
    .bind(order.customer.address.district)
    .bind(order.customer.address.details)
    .bind(items)
    .bind(order.subtotal.value())
    .bind(order.shipping.value())
    .bind(order.total.value())
    .bind(OrderStatusType::PendingPayment.to_string())
    .bind(order.payment_method.to_string())
    .bind(order.user_id)
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.value()).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Phone numbers are compared on their last nine digits. Resulting orders are ordered newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(phone) = query.customer_phone {
        where_clause.push("phone_key = ");
        where_clause.push_bind_unseparated(phone_key(&phone));
    }
    if let Some(method) = query.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method.to_string());
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.to_string());
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Pending Airtel Money orders for the given phone key with a total in `[min_total, max_total]`, most recent first.
pub async fn fetch_payment_candidates(
    key: &str,
    min_total: Fcfa,
    max_total: Fcfa,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE phone_key = $1 AND status = $2 AND payment_method = $3 AND total BETWEEN $4 AND $5
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(key)
    .bind(OrderStatusType::PendingPayment.to_string())
    .bind(PaymentMethod::AirtelMoney.to_string())
    .bind(min_total.value())
    .bind(max_total.value())
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Applies a validated status change, provided the order is still in `change.from` status.
///
/// Lifecycle timestamps are only written if they are unset. The payment reference is only written when it is not
/// empty. Returns `None` if the order does not exist or has already moved on.
pub async fn apply_status_change(
    id: OrderId,
    change: &StatusChange,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let now = Utc::now();
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
    builder.push_bind(change.to.to_string());
    builder.push(", updated_at = ");
    builder.push_bind(now);
    if let Some(stamp) = change.stamp {
        let col = stamp.column();
        builder.push(format!(", {col} = COALESCE({col}, "));
        builder.push_bind(now);
        builder.push(")");
    }
    if let Some(payment) = &change.payment {
        if !payment.reference.is_empty() {
            builder.push(", payment_reference = ");
            builder.push_bind(payment.reference.clone());
        }
        builder.push(", payment_received_at = ");
        builder.push_bind(payment.received_at);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.value());
    builder.push(" AND status = ");
    builder.push_bind(change.from.to_string());
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    Ok(order)
}

pub async fn delete_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("DELETE FROM orders WHERE id = $1 RETURNING *").bind(id.value()).fetch_optional(conn).await?;
    Ok(order)
}
