use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{
    config::DEFAULT_EVENT_TIMEOUT,
    db_types::{Order, OrderId, OrderStatusType, PaymentMethod},
    events::{EventProducers, OrderPaidEvent},
    order_objects::{CreateOrderRequest, OrderCreated, OrderQueryFilter, PaymentCheck},
    order_state::transition,
    traits::{OrderFlowError, OrderManagement},
};

/// How many times an administrative status change is re-validated after losing a race before giving up.
pub const MAX_STATUS_CHANGE_ATTEMPTS: usize = 3;

/// `OrderFlowApi` is the primary API for placing orders and moving them through their lifecycle.
///
/// Mobile-money orders are created `pending_payment` and are settled by the
/// [`ReconciliationApi`](crate::ReconciliationApi). Wallet orders are paid on creation.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    event_timeout: Duration,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, event_timeout: DEFAULT_EVENT_TIMEOUT }
    }

    /// Sets how long a committed change waits on a full subscriber channel before the event is dropped.
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Validates and stores a new order.
    ///
    /// When the payment method is `wallet`, the customer's wallet is debited for the order total, the order is stored
    /// and marked `paid` as a single atomic unit. If the balance is too low, [`OrderFlowError::InsufficientBalance`] is
    /// returned and no order is created.
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderCreated, OrderFlowError> {
        let order = request.into_new_order()?;
        match (order.payment_method, order.user_id.clone()) {
            (PaymentMethod::Wallet, Some(user_id)) => {
                let change = transition(OrderStatusType::PendingPayment, OrderStatusType::Paid)?;
                let funded = self.db.insert_wallet_funded_order(&user_id, order, &change).await?;
                info!(
                    "🔄️📦️ Wallet order {} for {} paid by {user_id} (wallet transaction #{})",
                    funded.order.id, funded.order.total, funded.debit.id
                );
                self.call_order_paid_hook(&funded.order).await;
                Ok(OrderCreated::from(&funded.order))
            },
            (PaymentMethod::Wallet, None) => {
                Err(OrderFlowError::Validation("wallet payments require an authenticated user".into()))
            },
            _ => {
                let order = self.db.insert_order(order).await?;
                info!(
                    "🔄️📦️ Order {} for {} awaiting {} payment from {}",
                    order.id, order.total, order.payment_method, order.customer.phone
                );
                Ok(OrderCreated::from(&order))
            },
        }
    }

    /// Administrative status change.
    ///
    /// The change is validated against the order's current status and applied only if that status has not changed
    /// in the meantime. If it has, the change is validated again against the new status, up to
    /// [`MAX_STATUS_CHANGE_ATTEMPTS`] times.
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, OrderFlowError> {
        for attempt in 1..=MAX_STATUS_CHANGE_ATTEMPTS {
            let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
            let change = transition(order.status, new_status)?;
            match self.db.apply_status_change(order_id, &change).await? {
                Some(updated) => {
                    info!("🔄️📦️ Order {order_id} moved from {} to {}", change.from, change.to);
                    if change.to == OrderStatusType::Paid {
                        self.call_order_paid_hook(&updated).await;
                    }
                    return Ok(updated);
                },
                None => {
                    debug!("🔄️📦️ Order {order_id} changed while moving it to {new_status} (attempt {attempt})");
                },
            }
        }
        warn!("🔄️📦️ Gave up moving order {order_id} to {new_status} after {MAX_STATUS_CHANGE_ATTEMPTS} attempts");
        Err(OrderFlowError::ConcurrentModification(order_id))
    }

    pub async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order(order_id).await
    }

    /// Orders matching the filter, newest first.
    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️📦️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    pub async fn check_payment(&self, order_id: OrderId) -> Result<PaymentCheck, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        Ok(PaymentCheck::from(&order))
    }

    /// Removes an order. Payment log entries that refer to it are kept.
    pub async fn delete_order(&self, order_id: OrderId) -> Result<Order, OrderFlowError> {
        let order = self.db.delete_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        info!("🔄️📦️ Order {order_id} ({}) has been deleted", order.status);
        Ok(order)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            if !emitter.publish_event_within(OrderPaidEvent::new(order.clone()), self.event_timeout).await {
                warn!("🔄️📦️ Order paid subscribers were not told about order {}", order.id);
            }
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
