use momo_common::Fcfa;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId},
    order_objects::OrderQueryFilter,
    order_state::{InvalidTransition, StatusChange},
    traits::{data_objects::WalletFundedOrder, StoreError},
};

/// Storage of orders and their lifecycle.
///
/// Backends never decide whether a status change is legal; they receive a [`StatusChange`] that has already been
/// validated by [`crate::order_state`] and apply it only if the order is still in `change.from`.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order in `pending_payment` status.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    /// Atomically debits `user_id`'s wallet for `order.total`, stores the order and marks it `paid`.
    ///
    /// Either all three happen, or none do. If the balance is too low, the error is
    /// [`OrderFlowError::InsufficientBalance`] and nothing is written.
    async fn insert_wallet_funded_order(
        &self,
        user_id: &str,
        order: NewOrder,
        change: &StatusChange,
    ) -> Result<WalletFundedOrder, OrderFlowError>;

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError>;

    /// Orders matching the filter, newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    /// Compare-and-swap on the order status. Returns the updated order, or `None` if the order does not exist or is no
    /// longer in `change.from` status. Losing the race is not an error.
    async fn apply_status_change(&self, order_id: OrderId, change: &StatusChange)
        -> Result<Option<Order>, OrderFlowError>;

    /// Administrative removal. Returns the deleted order, if there was one.
    async fn delete_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error("Invalid order: {0}")]
    Validation(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{0}")]
    InvalidTransition(#[from] InvalidTransition),
    #[error("Insufficient wallet balance. Available: {available}, required: {required}")]
    InsufficientBalance { available: Fcfa, required: Fcfa },
    #[error("Order {0} kept changing while it was being updated. Try again.")]
    ConcurrentModification(OrderId),
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl OrderFlowError {
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::ConcurrentModification(_) => true,
            Self::Store(e) => e.is_retriable(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(StoreError::from(e))
    }
}
