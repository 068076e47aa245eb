use momo_common::Fcfa;
use thiserror::Error;

use crate::{
    db_types::{NewPaymentLogEntry, PaymentLogEntry},
    payment_objects::{PaymentLogQuery, TimeWindow},
    traits::{data_objects::InsertLogResult, StoreError},
};

/// The append-only log of every payment notification that made it past input validation.
#[allow(async_fn_in_trait)]
pub trait PaymentLogManagement {
    /// The earliest entry carrying `transaction_id`, ignoring entries with `ignored` status.
    async fn fetch_log_entry_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentLogEntry>, ReconciliationError>;

    /// The earliest non-ignored entry for the same payer and amount observed inside `window`.
    async fn fetch_near_duplicate(
        &self,
        customer_phone: &str,
        amount: Fcfa,
        window: &TimeWindow,
    ) -> Result<Option<PaymentLogEntry>, ReconciliationError>;

    /// Appends an entry. A second `matched`/`unmatched` entry for the same non-empty transaction id is refused with
    /// [`InsertLogResult::DuplicateTransaction`] rather than an error.
    async fn insert_log_entry(&self, entry: NewPaymentLogEntry) -> Result<InsertLogResult, ReconciliationError>;

    /// Entries matching the query, newest first.
    async fn search_payment_logs(&self, query: PaymentLogQuery) -> Result<Vec<PaymentLogEntry>, ReconciliationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    #[error("Invalid payment notification: {0}")]
    Validation(String),
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ReconciliationError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retriable())
    }
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(StoreError::from(e))
    }
}
