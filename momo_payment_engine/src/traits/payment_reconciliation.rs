use momo_common::Fcfa;

use crate::{
    db_types::{NewPaymentLogEntry, Order, OrderId},
    order_state::StatusChange,
    traits::{data_objects::SettlementResult, OrderManagement, PaymentLogManagement, ReconciliationError},
};

/// The highest level of behaviour for backends supporting payment reconciliation.
///
/// On top of order storage and the payment log, a backend must be able to find the orders a payment could settle and
/// to settle one of them atomically.
#[allow(async_fn_in_trait)]
pub trait PaymentReconciliation: Clone + OrderManagement + PaymentLogManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Pending `airtel_money` orders placed from `phone_key` (the payer's last 9 digits) whose total lies in
    /// `[min_total, max_total]`, most recent first.
    async fn fetch_payment_candidates(
        &self,
        phone_key: &str,
        min_total: Fcfa,
        max_total: Fcfa,
    ) -> Result<Vec<Order>, ReconciliationError>;

    /// In a single atomic transaction,
    /// * applies `change` to the order if it is still in `change.from` status,
    /// * appends `entry` to the payment log with `matched` status and the order id.
    ///
    /// If the order has moved on, nothing is written and [`SettlementResult::LostRace`] is returned. If the log already
    /// holds a matched or unmatched entry for the transaction id, the order update is rolled back and
    /// [`SettlementResult::DuplicateTransaction`] is returned.
    async fn settle_order_payment(
        &self,
        order_id: OrderId,
        change: &StatusChange,
        entry: NewPaymentLogEntry,
    ) -> Result<SettlementResult, ReconciliationError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconciliationError> {
        Ok(())
    }
}
