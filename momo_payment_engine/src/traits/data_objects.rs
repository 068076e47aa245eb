use serde::{Deserialize, Serialize};

use crate::db_types::{Order, PaymentLogEntry, WalletTransaction};

/// The outcome of appending to the payment log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertLogResult {
    Inserted(PaymentLogEntry),
    /// Another matched or unmatched entry already carries this transaction id.
    DuplicateTransaction,
}

/// The outcome of [`PaymentReconciliation::settle_order_payment`](crate::traits::PaymentReconciliation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    Settled { order: Order, entry: PaymentLogEntry },
    /// The order was no longer awaiting payment.
    LostRace,
    /// A concurrent call recorded the same transaction id first. Nothing was written.
    DuplicateTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFundedOrder {
    pub order: Order,
    pub debit: WalletTransaction,
}
