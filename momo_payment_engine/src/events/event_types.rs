use chrono::{DateTime, Utc};
use momo_common::Fcfa;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, WalletTransaction};

/// Emitted once an order has moved to `paid`, either by a matched mobile-money payment or a wallet checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A payment arrived that could not be applied to any pending order. Operators should follow up by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUnmatchedEvent {
    pub log_id: i64,
    pub amount: Fcfa,
    pub payer_phone: String,
    pub transaction_id: String,
    pub observed_at: DateTime<Utc>,
}

impl PaymentUnmatchedEvent {
    /// The plain-text operator alert.
    pub fn alert_message(&self) -> String {
        let tid = if self.transaction_id.is_empty() { "(aucun)" } else { self.transaction_id.as_str() };
        format!(
            "Paiement non rapproché: {} reçu du {} (TID: {tid}) le {}. Journal #{}.",
            self.amount,
            self.payer_phone,
            self.observed_at.format("%Y-%m-%d %H:%M UTC"),
            self.log_id
        )
    }
}

/// An admin confirmed a wallet top-up and the account was credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupConfirmedEvent {
    pub transaction: WalletTransaction,
    pub balance: Fcfa,
}

impl TopupConfirmedEvent {
    pub fn new(transaction: WalletTransaction, balance: Fcfa) -> Self {
        Self { transaction, balance }
    }
}
