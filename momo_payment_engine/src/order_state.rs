//! The order lifecycle.
//!
//! ```text
//! pending_payment ──► paid ──► processing ──► shipped ──► delivered
//!        │             │            │             │
//!        └─────────────┴────────────┴─────────────┴──────► cancelled
//! ```
//!
//! Every status change, whether it comes from the payment matcher, an admin or a wallet checkout, is first validated
//! here. The result is a [`StatusChange`], which the storage layer applies with a conditional update on the expected
//! prior status.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::OrderStatusType::{self, Cancelled, Delivered, Paid, PendingPayment, Processing, Shipped};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("An order cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatusType,
    pub to: OrderStatusType,
}

/// The lifecycle timestamp a transition stamps, if it is not already set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleStamp {
    PaidAt,
    ShippedAt,
    DeliveredAt,
}

impl LifecycleStamp {
    pub fn column(&self) -> &'static str {
        match self {
            Self::PaidAt => "paid_at",
            Self::ShippedAt => "shipped_at",
            Self::DeliveredAt => "delivered_at",
        }
    }
}

/// Details of the mobile-money payment that settles an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStamp {
    /// Only recorded when non-empty.
    pub reference: String,
    pub received_at: DateTime<Utc>,
}

/// A validated status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatusType,
    pub to: OrderStatusType,
    pub stamp: Option<LifecycleStamp>,
    pub payment: Option<PaymentStamp>,
}

impl StatusChange {
    pub fn with_payment(mut self, payment: PaymentStamp) -> Self {
        self.payment = Some(payment);
        self
    }
}

pub fn allowed_targets(from: OrderStatusType) -> &'static [OrderStatusType] {
    match from {
        PendingPayment => &[Paid, Cancelled],
        Paid => &[Processing, Cancelled],
        Processing => &[Shipped, Cancelled],
        Shipped => &[Delivered, Cancelled],
        Delivered | Cancelled => &[],
    }
}

pub fn transition(from: OrderStatusType, to: OrderStatusType) -> Result<StatusChange, InvalidTransition> {
    if !allowed_targets(from).contains(&to) {
        return Err(InvalidTransition { from, to });
    }
    let stamp = match to {
        Paid => Some(LifecycleStamp::PaidAt),
        Shipped => Some(LifecycleStamp::ShippedAt),
        Delivered => Some(LifecycleStamp::DeliveredAt),
        _ => None,
    };
    Ok(StatusChange { from, to, stamp, payment: None })
}

impl OrderStatusType {
    pub fn can_transition_to(&self, to: OrderStatusType) -> bool {
        allowed_targets(*self).contains(&to)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ALL: [OrderStatusType; 6] = [PendingPayment, Paid, Processing, Shipped, Delivered, Cancelled];

    #[test]
    fn happy_path() {
        let path = [PendingPayment, Paid, Processing, Shipped, Delivered];
        for pair in path.windows(2) {
            assert!(transition(pair[0], pair[1]).is_ok(), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn anything_live_can_be_cancelled() {
        for from in [PendingPayment, Paid, Processing, Shipped] {
            let change = transition(from, Cancelled).unwrap();
            assert_eq!(change.stamp, None);
        }
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for to in ALL {
            assert!(transition(Delivered, to).is_err());
            assert!(transition(Cancelled, to).is_err());
        }
    }

    #[test]
    fn no_skipping_or_going_back() {
        let err = transition(PendingPayment, Delivered).unwrap_err();
        assert_eq!(err, InvalidTransition { from: PendingPayment, to: Delivered });
        assert_eq!(err.to_string(), "An order cannot move from pending_payment to delivered");
        assert!(transition(Shipped, Paid).is_err());
        assert!(transition(Paid, Paid).is_err());
        assert!(!Processing.can_transition_to(PendingPayment));
    }

    #[test]
    fn stamps() {
        assert_eq!(transition(PendingPayment, Paid).unwrap().stamp, Some(LifecycleStamp::PaidAt));
        assert_eq!(transition(Processing, Shipped).unwrap().stamp, Some(LifecycleStamp::ShippedAt));
        assert_eq!(transition(Shipped, Delivered).unwrap().stamp, Some(LifecycleStamp::DeliveredAt));
        assert_eq!(transition(Paid, Processing).unwrap().stamp, None);
        assert_eq!(LifecycleStamp::DeliveredAt.column(), "delivered_at");
    }

    #[test]
    fn exhaustive_table() {
        let allowed = ALL.iter().flat_map(|f| ALL.iter().map(move |t| (*f, *t))).filter(|(f, t)| f.can_transition_to(*t));
        assert_eq!(allowed.count(), 8);
    }
}
