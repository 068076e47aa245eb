//! Pairs a payment with the pending order it settles.
//!
//! An order is a candidate when it is awaiting payment, was placed with Airtel Money, was placed from the payer's
//! number (compared on the last 9 digits) and its total is within the configured tolerance of the amount. Among the
//! candidates, the closest total wins; equally close candidates are resolved in favour of the most recent order.
//!
//! Settling is a compare-and-swap on the order status, committed together with the `matched` log entry. If another
//! payment settles the chosen order first, this payment is reported as unmatched. Other candidates are not tried.
use momo_common::Fcfa;
use log::*;

use crate::{
    db_types::{Order, OrderStatusType, PaymentLogStatus},
    order_state::{transition, PaymentStamp},
    payment_objects::PaymentEvent,
    traits::{PaymentReconciliation, ReconciliationError, SettlementResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Settled(SettlementResult),
    NoCandidate,
}

/// Picks the candidate whose total is closest to `amount`. `candidates` must be ordered most recent first, so that ties
/// go to the newest order.
pub fn select_candidate(candidates: &[Order], amount: Fcfa) -> Option<&Order> {
    // min_by_key keeps the first of several equal minima
    candidates.iter().min_by_key(|o| o.total.distance(amount))
}

#[derive(Debug, Clone)]
pub struct PaymentMatcher<B> {
    db: B,
    tolerance: Fcfa,
}

impl<B> PaymentMatcher<B>
where B: PaymentReconciliation
{
    pub fn new(db: B, tolerance: Fcfa) -> Self {
        Self { db, tolerance: tolerance.abs() }
    }

    pub fn tolerance(&self) -> Fcfa {
        self.tolerance
    }

    pub async fn find_candidates(&self, event: &PaymentEvent) -> Result<Vec<Order>, ReconciliationError> {
        let min = event.amount.saturating_sub(self.tolerance);
        let max = event.amount.saturating_add(self.tolerance);
        self.db.fetch_payment_candidates(&event.payer_phone, min, max).await
    }

    /// Tries to settle the best candidate for `event`. On success the order is `paid` and the `matched` log entry has
    /// been written. Otherwise nothing has been written.
    pub async fn settle(&self, event: &PaymentEvent) -> Result<MatchOutcome, ReconciliationError> {
        let candidates = self.find_candidates(event).await?;
        let Some(order) = select_candidate(&candidates, event.amount) else {
            debug!("🔄️💰️ No pending order from {} within {} of {}", event.payer_phone, self.tolerance, event.amount);
            return Ok(MatchOutcome::NoCandidate);
        };
        trace!(
            "🔄️💰️ {} candidate(s) for {} from {}. Trying order {} ({}).",
            candidates.len(),
            event.amount,
            event.payer_phone,
            order.id,
            order.total
        );
        // Candidates are pending by construction, so this cannot fail.
        let change = transition(OrderStatusType::PendingPayment, OrderStatusType::Paid)
            .map_err(|e| ReconciliationError::Validation(e.to_string()))?
            .with_payment(PaymentStamp { reference: event.transaction_id.clone(), received_at: event.observed_at });
        let entry = event.log_entry(PaymentLogStatus::Matched).with_matched_order(order.id);
        let result = self.db.settle_order_payment(order.id, &change, entry).await?;
        match &result {
            SettlementResult::Settled { order, .. } => {
                info!("🔄️💰️ Payment of {} from {} settled order {}", event.amount, event.payer_phone, order.id);
            },
            SettlementResult::LostRace => {
                info!("🔄️💰️ Order {} was settled by another payment before {} could be applied", order.id, event.amount);
            },
            SettlementResult::DuplicateTransaction => {
                debug!("🔄️💰️ Transaction {} was logged concurrently. Not settling order {}", event.transaction_id, order.id);
            },
        }
        Ok(MatchOutcome::Settled(result))
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::db_types::{Customer, OrderId, PaymentMethod};

    fn order(id: i64, total: i64, age_mins: i64) -> Order {
        let t = Utc::now() - Duration::minutes(age_mins);
        Order {
            id: OrderId(id),
            customer: Customer { phone: "237677123456".into(), ..Default::default() },
            items: vec![],
            subtotal: Fcfa::from(total),
            shipping: Fcfa::from(0),
            total: Fcfa::from(total),
            status: OrderStatusType::PendingPayment,
            payment_method: PaymentMethod::AirtelMoney,
            payment_reference: None,
            payment_received_at: None,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            user_id: None,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn closest_total_wins() {
        let candidates = vec![order(3, 5_080, 1), order(2, 5_010, 5), order(1, 4_950, 10)];
        assert_eq!(select_candidate(&candidates, Fcfa::from(5_000)).unwrap().id, OrderId(2));
    }

    #[test]
    fn ties_go_to_the_most_recent_order() {
        let candidates = vec![order(7, 5_050, 1), order(4, 4_950, 30)];
        assert_eq!(select_candidate(&candidates, Fcfa::from(5_000)).unwrap().id, OrderId(7));
        let candidates = vec![order(9, 5_000, 2), order(8, 5_000, 3)];
        assert_eq!(select_candidate(&candidates, Fcfa::from(5_000)).unwrap().id, OrderId(9));
    }

    #[test]
    fn nothing_to_choose_from() {
        assert!(select_candidate(&[], Fcfa::from(5_000)).is_none());
    }
}
