use std::{fmt::Debug, sync::Arc};

use log::*;
use momo_common::Fcfa;

use crate::{
    config::ReconciliationConfig,
    db_types::{Order, PaymentLogEntry, PaymentLogStatus},
    dedup_log::{DedupLog, DedupVerdict, NearDuplicatePolicy},
    events::{EventProducers, OrderPaidEvent, PaymentUnmatchedEvent},
    helpers::{parse_sms, ParsedNotification, MAX_NOTIFICATION_AMOUNT},
    payment_matcher::{MatchOutcome, PaymentMatcher},
    payment_objects::{IngestResult, IngestStatus, NotificationInput, PaymentEvent, PaymentLogQuery},
    traits::{PaymentReconciliation, ReconciliationError, SettlementResult},
};

/// `ReconciliationApi` turns forwarded mobile-money SMS notifications into settled orders.
///
/// Every notification that passes input validation leaves exactly one entry in the payment log, whatever the outcome.
/// Delivering the same notification any number of times settles at most one order.
pub struct ReconciliationApi<B> {
    db: B,
    config: ReconciliationConfig,
    dedup: DedupLog<B>,
    matcher: PaymentMatcher<B>,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?})", self.config)
    }
}

impl<B> ReconciliationApi<B>
where B: PaymentReconciliation
{
    pub fn new(db: B, config: ReconciliationConfig, producers: EventProducers) -> Self {
        let dedup = DedupLog::new(db.clone(), Arc::new(config.near_duplicate_window));
        let matcher = PaymentMatcher::new(db.clone(), config.match_tolerance);
        Self { db, config, dedup, matcher, producers }
    }

    /// Replaces the near-duplicate window taken from the configuration.
    pub fn with_near_duplicate_policy<P: NearDuplicatePolicy + 'static>(mut self, policy: P) -> Self {
        self.dedup = DedupLog::new(self.db.clone(), Arc::new(policy));
        self
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Processes one forwarded notification.
    ///
    /// * Input that is too short or carries an unreadable timestamp is rejected with
    ///   [`ReconciliationError::Validation`] and nothing is logged.
    /// * Text that is not a payment notification is logged as `ignored`.
    /// * A recognized notification missing its amount or payer (or its transaction id, when one is required) is
    ///   rejected.
    /// * A repeat of an earlier notification is logged as `duplicate` and reports the order the original settled, if
    ///   any.
    /// * Otherwise the payment settles the best pending order (`matched`), or is logged as `unmatched` and the
    ///   operators are alerted.
    pub async fn ingest_payment_notification(
        &self,
        raw_text: &str,
        sender: Option<&str>,
        observed_at: &str,
    ) -> Result<IngestResult, ReconciliationError> {
        let input = NotificationInput::validate(raw_text, sender, observed_at)?;
        let parsed = parse_sms(&input.raw_text, self.config.classification);
        if !parsed.recognized {
            debug!("🔄️📨️ Text from {:?} is not a payment notification. Ignoring it.", input.sender);
            let (entry, _) = self.dedup.record(input.ignored_log_entry()).await?;
            return Ok(IngestResult::from(&entry));
        }
        let event = self.payment_event(input, parsed)?;
        trace!("🔄️📨️ Payment notification: {} from {} [{}]", event.amount, event.payer_phone, event.transaction_id);

        if let DedupVerdict::Duplicate(prior) = self.dedup.check(&event).await? {
            return self.log_duplicate(&event, Some(prior)).await;
        }

        match self.matcher.settle(&event).await? {
            MatchOutcome::Settled(SettlementResult::Settled { order, entry }) => {
                self.call_order_paid_hook(&order).await;
                Ok(IngestResult::from(&entry))
            },
            MatchOutcome::Settled(SettlementResult::DuplicateTransaction) => {
                let prior = self.db.fetch_log_entry_for_transaction(&event.transaction_id).await?;
                self.log_duplicate(&event, prior).await
            },
            MatchOutcome::Settled(SettlementResult::LostRace) | MatchOutcome::NoCandidate => {
                self.log_unmatched(&event).await
            },
        }
    }

    /// Payment log entries, newest first.
    pub async fn payment_logs(&self, query: PaymentLogQuery) -> Result<Vec<PaymentLogEntry>, ReconciliationError> {
        self.db.search_payment_logs(query).await
    }

    fn payment_event(
        &self,
        input: NotificationInput,
        parsed: ParsedNotification,
    ) -> Result<PaymentEvent, ReconciliationError> {
        let amount = parsed
            .amount
            .filter(|a| a.is_positive())
            .ok_or_else(|| ReconciliationError::Validation("no payment amount was found in the notification".into()))?;
        if amount > Fcfa::from(MAX_NOTIFICATION_AMOUNT) {
            return Err(ReconciliationError::Validation(format!(
                "{amount} exceeds the largest accepted payment of {}",
                Fcfa::from(MAX_NOTIFICATION_AMOUNT)
            )));
        }
        let payer_phone = parsed
            .payer_phone
            .ok_or_else(|| ReconciliationError::Validation("no payer phone number was found in the notification".into()))?;
        let transaction_id = match parsed.transaction_id {
            Some(tid) => tid,
            None if self.config.require_transaction_id => {
                return Err(ReconciliationError::Validation("no transaction id was found in the notification".into()));
            },
            None => String::new(),
        };
        Ok(PaymentEvent {
            amount,
            payer_phone,
            transaction_id,
            raw_text: input.raw_text,
            sender: input.sender,
            observed_at: input.observed_at,
        })
    }

    async fn log_duplicate(
        &self,
        event: &PaymentEvent,
        prior: Option<PaymentLogEntry>,
    ) -> Result<IngestResult, ReconciliationError> {
        let entry = self.dedup.record_duplicate(event.log_entry(PaymentLogStatus::Duplicate)).await?;
        let order_id = prior.and_then(|p| p.matched_order_id);
        info!(
            "🔄️📨️ Payment of {} from {} [{}] is a duplicate (log #{})",
            event.amount, event.payer_phone, event.transaction_id, entry.id
        );
        Ok(IngestResult { status: IngestStatus::Duplicate, order_id, log_id: Some(entry.id) })
    }

    async fn log_unmatched(&self, event: &PaymentEvent) -> Result<IngestResult, ReconciliationError> {
        let (entry, prior) = self.dedup.record(event.log_entry(PaymentLogStatus::Unmatched)).await?;
        if entry.status == PaymentLogStatus::Duplicate {
            let order_id = prior.and_then(|p| p.matched_order_id);
            return Ok(IngestResult { status: IngestStatus::Duplicate, order_id, log_id: Some(entry.id) });
        }
        warn!(
            "🔄️📨️ Payment of {} from {} [{}] does not match any pending order (log #{})",
            event.amount, event.payer_phone, event.transaction_id, entry.id
        );
        self.call_payment_unmatched_hook(&entry).await;
        Ok(IngestResult::from(&entry))
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            if !emitter.publish_event_within(OrderPaidEvent::new(order.clone()), self.config.event_timeout).await {
                warn!("🔄️📦️ Order paid subscribers were not told about order {}", order.id);
            }
        }
    }

    async fn call_payment_unmatched_hook(&self, entry: &PaymentLogEntry) {
        let timeout = self.config.alert_timeout;
        for emitter in &self.producers.payment_unmatched_producer {
            let event = PaymentUnmatchedEvent {
                log_id: entry.id,
                amount: entry.amount,
                payer_phone: entry.customer_phone.clone(),
                transaction_id: entry.transaction_id.clone(),
                observed_at: entry.observed_at,
            };
            if !emitter.publish_event_within(event, timeout).await {
                error!("🔄️🚨️ Could not raise the operator alert for unmatched payment log #{}", entry.id);
            }
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
