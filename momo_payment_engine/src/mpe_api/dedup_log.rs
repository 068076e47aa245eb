//! Idempotency for payment notifications.
//!
//! The same SMS is routinely delivered more than once, and forwarding apps retry on flaky connections. Every
//! notification that passes input validation is written to the payment log exactly once, and the log is consulted
//! before any matching is attempted:
//!
//! 1. A notification with a transaction id is a duplicate if any earlier entry (other than an `ignored` one) carries
//!    the same id.
//! 2. A notification without a transaction id is a duplicate if an earlier entry for the same payer and amount falls
//!    inside the window given by the [`NearDuplicatePolicy`]. The default window is the UTC calendar day, which means
//!    two genuine identical payments on the same day are folded into one. Operators can pick a narrower window.
//!
//! The first rule is also enforced by the store, so two concurrent deliveries of the same notification cannot both
//! be logged as fresh.
use std::{fmt::Debug, str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{ConversionError, NewPaymentLogEntry, PaymentLogEntry, PaymentLogStatus},
    payment_objects::{PaymentEvent, TimeWindow},
    traits::{InsertLogResult, PaymentLogManagement, ReconciliationError},
};

/// Decides how close in time two transaction-id-less payments of the same amount from the same payer must be to count
/// as one.
pub trait NearDuplicatePolicy: Send + Sync + Debug {
    /// `None` disables near-duplicate detection.
    fn window_for(&self, observed_at: DateTime<Utc>) -> Option<TimeWindow>;
}

/// The widest rolling window accepted. Longer windows are shortened to this.
pub const MAX_ROLLING_WINDOW: Duration = Duration::from_secs(366 * 24 * 3600);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NearDuplicateWindow {
    /// The UTC calendar day of the notification.
    #[default]
    SameUtcDay,
    /// Anything observed within this long before or after the notification.
    Rolling(Duration),
    Disabled,
}

impl NearDuplicatePolicy for NearDuplicateWindow {
    fn window_for(&self, observed_at: DateTime<Utc>) -> Option<TimeWindow> {
        match self {
            Self::SameUtcDay => Some(TimeWindow::utc_day_of(observed_at)),
            Self::Rolling(d) => {
                let d = (*d).min(MAX_ROLLING_WINDOW);
                let d = chrono::Duration::from_std(d).unwrap_or(chrono::Duration::days(366));
                let start = observed_at.checked_sub_signed(d).unwrap_or(DateTime::<Utc>::MIN_UTC);
                let end = observed_at.checked_add_signed(d).unwrap_or(DateTime::<Utc>::MAX_UTC);
                Some(TimeWindow::new(start, end))
            },
            Self::Disabled => None,
        }
    }
}

/// Accepts `same_utc_day`, `disabled`, or a duration such as `900`, `900s`, `15m` or `2h`, up to
/// [`MAX_ROLLING_WINDOW`].
impl FromStr for NearDuplicateWindow {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "same_utc_day" | "utc_day" | "day" => return Ok(Self::SameUtcDay),
            "disabled" | "off" | "none" => return Ok(Self::Disabled),
            _ => {},
        }
        let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
            Some(idx) => s.split_at(idx),
            None => (s.as_str(), "s"),
        };
        let n = digits.parse::<u64>().map_err(|e| ConversionError(format!("Invalid window {s}: {e}")))?;
        let secs = match unit {
            "s" => Some(n),
            "m" => n.checked_mul(60),
            "h" => n.checked_mul(3600),
            _ => return Err(ConversionError(format!("Invalid window unit in {s}"))),
        };
        match secs.map(Duration::from_secs) {
            Some(window) if window <= MAX_ROLLING_WINDOW => Ok(Self::Rolling(window)),
            _ => {
                let days = MAX_ROLLING_WINDOW.as_secs() / 86_400;
                Err(ConversionError(format!("Window {s} is longer than {days} days")))
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupVerdict {
    Fresh,
    /// The earlier entry this notification repeats.
    Duplicate(PaymentLogEntry),
}

#[derive(Clone)]
pub struct DedupLog<B> {
    db: B,
    policy: Arc<dyn NearDuplicatePolicy>,
}

impl<B> Debug for DedupLog<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DedupLog ({:?})", self.policy)
    }
}

impl<B> DedupLog<B>
where B: PaymentLogManagement
{
    pub fn new(db: B, policy: Arc<dyn NearDuplicatePolicy>) -> Self {
        Self { db, policy }
    }

    pub async fn check(&self, event: &PaymentEvent) -> Result<DedupVerdict, ReconciliationError> {
        let prior = if event.has_transaction_id() {
            self.db.fetch_log_entry_for_transaction(&event.transaction_id).await?
        } else {
            match self.policy.window_for(event.observed_at) {
                Some(window) => self.db.fetch_near_duplicate(&event.payer_phone, event.amount, &window).await?,
                None => None,
            }
        };
        Ok(match prior {
            Some(entry) => {
                debug!(
                    "🔄️🧾️ Payment of {} from {} repeats log entry #{} ({})",
                    event.amount, event.payer_phone, entry.id, entry.status
                );
                DedupVerdict::Duplicate(entry)
            },
            None => DedupVerdict::Fresh,
        })
    }

    /// Appends `entry`. If another call logged the same transaction id first, the entry is recorded as a duplicate
    /// instead, and the earlier entry is returned alongside.
    pub async fn record(
        &self,
        entry: NewPaymentLogEntry,
    ) -> Result<(PaymentLogEntry, Option<PaymentLogEntry>), ReconciliationError> {
        let tid = entry.transaction_id.clone();
        match self.db.insert_log_entry(entry.clone()).await? {
            InsertLogResult::Inserted(logged) => Ok((logged, None)),
            InsertLogResult::DuplicateTransaction => {
                debug!("🔄️🧾️ Transaction {tid} was logged by a concurrent call. Recording a duplicate.");
                let prior = self.db.fetch_log_entry_for_transaction(&tid).await?;
                let logged = self.record_duplicate(entry).await?;
                Ok((logged, prior))
            },
        }
    }

    pub async fn record_duplicate(&self, entry: NewPaymentLogEntry) -> Result<PaymentLogEntry, ReconciliationError> {
        let entry = NewPaymentLogEntry { matched_order_id: None, ..entry }.with_status(PaymentLogStatus::Duplicate);
        match self.db.insert_log_entry(entry).await? {
            InsertLogResult::Inserted(logged) => Ok(logged),
            InsertLogResult::DuplicateTransaction => Err(ReconciliationError::Store(crate::traits::StoreError::Database(
                "duplicate entries must always be accepted by the payment log".into(),
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn window_parsing() {
        assert_eq!("same_utc_day".parse::<NearDuplicateWindow>().unwrap(), NearDuplicateWindow::SameUtcDay);
        assert_eq!("OFF".parse::<NearDuplicateWindow>().unwrap(), NearDuplicateWindow::Disabled);
        assert_eq!("900".parse::<NearDuplicateWindow>().unwrap(), NearDuplicateWindow::Rolling(Duration::from_secs(900)));
        assert_eq!("15m".parse::<NearDuplicateWindow>().unwrap(), NearDuplicateWindow::Rolling(Duration::from_secs(900)));
        assert_eq!("2h".parse::<NearDuplicateWindow>().unwrap(), NearDuplicateWindow::Rolling(Duration::from_secs(7200)));
        assert!("2d".parse::<NearDuplicateWindow>().is_err());
        assert!("soon".parse::<NearDuplicateWindow>().is_err());
    }

    #[test]
    fn windows() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let day = NearDuplicateWindow::SameUtcDay.window_for(t).unwrap();
        assert_eq!(day, TimeWindow::utc_day_of(t));
        let rolling = NearDuplicateWindow::Rolling(Duration::from_secs(600)).window_for(t).unwrap();
        assert!(rolling.contains(t - chrono::Duration::minutes(10)));
        assert!(!rolling.contains(t + chrono::Duration::minutes(10)));
        assert_eq!(NearDuplicateWindow::Disabled.window_for(t), None);
    }

    #[test]
    fn oversized_windows() {
        assert!("18446744073709551615h".parse::<NearDuplicateWindow>().is_err());
        assert!("99999999999999999m".parse::<NearDuplicateWindow>().is_err());
        assert!("367d".parse::<NearDuplicateWindow>().is_err());
        assert!("8785h".parse::<NearDuplicateWindow>().is_err());
        assert_eq!("8784h".parse::<NearDuplicateWindow>().unwrap(), NearDuplicateWindow::Rolling(MAX_ROLLING_WINDOW));

        let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let huge = NearDuplicateWindow::Rolling(Duration::from_secs(u64::MAX)).window_for(t).unwrap();
        let capped = NearDuplicateWindow::Rolling(MAX_ROLLING_WINDOW).window_for(t).unwrap();
        assert_eq!(huge, capped);
        assert!(huge.contains(t - chrono::Duration::days(300)));
        let edge = NearDuplicateWindow::Rolling(MAX_ROLLING_WINDOW).window_for(DateTime::<Utc>::MAX_UTC);
        assert!(edge.is_some());
    }
}
