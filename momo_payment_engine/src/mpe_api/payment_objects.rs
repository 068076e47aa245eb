use std::fmt::Display;

use chrono::{DateTime, Days, NaiveDateTime, Utc};
use momo_common::Fcfa;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewPaymentLogEntry, OrderId, PaymentLogEntry, PaymentLogStatus},
    traits::ReconciliationError,
};

/// Notifications shorter than this cannot contain an amount, a phone number and a transaction id.
pub const MIN_NOTIFICATION_LENGTH: usize = 10;

//--------------------------------------     PaymentEvent      ---------------------------------------------------------
/// A recognized, fully parsed payment notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub amount: Fcfa,
    /// Last 9 digits of the payer's number
    pub payer_phone: String,
    /// Empty when the provider omitted it
    pub transaction_id: String,
    pub raw_text: String,
    pub sender: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn has_transaction_id(&self) -> bool {
        !self.transaction_id.is_empty()
    }

    pub fn log_entry(&self, status: PaymentLogStatus) -> NewPaymentLogEntry {
        NewPaymentLogEntry {
            amount: self.amount,
            customer_phone: self.payer_phone.clone(),
            transaction_id: self.transaction_id.clone(),
            raw_text: self.raw_text.clone(),
            sender: self.sender.clone(),
            observed_at: self.observed_at,
            status,
            matched_order_id: None,
        }
    }
}

//--------------------------------------   NotificationInput   ---------------------------------------------------------
/// A raw notification that has passed input validation but has not been parsed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationInput {
    pub raw_text: String,
    pub sender: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl NotificationInput {
    /// Checks the text length and parses the ISO-8601 timestamp. Timestamps without an offset are taken to be UTC.
    pub fn validate(raw_text: &str, sender: Option<&str>, observed_at: &str) -> Result<Self, ReconciliationError> {
        if raw_text.trim().chars().count() < MIN_NOTIFICATION_LENGTH {
            return Err(ReconciliationError::Validation(format!(
                "the notification text must be at least {MIN_NOTIFICATION_LENGTH} characters long"
            )));
        }
        let observed_at = parse_timestamp(observed_at).ok_or_else(|| {
            ReconciliationError::Validation(format!("'{observed_at}' is not an ISO-8601 timestamp"))
        })?;
        let sender = sender.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(Self { raw_text: raw_text.to_string(), sender, observed_at })
    }

    /// The log entry written for text that is not a payment notification.
    pub fn ignored_log_entry(&self) -> NewPaymentLogEntry {
        NewPaymentLogEntry {
            amount: Fcfa::default(),
            customer_phone: String::new(),
            transaction_id: String::new(),
            raw_text: self.raw_text.clone(),
            sender: self.sender.clone(),
            observed_at: self.observed_at,
            status: PaymentLogStatus::Ignored,
            matched_order_id: None,
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|dt| dt.and_utc())
}

//--------------------------------------     IngestResult      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Matched,
    Unmatched,
    Duplicate,
    Ignored,
    /// The notification failed validation and was not logged. The engine reports this case as
    /// [`ReconciliationError::Validation`]; boundaries use this status when they need a uniform reply.
    Rejected,
}

impl Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Matched => "matched",
            Self::Unmatched => "unmatched",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl From<PaymentLogStatus> for IngestStatus {
    fn from(status: PaymentLogStatus) -> Self {
        match status {
            PaymentLogStatus::Matched => Self::Matched,
            PaymentLogStatus::Unmatched => Self::Unmatched,
            PaymentLogStatus::Duplicate => Self::Duplicate,
            PaymentLogStatus::Ignored => Self::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub status: IngestStatus,
    pub order_id: Option<OrderId>,
    /// The payment log entry written for this call. `None` only for rejected notifications.
    pub log_id: Option<i64>,
}

impl IngestResult {
    pub fn rejected() -> Self {
        Self { status: IngestStatus::Rejected, order_id: None, log_id: None }
    }
}

impl From<&PaymentLogEntry> for IngestResult {
    fn from(entry: &PaymentLogEntry) -> Self {
        Self { status: entry.status.into(), order_id: entry.matched_order_id, log_id: Some(entry.id) }
    }
}

//--------------------------------------      TimeWindow       ---------------------------------------------------------
/// A half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The UTC calendar day containing `t`.
    pub fn utc_day_of(t: DateTime<Utc>) -> Self {
        let start = t.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let end = start.checked_add_days(Days::new(1)).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

//--------------------------------------    PaymentLogQuery    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentLogQuery {
    pub status: Option<PaymentLogStatus>,
    pub transaction_id: Option<String>,
    pub customer_phone: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl PaymentLogQuery {
    pub fn with_status(mut self, status: PaymentLogStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_transaction_id<S: Into<String>>(mut self, tid: S) -> Self {
        self.transaction_id = Some(tid.into());
        self
    }

    pub fn with_customer_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps() {
        let input = NotificationInput::validate("Vous avez recu 500 FCFA", Some(" AirtelMoney "), "2024-06-01T10:00:00+01:00")
            .unwrap();
        assert_eq!(input.observed_at, Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        assert_eq!(input.sender.as_deref(), Some("AirtelMoney"));
        let input = NotificationInput::validate("Vous avez recu 500 FCFA", None, "2024-06-01T10:00:00.250").unwrap();
        assert_eq!(input.observed_at, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap() + chrono::Duration::milliseconds(250));
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert!(matches!(
            NotificationInput::validate("short", None, "2024-06-01T10:00:00Z"),
            Err(ReconciliationError::Validation(_))
        ));
        assert!(matches!(
            NotificationInput::validate("Vous avez recu 500 FCFA", None, "yesterday"),
            Err(ReconciliationError::Validation(_))
        ));
    }

    #[test]
    fn utc_day_window() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap();
        let w = TimeWindow::utc_day_of(t);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
        assert!(w.contains(t));
        assert!(!w.contains(w.end));
    }
}
