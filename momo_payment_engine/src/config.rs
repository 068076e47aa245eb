//! Engine configuration.
//!
//! The engine never reads the environment on its own. Binaries build a [`ReconciliationConfig`] and a [`StoreConfig`]
//! (usually with `from_env_or_default`) and hand them to the APIs and the database backend at construction time.
use std::{env, time::Duration};

use log::*;
use momo_common::{parse_boolean_flag, parse_or_default, Fcfa, Secret};

use crate::{dedup_log::NearDuplicateWindow, helpers::ClassificationPolicy};

pub const DEFAULT_MATCH_TOLERANCE: i64 = 100;
pub const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/momo_store.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct ReconciliationConfig {
    /// How far a payment may be from an order total and still settle it.
    pub match_tolerance: Fcfa,
    pub classification: ClassificationPolicy,
    /// When false, recognized notifications without a `TID:` are processed with an empty transaction id and rely on
    /// the near-duplicate window for deduplication.
    pub require_transaction_id: bool,
    pub near_duplicate_window: NearDuplicateWindow,
    /// The longest an ingest call will wait to hand an operator alert over.
    pub alert_timeout: Duration,
    /// Where operator alerts are POSTed. Alerts are only logged when this is unset.
    pub alert_webhook_url: Option<Secret<String>>,
    pub event_buffer_size: usize,
    /// The longest an API call waits, after committing, to hand an event to a busy subscriber.
    pub event_timeout: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            match_tolerance: Fcfa::from(DEFAULT_MATCH_TOLERANCE),
            classification: ClassificationPolicy::default(),
            require_transaction_id: true,
            near_duplicate_window: NearDuplicateWindow::default(),
            alert_timeout: DEFAULT_ALERT_TIMEOUT,
            alert_webhook_url: None,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            event_timeout: DEFAULT_EVENT_TIMEOUT,
        }
    }
}

impl ReconciliationConfig {
    pub fn with_match_tolerance(mut self, tolerance: Fcfa) -> Self {
        self.match_tolerance = tolerance;
        self
    }

    pub fn with_classification(mut self, policy: ClassificationPolicy) -> Self {
        self.classification = policy;
        self
    }

    pub fn with_require_transaction_id(mut self, required: bool) -> Self {
        self.require_transaction_id = required;
        self
    }

    pub fn with_near_duplicate_window(mut self, window: NearDuplicateWindow) -> Self {
        self.near_duplicate_window = window;
        self
    }

    pub fn with_alert_timeout(mut self, timeout: Duration) -> Self {
        self.alert_timeout = timeout;
        self
    }

    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let tolerance = parse_or_default(env::var("MOMO_MATCH_TOLERANCE").ok(), DEFAULT_MATCH_TOLERANCE, |s, e| {
            error!("🪛️ {s} is not a valid MOMO_MATCH_TOLERANCE. {e}. Using {DEFAULT_MATCH_TOLERANCE} instead.")
        });
        let match_tolerance = if tolerance < 0 {
            warn!("🪛️ MOMO_MATCH_TOLERANCE cannot be negative. Using {DEFAULT_MATCH_TOLERANCE} instead.");
            defaults.match_tolerance
        } else {
            Fcfa::from(tolerance)
        };
        let classification = parse_or_default(env::var("MOMO_SMS_CLASSIFICATION").ok(), defaults.classification, |s, e| {
            error!("🪛️ {s} is not a valid MOMO_SMS_CLASSIFICATION (strict or lenient). {e}. Using strict instead.")
        });
        let require_transaction_id =
            parse_boolean_flag(env::var("MOMO_REQUIRE_TRANSACTION_ID").ok(), defaults.require_transaction_id);
        let near_duplicate_window =
            parse_or_default(env::var("MOMO_NEAR_DUPLICATE_WINDOW").ok(), defaults.near_duplicate_window, |s, e| {
                error!("🪛️ {s} is not a valid MOMO_NEAR_DUPLICATE_WINDOW. {e}. Using the same-UTC-day window instead.")
            });
        let alert_timeout = millis_from_env("MOMO_ALERT_TIMEOUT_MS", defaults.alert_timeout);
        let alert_webhook_url = env::var("MOMO_ALERT_WEBHOOK_URL").ok().filter(|s| !s.trim().is_empty()).map(Secret::new);
        if alert_webhook_url.is_none() {
            info!("🪛️ MOMO_ALERT_WEBHOOK_URL is not set. Operator alerts will only be logged.");
        }
        let event_buffer_size =
            parse_or_default(env::var("MOMO_EVENT_BUFFER_SIZE").ok(), defaults.event_buffer_size, |s, e| {
                error!("🪛️ {s} is not a valid MOMO_EVENT_BUFFER_SIZE. {e}. Using {DEFAULT_EVENT_BUFFER_SIZE} instead.")
            });
        let event_timeout = millis_from_env("MOMO_EVENT_TIMEOUT_MS", defaults.event_timeout);
        Self {
            match_tolerance,
            classification,
            require_transaction_id,
            near_duplicate_window,
            alert_timeout,
            alert_webhook_url,
            event_buffer_size,
            event_timeout,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// How long to wait for a pooled connection before giving up with a retriable error.
    pub acquire_timeout: Duration,
    /// How long SQLite waits on a locked database before giving up with a retriable error.
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl StoreConfig {
    pub fn new<S: Into<String>>(database_url: S) -> Self {
        Self { database_url: database_url.into(), ..Default::default() }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn from_env_or_default() -> Self {
        let database_url = env::var("MOMO_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ MOMO_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections =
            parse_or_default(env::var("MOMO_DB_MAX_CONNECTIONS").ok(), DEFAULT_MAX_CONNECTIONS, |s, e| {
                error!("🪛️ {s} is not a valid MOMO_DB_MAX_CONNECTIONS. {e}. Using {DEFAULT_MAX_CONNECTIONS} instead.")
            });
        let acquire_timeout = millis_from_env("MOMO_DB_ACQUIRE_TIMEOUT_MS", DEFAULT_ACQUIRE_TIMEOUT);
        let busy_timeout = millis_from_env("MOMO_DB_BUSY_TIMEOUT_MS", DEFAULT_BUSY_TIMEOUT);
        Self { database_url, max_connections: max_connections.max(1), acquire_timeout, busy_timeout }
    }
}

fn millis_from_env(var: &str, default: Duration) -> Duration {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    let ms = parse_or_default(env::var(var).ok(), default_ms, |s, e| {
        error!("🪛️ {s} is not a valid value for {var}. {e}. Using {default_ms}ms instead.")
    });
    Duration::from_millis(ms)
}
