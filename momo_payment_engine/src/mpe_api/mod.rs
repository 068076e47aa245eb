//! # Mobile-money payment engine public API
//!
//! The `mpe_api` module exposes the programmatic API of the engine. The API is modular, so that clients can pick the
//! functionality they want.
//!
//! * [`reconciliation_api`] ingests forwarded SMS payment notifications and settles pending orders with them.
//! * [`order_flow_api`] places orders (including wallet-funded ones) and handles administrative status changes and
//!   lookups.
//! * [`wallet_api`] manages customer wallets: top-up requests and claims, their review, and purchases.
//!
//! [`dedup_log`] and [`payment_matcher`] are the building blocks of the reconciliation flow. The `*_objects` modules
//! hold the request and response types.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements the backend traits it needs, plus the event
//! producers it should publish to.
//!
//! ```rust,ignore
//! use momo_payment_engine::{events::EventProducers, ReconciliationApi, ReconciliationConfig, SqliteDatabase, StoreConfig};
//! let db = SqliteDatabase::new(&StoreConfig::from_env_or_default()).await?;
//! // SqliteDatabase implements PaymentReconciliation
//! let api = ReconciliationApi::new(db, ReconciliationConfig::default(), EventProducers::default());
//! let result = api.ingest_payment_notification(text, Some("AirtelMoney"), "2024-06-01T10:00:00Z").await?;
//! ```

pub mod dedup_log;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_matcher;
pub mod payment_objects;
pub mod reconciliation_api;
pub mod wallet_api;
pub mod wallet_objects;
