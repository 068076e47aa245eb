//! Mobile-money Payment Engine
//!
//! The engine reconciles forwarded Airtel Money "money received" SMS notifications against pending orders, and keeps
//! an internal wallet ledger that customers can top up and spend from. It guarantees that every payment settles at
//! most one order, and that every balance change is atomic and explained by a ledger entry.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@traits`] and, with the `sqlite` feature, [`SqliteDatabase`]). The traits describe what a backend
//!    must provide; the SQLite backend implements all of them. The data types used in the database are defined in
//!    [`mod@db_types`] and are public.
//! 2. The pure building blocks: the SMS parser in [`mod@helpers`] and the order lifecycle in [`mod@order_state`].
//! 3. The public API ([`ReconciliationApi`], [`OrderFlowApi`] and [`WalletApi`]), configured with
//!    [`ReconciliationConfig`].
//!
//! The engine also emits events that can be subscribed to (see [`mod@events`]), such as `OrderPaidEvent` when an order
//! is settled, or `PaymentUnmatchedEvent` when a payment could not be reconciled. [`mod@alerts`] turns the latter into
//! operator alerts.
pub mod alerts;
pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_state;
pub mod traits;

mod mpe_api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::{ReconciliationConfig, StoreConfig};
pub use mpe_api::{
    dedup_log,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_matcher,
    payment_objects,
    reconciliation_api::ReconciliationApi,
    wallet_api::WalletApi,
    wallet_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase};
pub use traits::{
    OrderFlowError,
    OrderManagement,
    PaymentLogManagement,
    PaymentReconciliation,
    ReconciliationError,
    StoreError,
    WalletError,
    WalletManagement,
};
