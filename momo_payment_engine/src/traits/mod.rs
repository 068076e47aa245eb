//! # Storage backend contracts
//!
//! This module defines the behaviour that database backends need to expose in order to be driven by the engine APIs.
//!
//! * [`PaymentReconciliation`] is the highest level of behaviour. It finds the orders a payment could settle and
//!   settles one atomically, alongside its log entry.
//! * [`OrderManagement`] stores orders and applies validated status changes with compare-and-swap semantics.
//! * [`PaymentLogManagement`] is the append-only log used to detect duplicate notifications.
//! * [`WalletManagement`] is the wallet ledger.
//!
//! Errors from the store itself are reported as [`StoreError`], which every API error wraps.
mod data_objects;
mod order_management;
mod payment_log_management;
mod payment_reconciliation;
mod store_error;
mod wallet_management;

pub use data_objects::{InsertLogResult, SettlementResult, WalletFundedOrder};
pub use order_management::{OrderFlowError, OrderManagement};
pub use payment_log_management::{PaymentLogManagement, ReconciliationError};
pub use payment_reconciliation::PaymentReconciliation;
pub use store_error::StoreError;
pub use wallet_management::{WalletError, WalletManagement};
