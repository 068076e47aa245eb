use momo_common::Fcfa;
use thiserror::Error;

use crate::{
    db_types::{WalletAccount, WalletTransaction, WalletTransactionStatus},
    traits::StoreError,
    wallet_objects::{BalanceAudit, TopupClaim, TopupConfirmation, TopupSummary, Wallet},
};

/// The wallet ledger.
///
/// Every balance mutation happens in the same store transaction as the ledger entry that explains it, so the balance
/// always equals the signed sum of the account's `completed` transactions.
#[allow(async_fn_in_trait)]
pub trait WalletManagement: Clone {
    /// Returns the account for `user_id`, creating an empty one if needed. Safe to call concurrently.
    async fn ensure_account(&self, user_id: &str) -> Result<WalletAccount, WalletError>;

    /// The account for `user_id` (created on first use) and its transactions, newest first.
    async fn fetch_wallet(&self, user_id: &str) -> Result<Wallet, WalletError>;

    async fn fetch_wallet_transaction(&self, transaction_id: i64) -> Result<Option<WalletTransaction>, WalletError>;

    /// Records a `pending` deposit for `amount`.
    async fn request_topup(&self, user_id: &str, amount: Fcfa) -> Result<WalletTransaction, WalletError>;

    /// Records a `claim_pending` deposit with the customer's proof of transfer.
    async fn claim_topup(&self, user_id: &str, claim: TopupClaim) -> Result<WalletTransaction, WalletError>;

    /// Completes a `pending` or `claim_pending` deposit and credits the account, atomically. Confirming an already
    /// completed deposit changes nothing and reports the current balance.
    async fn confirm_topup(
        &self,
        transaction_id: i64,
        reference: Option<String>,
    ) -> Result<TopupConfirmation, WalletError>;

    /// Marks a deposit as refused. Completed deposits cannot be refused.
    async fn refuse_topup(&self, transaction_id: i64, reason: Option<String>) -> Result<WalletTransaction, WalletError>;

    /// Deposits in the given status across all accounts, newest first.
    async fn list_topups(&self, status: WalletTransactionStatus) -> Result<Vec<TopupSummary>, WalletError>;

    /// Debits `amount` for a purchase. Fails with [`WalletError::InsufficientBalance`] without writing anything if the
    /// balance is too low.
    async fn debit_for_purchase(&self, user_id: &str, amount: Fcfa, order_ref: &str)
        -> Result<WalletTransaction, WalletError>;

    /// The stored balance alongside the sum of completed transactions.
    async fn audit_balance(&self, user_id: &str) -> Result<BalanceAudit, WalletError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Invalid wallet request: {0}")]
    Validation(String),
    #[error("Top-up {0} does not exist")]
    TopupNotFound(i64),
    #[error("Top-up {id} cannot be changed because it is {status}")]
    TopupNotPending { id: i64, status: WalletTransactionStatus },
    #[error("Insufficient wallet balance. Available: {available}, required: {required}")]
    InsufficientBalance { available: Fcfa, required: Fcfa },
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl WalletError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retriable())
    }
}

impl From<sqlx::Error> for WalletError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(StoreError::from(e))
    }
}
