use std::{fmt::Debug, time::Duration};

use log::*;
use momo_common::Fcfa;

use crate::{
    config::DEFAULT_EVENT_TIMEOUT,
    db_types::{WalletAccount, WalletTransaction, WalletTransactionStatus},
    events::{EventProducers, TopupConfirmedEvent},
    traits::{WalletError, WalletManagement},
    wallet_objects::{BalanceAudit, TopupClaim, TopupConfirmation, TopupSummary, Wallet},
};

/// Customer-facing and administrative operations on the wallet ledger.
#[derive(Clone)]
pub struct WalletApi<B> {
    db: B,
    producers: EventProducers,
    event_timeout: Duration,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, event_timeout: DEFAULT_EVENT_TIMEOUT }
    }

    /// Sets how long a committed change waits on a full subscriber channel before the event is dropped.
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    pub async fn ensure_account(&self, user_id: &str) -> Result<WalletAccount, WalletError> {
        let user_id = non_empty_user(user_id)?;
        self.db.ensure_account(user_id).await
    }

    pub async fn fetch_wallet(&self, user_id: &str) -> Result<Wallet, WalletError> {
        let user_id = non_empty_user(user_id)?;
        self.db.fetch_wallet(user_id).await
    }

    pub async fn request_topup(&self, user_id: &str, amount: Fcfa) -> Result<WalletTransaction, WalletError> {
        let user_id = non_empty_user(user_id)?;
        if !amount.is_positive() {
            return Err(WalletError::Validation("the top-up amount must be positive".into()));
        }
        let tx = self.db.request_topup(user_id, amount).await?;
        info!("🔄️👛️ {user_id} requested a top-up of {amount} (#{})", tx.id);
        Ok(tx)
    }

    pub async fn claim_topup(&self, user_id: &str, claim: TopupClaim) -> Result<WalletTransaction, WalletError> {
        let user_id = non_empty_user(user_id)?;
        let claim = claim.validated()?;
        let tx = self.db.claim_topup(user_id, claim).await?;
        info!("🔄️👛️ {user_id} claims a deposit of {} (#{}). Awaiting review.", tx.amount, tx.id);
        Ok(tx)
    }

    /// Completes a pending or claimed top-up and credits the account. Confirming a top-up twice is harmless.
    pub async fn confirm_topup(
        &self,
        transaction_id: i64,
        reference: Option<String>,
    ) -> Result<TopupConfirmation, WalletError> {
        let reference = reference.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let confirmation = self.db.confirm_topup(transaction_id, reference).await?;
        if confirmation.credited {
            info!(
                "🔄️👛️ Top-up #{transaction_id} of {} confirmed. The balance is now {}",
                confirmation.transaction.amount, confirmation.balance
            );
            self.call_topup_confirmed_hook(&confirmation).await;
        } else {
            debug!("🔄️👛️ Top-up #{transaction_id} had already been confirmed");
        }
        Ok(confirmation)
    }

    pub async fn refuse_topup(
        &self,
        transaction_id: i64,
        reason: Option<String>,
    ) -> Result<WalletTransaction, WalletError> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let tx = self.db.refuse_topup(transaction_id, reason).await?;
        info!("🔄️👛️ Top-up #{transaction_id} refused");
        Ok(tx)
    }

    /// The review queue: top-ups in the given status, newest first.
    pub async fn list_topups(&self, status: WalletTransactionStatus) -> Result<Vec<TopupSummary>, WalletError> {
        self.db.list_topups(status).await
    }

    pub async fn debit_for_purchase(
        &self,
        user_id: &str,
        amount: Fcfa,
        order_ref: &str,
    ) -> Result<WalletTransaction, WalletError> {
        let user_id = non_empty_user(user_id)?;
        if !amount.is_positive() {
            return Err(WalletError::Validation("the purchase amount must be positive".into()));
        }
        self.db.debit_for_purchase(user_id, amount, order_ref).await
    }

    pub async fn audit_balance(&self, user_id: &str) -> Result<BalanceAudit, WalletError> {
        let audit = self.db.audit_balance(non_empty_user(user_id)?).await?;
        if !audit.is_consistent() {
            error!(
                "🔄️👛️ Wallet of {} records {} but its completed transactions sum to {}",
                audit.user_id, audit.recorded, audit.computed
            );
        }
        Ok(audit)
    }

    async fn call_topup_confirmed_hook(&self, confirmation: &TopupConfirmation) {
        for emitter in &self.producers.topup_confirmed_producer {
            let event = TopupConfirmedEvent::new(confirmation.transaction.clone(), confirmation.balance);
            if !emitter.publish_event_within(event, self.event_timeout).await {
                warn!("🔄️👛️ Top-up subscribers were not told about top-up #{}", confirmation.transaction.id);
            }
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn non_empty_user(user_id: &str) -> Result<&str, WalletError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(WalletError::Validation("a user id is required".into()));
    }
    Ok(user_id)
}
