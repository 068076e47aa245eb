//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use momo_common::Fcfa;
use sqlx::SqlitePool;

use super::db::{new_pool, orders, payment_logs, wallets};
use crate::{
    config::StoreConfig,
    db_types::{
        ClaimInfo,
        NewOrder,
        NewPaymentLogEntry,
        NewWalletTransaction,
        Order,
        OrderId,
        PaymentLogEntry,
        WalletAccount,
        WalletTransaction,
        WalletTransactionStatus,
        WalletTransactionType,
    },
    order_objects::OrderQueryFilter,
    order_state::StatusChange,
    payment_objects::{PaymentLogQuery, TimeWindow},
    traits::{
        InsertLogResult,
        OrderFlowError,
        OrderManagement,
        PaymentLogManagement,
        PaymentReconciliation,
        ReconciliationError,
        SettlementResult,
        StoreError,
        WalletError,
        WalletFundedOrder,
        WalletManagement,
    },
    wallet_objects::{BalanceAudit, TopupClaim, TopupConfirmation, TopupSummary, Wallet},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(config: &StoreConfig) -> Result<Self, sqlx::Error> {
        let pool = new_pool(config).await?;
        Ok(Self { url: config.database_url.clone(), pool })
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let config = StoreConfig::new(url).with_max_connections(max_connections);
        Self::new(&config).await
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} has been saved in the DB", order.id);
        Ok(order)
    }

    /// In a single atomic transaction,
    /// * creates the wallet account if needed,
    /// * debits the order total, if the balance covers it,
    /// * stores the order and marks it paid,
    /// * appends the purchase to the ledger, referencing the order.
    async fn insert_wallet_funded_order(
        &self,
        user_id: &str,
        order: NewOrder,
        change: &StatusChange,
    ) -> Result<WalletFundedOrder, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let account = wallets::ensure_account(user_id, &mut tx).await?;
        let total = order.total;
        if wallets::debit(account.id, total, &mut tx).await?.is_none() {
            tx.rollback().await?;
            debug!("🗃️ {user_id} cannot pay {total} from a balance of {}", account.balance);
            return Err(OrderFlowError::InsufficientBalance { available: account.balance, required: total });
        }
        let pending = orders::insert_order(order, &mut tx).await?;
        let Some(order) = orders::apply_status_change(pending.id, change, &mut tx).await? else {
            tx.rollback().await?;
            error!("🗃️ Order {} changed status while it was being created", pending.id);
            return Err(OrderFlowError::ConcurrentModification(pending.id));
        };
        let purchase = NewWalletTransaction::purchase(total, &order.id.to_string());
        let debit = wallets::insert_transaction(account.id, purchase, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} paid with {total} from the wallet of {user_id}", order.id);
        Ok(WalletFundedOrder { order, debit })
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn apply_status_change(
        &self,
        order_id: OrderId,
        change: &StatusChange,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::apply_status_change(order_id, change, &mut conn).await?;
        if order.is_none() {
            trace!("🗃️ Order {order_id} is not in {} status. Status change to {} skipped.", change.from, change.to);
        }
        Ok(order)
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::delete_order(order_id, &mut conn).await?;
        Ok(order)
    }
}

impl PaymentLogManagement for SqliteDatabase {
    async fn fetch_log_entry_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentLogEntry>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let entry = payment_logs::fetch_entry_for_transaction(transaction_id, &mut conn).await?;
        Ok(entry)
    }

    async fn fetch_near_duplicate(
        &self,
        customer_phone: &str,
        amount: Fcfa,
        window: &TimeWindow,
    ) -> Result<Option<PaymentLogEntry>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let entry = payment_logs::fetch_near_duplicate(customer_phone, amount, window, &mut conn).await?;
        Ok(entry)
    }

    async fn insert_log_entry(&self, entry: NewPaymentLogEntry) -> Result<InsertLogResult, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let result = payment_logs::insert_log_entry(entry, &mut conn).await?;
        Ok(result)
    }

    async fn search_payment_logs(&self, query: PaymentLogQuery) -> Result<Vec<PaymentLogEntry>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let entries = payment_logs::search_entries(query, &mut conn).await?;
        Ok(entries)
    }
}

impl PaymentReconciliation for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_payment_candidates(
        &self,
        phone_key: &str,
        min_total: Fcfa,
        max_total: Fcfa,
    ) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_payment_candidates(phone_key, min_total, max_total, &mut conn).await?;
        Ok(orders)
    }

    async fn settle_order_payment(
        &self,
        order_id: OrderId,
        change: &StatusChange,
        entry: NewPaymentLogEntry,
    ) -> Result<SettlementResult, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::apply_status_change(order_id, change, &mut tx).await? {
            Some(order) => order,
            None => {
                tx.rollback().await?;
                return Ok(SettlementResult::LostRace);
            },
        };
        match payment_logs::insert_log_entry(entry, &mut tx).await? {
            InsertLogResult::Inserted(entry) => {
                tx.commit().await?;
                debug!("🗃️ Order {order_id} marked as paid. Log entry #{}", entry.id);
                Ok(SettlementResult::Settled { order, entry })
            },
            InsertLogResult::DuplicateTransaction => {
                tx.rollback().await?;
                Ok(SettlementResult::DuplicateTransaction)
            },
        }
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        self.pool.close().await;
        Ok(())
    }
}

impl WalletManagement for SqliteDatabase {
    async fn ensure_account(&self, user_id: &str) -> Result<WalletAccount, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let account = wallets::ensure_account(user_id, &mut conn).await?;
        Ok(account)
    }

    async fn fetch_wallet(&self, user_id: &str) -> Result<Wallet, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let account = wallets::ensure_account(user_id, &mut conn).await?;
        let transactions = wallets::transactions_for_account(account.id, &mut conn).await?;
        Ok(Wallet { account, transactions })
    }

    async fn fetch_wallet_transaction(&self, transaction_id: i64) -> Result<Option<WalletTransaction>, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let tx = wallets::fetch_transaction(transaction_id, &mut conn).await?;
        Ok(tx)
    }

    async fn request_topup(&self, user_id: &str, amount: Fcfa) -> Result<WalletTransaction, WalletError> {
        let mut tx = self.pool.begin().await?;
        let account = wallets::ensure_account(user_id, &mut tx).await?;
        let topup = wallets::insert_transaction(account.id, NewWalletTransaction::topup_request(amount), &mut tx).await?;
        tx.commit().await?;
        Ok(topup)
    }

    async fn claim_topup(&self, user_id: &str, claim: TopupClaim) -> Result<WalletTransaction, WalletError> {
        let info = ClaimInfo { deposit_number: claim.deposit_number, tid: claim.tid, claimed_at: Utc::now() };
        let mut tx = self.pool.begin().await?;
        let account = wallets::ensure_account(user_id, &mut tx).await?;
        let topup =
            wallets::insert_transaction(account.id, NewWalletTransaction::topup_claim(claim.amount, info), &mut tx)
                .await?;
        tx.commit().await?;
        Ok(topup)
    }

    /// Completes the deposit and credits the account in one transaction, so a deposit can only ever be credited once.
    async fn confirm_topup(
        &self,
        transaction_id: i64,
        reference: Option<String>,
    ) -> Result<TopupConfirmation, WalletError> {
        let mut tx = self.pool.begin().await?;
        if let Some(topup) = wallets::complete_deposit(transaction_id, reference, &mut tx).await? {
            let balance = wallets::credit(topup.account_id, topup.amount, &mut tx).await?;
            tx.commit().await?;
            debug!("🗃️ Top-up #{transaction_id} completed. Account #{} balance is {balance}", topup.account_id);
            return Ok(TopupConfirmation { transaction: topup, balance, credited: true });
        }
        tx.rollback().await?;
        let mut conn = self.pool.acquire().await?;
        let topup = wallets::fetch_transaction(transaction_id, &mut conn)
            .await?
            .filter(|t| t.tx_type == WalletTransactionType::Deposit)
            .ok_or(WalletError::TopupNotFound(transaction_id))?;
        if topup.status != WalletTransactionStatus::Completed {
            return Err(WalletError::TopupNotPending { id: transaction_id, status: topup.status });
        }
        let account = wallets::fetch_account_by_id(topup.account_id, &mut conn).await?.ok_or_else(|| {
            StoreError::Database(format!("Top-up #{transaction_id} belongs to a missing account #{}", topup.account_id))
        })?;
        Ok(TopupConfirmation { transaction: topup, balance: account.balance, credited: false })
    }

    async fn refuse_topup(&self, transaction_id: i64, reason: Option<String>) -> Result<WalletTransaction, WalletError> {
        let reference = match reason {
            Some(reason) => format!("REFUSED: {reason}"),
            None => "REFUSED".to_string(),
        };
        let mut conn = self.pool.acquire().await?;
        if let Some(topup) = wallets::refuse_deposit(transaction_id, reference, &mut conn).await? {
            return Ok(topup);
        }
        match wallets::fetch_transaction(transaction_id, &mut conn).await? {
            Some(t) if t.tx_type == WalletTransactionType::Deposit => {
                Err(WalletError::TopupNotPending { id: transaction_id, status: t.status })
            },
            _ => Err(WalletError::TopupNotFound(transaction_id)),
        }
    }

    async fn list_topups(&self, status: WalletTransactionStatus) -> Result<Vec<TopupSummary>, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let topups = wallets::deposits_with_status(status, &mut conn).await?;
        Ok(topups)
    }

    async fn debit_for_purchase(
        &self,
        user_id: &str,
        amount: Fcfa,
        order_ref: &str,
    ) -> Result<WalletTransaction, WalletError> {
        let mut tx = self.pool.begin().await?;
        let account = wallets::ensure_account(user_id, &mut tx).await?;
        if wallets::debit(account.id, amount, &mut tx).await?.is_none() {
            tx.rollback().await?;
            return Err(WalletError::InsufficientBalance { available: account.balance, required: amount });
        }
        let purchase =
            wallets::insert_transaction(account.id, NewWalletTransaction::purchase(amount, order_ref), &mut tx).await?;
        tx.commit().await?;
        Ok(purchase)
    }

    async fn audit_balance(&self, user_id: &str) -> Result<BalanceAudit, WalletError> {
        let mut conn = self.pool.acquire().await?;
        wallets::ensure_account(user_id, &mut conn).await?;
        let audit = wallets::audit(user_id, &mut conn).await?.ok_or_else(|| {
            StoreError::Database(format!("The wallet account for {user_id} disappeared during the audit"))
        })?;
        Ok(audit)
    }
}
