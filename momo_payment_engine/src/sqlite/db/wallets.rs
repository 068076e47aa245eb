//! Wallet accounts and their ledger.
//!
//! Balance changes are single conditional `UPDATE` statements, so concurrent debits on one account can never overdraw
//! it. Callers must write the matching ledger entry in the same transaction.
use chrono::Utc;
use log::trace;
use momo_common::{Fcfa, FCFA_CURRENCY_CODE};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db_types::{NewWalletTransaction, WalletAccount, WalletTransaction, WalletTransactionStatus, WalletTransactionType},
    wallet_objects::{BalanceAudit, TopupSummary},
};

/// Returns the account for `user_id`, creating it with a zero balance if it does not exist. Concurrent calls for the
/// same user all see the same account.
pub async fn ensure_account(user_id: &str, conn: &mut SqliteConnection) -> Result<WalletAccount, sqlx::Error> {
    let now = Utc::now();
    let inserted = sqlx::query(
        r#"
        INSERT INTO wallet_accounts (user_id, balance, currency, created_at, updated_at) VALUES ($1, 0, $2, $3, $4)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(FCFA_CURRENCY_CODE)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if inserted.rows_affected() > 0 {
        trace!("🗃️ Wallet account created for {user_id}");
    }
    let account = sqlx::query_as("SELECT * FROM wallet_accounts WHERE user_id = $1").bind(user_id).fetch_one(conn).await?;
    Ok(account)
}

pub async fn fetch_account_by_id(account_id: i64, conn: &mut SqliteConnection) -> Result<Option<WalletAccount>, sqlx::Error> {
    let account =
        sqlx::query_as("SELECT * FROM wallet_accounts WHERE id = $1").bind(account_id).fetch_optional(conn).await?;
    Ok(account)
}

/// Takes `amount` from the account if the balance covers it. Returns the new balance, or `None` if the balance was too
/// low, in which case nothing changed.
pub async fn debit(account_id: i64, amount: Fcfa, conn: &mut SqliteConnection) -> Result<Option<Fcfa>, sqlx::Error> {
    let balance: Option<i64> = sqlx::query_scalar(
        "UPDATE wallet_accounts SET balance = balance - $1, updated_at = $2 WHERE id = $3 AND balance >= $4 RETURNING \
         balance",
    )
    .bind(amount.value())
    .bind(Utc::now())
    .bind(account_id)
    .bind(amount.value())
    .fetch_optional(conn)
    .await?;
    Ok(balance.map(Fcfa::from))
}

/// Adds `amount` to the account and returns the new balance.
pub async fn credit(account_id: i64, amount: Fcfa, conn: &mut SqliteConnection) -> Result<Fcfa, sqlx::Error> {
    let balance: i64 = sqlx::query_scalar(
        "UPDATE wallet_accounts SET balance = balance + $1, updated_at = $2 WHERE id = $3 RETURNING balance",
    )
    .bind(amount.value())
    .bind(Utc::now())
    .bind(account_id)
    .fetch_one(conn)
    .await?;
    Ok(Fcfa::from(balance))
}

pub async fn insert_transaction(
    account_id: i64,
    tx: NewWalletTransaction,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, sqlx::Error> {
    let now = Utc::now();
    let completed_at = (tx.status == WalletTransactionStatus::Completed).then_some(now);
    let (deposit_number, claim_tid, claimed_at) = match tx.claim_info {
        Some(c) => (Some(c.deposit_number), Some(c.tid), Some(c.claimed_at)),
        None => (None, None, None),
    };
    let tx = sqlx::query_as(
        r#"
            INSERT INTO wallet_transactions (
                account_id,
                tx_type,
                amount,
                status,
                method,
                reference,
                description,
                deposit_number,
                claim_tid,
                claimed_at,
                created_at,
                completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(account_id)
    .bind(tx.tx_type.to_string())
    .bind(tx.amount.value())
    .bind(tx.status.to_string())
    .bind(tx.method.to_string())
    .bind(tx.reference)
    .bind(tx.description)
    .bind(deposit_number)
    .bind(claim_tid)
    .bind(claimed_at)
    .bind(now)
    .bind(completed_at)
    .fetch_one(conn)
    .await?;
    Ok(tx)
}

pub async fn fetch_transaction(id: i64, conn: &mut SqliteConnection) -> Result<Option<WalletTransaction>, sqlx::Error> {
    let tx = sqlx::query_as("SELECT * FROM wallet_transactions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(tx)
}

/// The account's transactions, newest first.
pub async fn transactions_for_account(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    let txs = sqlx::query_as("SELECT * FROM wallet_transactions WHERE account_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(account_id)
        .fetch_all(conn)
        .await?;
    Ok(txs)
}

/// Marks a `pending` or `claim_pending` deposit as completed. A reference, if given, replaces the stored one.
/// Returns `None` if there is no such deposit in either status. The balance is not touched.
pub async fn complete_deposit(
    id: i64,
    reference: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTransaction>, sqlx::Error> {
    let tx = sqlx::query_as(
        r#"
        UPDATE wallet_transactions SET status = $1, completed_at = $2, reference = COALESCE($3, reference)
        WHERE id = $4 AND tx_type = $5 AND status IN ($6, $7)
        RETURNING *
        "#,
    )
    .bind(WalletTransactionStatus::Completed.to_string())
    .bind(Utc::now())
    .bind(reference)
    .bind(id)
    .bind(WalletTransactionType::Deposit.to_string())
    .bind(WalletTransactionStatus::Pending.to_string())
    .bind(WalletTransactionStatus::ClaimPending.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

/// Marks a deposit that has not been completed as refused. Returns `None` if there is no such deposit.
pub async fn refuse_deposit(
    id: i64,
    reference: String,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTransaction>, sqlx::Error> {
    let tx = sqlx::query_as(
        r#"
        UPDATE wallet_transactions SET status = $1, completed_at = $2, reference = $3
        WHERE id = $4 AND tx_type = $5 AND status <> $6
        RETURNING *
        "#,
    )
    .bind(WalletTransactionStatus::Refused.to_string())
    .bind(Utc::now())
    .bind(reference)
    .bind(id)
    .bind(WalletTransactionType::Deposit.to_string())
    .bind(WalletTransactionStatus::Completed.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}

/// Deposits in the given status across all accounts, newest first.
pub async fn deposits_with_status(
    status: WalletTransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<TopupSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT t.*, a.user_id AS user_id
        FROM wallet_transactions t JOIN wallet_accounts a ON t.account_id = a.id
        WHERE t.tx_type = $1 AND t.status = $2
        ORDER BY t.created_at DESC, t.id DESC
        "#,
    )
    .bind(WalletTransactionType::Deposit.to_string())
    .bind(status.to_string())
    .fetch_all(conn)
    .await?;
    rows.iter().map(topup_summary).collect()
}

fn topup_summary(row: &SqliteRow) -> Result<TopupSummary, sqlx::Error> {
    Ok(TopupSummary { user_id: row.try_get("user_id")?, transaction: WalletTransaction::from_row(row)? })
}

/// The stored balance next to the signed sum of completed transactions.
pub async fn audit(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<BalanceAudit>, sqlx::Error> {
    let audit = sqlx::query_as(
        r#"
        SELECT a.user_id AS user_id, a.balance AS recorded,
            COALESCE((SELECT SUM(t.amount) FROM wallet_transactions t WHERE t.account_id = a.id AND t.status = $1), 0)
            AS computed
        FROM wallet_accounts a WHERE a.user_id = $2
        "#,
    )
    .bind(WalletTransactionStatus::Completed.to_string())
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(audit)
}
