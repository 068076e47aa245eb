use futures_util::future::join_all;
use momo_common::Fcfa;
use momo_payment_engine::{
    db_types::{OrderStatusType, PaymentMethod, WalletTransactionStatus, WalletTransactionType},
    order_objects::OrderQueryFilter,
    wallet_objects::TopupClaim,
    OrderFlowError,
    ReconciliationConfig,
    WalletError,
};
use support::*;

mod support;

const ALICE: &str = "user-alice";

async fn fund(sys: &System, user_id: &str, amount: i64) {
    let topup = sys.wallets.request_topup(user_id, Fcfa::from(amount)).await.expect("Error requesting top-up");
    let confirmation = sys.wallets.confirm_topup(topup.id, None).await.expect("Error confirming top-up");
    assert!(confirmation.credited);
}

#[tokio::test]
async fn topup_request_and_confirmation() {
    let sys = System::new(ReconciliationConfig::default()).await;
    let topup = sys.wallets.request_topup(ALICE, Fcfa::from(2_000)).await.unwrap();
    assert_eq!(topup.tx_type, WalletTransactionType::Deposit);
    assert_eq!(topup.status, WalletTransactionStatus::Pending);
    assert!(topup.completed_at.is_none());
    assert_eq!(sys.wallets.fetch_wallet(ALICE).await.unwrap().account.balance, Fcfa::from(0));

    let confirmed = sys.wallets.confirm_topup(topup.id, Some(" PP240601.1200.A1 ".into())).await.unwrap();
    assert!(confirmed.credited);
    assert_eq!(confirmed.balance, Fcfa::from(2_000));
    assert_eq!(confirmed.status(), WalletTransactionStatus::Completed);
    assert_eq!(confirmed.transaction.reference.as_deref(), Some("PP240601.1200.A1"));
    assert!(confirmed.transaction.completed_at.is_some());

    // Confirming again changes nothing
    let again = sys.wallets.confirm_topup(topup.id, None).await.unwrap();
    assert!(!again.credited);
    assert_eq!(again.balance, Fcfa::from(2_000));

    let err = sys.wallets.refuse_topup(topup.id, Some("too late".into())).await.unwrap_err();
    assert_eq!(err, WalletError::TopupNotPending { id: topup.id, status: WalletTransactionStatus::Completed });

    let wallet = sys.wallets.fetch_wallet(ALICE).await.unwrap();
    assert_eq!(wallet.account.balance, Fcfa::from(2_000));
    assert_eq!(wallet.account.currency, "FCFA");
    assert_eq!(wallet.transactions.len(), 1);
    assert!(sys.wallets.audit_balance(ALICE).await.unwrap().is_consistent());
    sys.tear_down().await;
}

#[tokio::test]
async fn claimed_topups_wait_for_review() {
    let sys = System::new(ReconciliationConfig::default()).await;
    let claim = TopupClaim::new("677123456", Fcfa::from(3_000), "PP9999");
    let claimed = sys.wallets.claim_topup(ALICE, claim).await.unwrap();
    assert_eq!(claimed.status, WalletTransactionStatus::ClaimPending);
    let info = claimed.claim_info.clone().expect("claim details are stored");
    assert_eq!(info.deposit_number, "677123456");
    assert_eq!(info.tid, "PP9999");

    let queue = sys.wallets.list_topups(WalletTransactionStatus::ClaimPending).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].user_id, ALICE);
    assert_eq!(queue[0].transaction.id, claimed.id);

    let refused = sys.wallets.refuse_topup(claimed.id, Some("no such deposit".into())).await.unwrap();
    assert_eq!(refused.status, WalletTransactionStatus::Refused);
    assert_eq!(refused.reference.as_deref(), Some("REFUSED: no such deposit"));
    assert!(sys.wallets.list_topups(WalletTransactionStatus::ClaimPending).await.unwrap().is_empty());

    let err = sys.wallets.confirm_topup(claimed.id, None).await.unwrap_err();
    assert_eq!(err, WalletError::TopupNotPending { id: claimed.id, status: WalletTransactionStatus::Refused });
    assert_eq!(sys.wallets.fetch_wallet(ALICE).await.unwrap().account.balance, Fcfa::from(0));
    sys.tear_down().await;
}

#[tokio::test]
async fn invalid_wallet_requests() {
    let sys = System::new(ReconciliationConfig::default()).await;
    assert_eq!(sys.wallets.confirm_topup(9_999, None).await.unwrap_err(), WalletError::TopupNotFound(9_999));
    assert!(matches!(sys.wallets.request_topup(ALICE, Fcfa::from(0)).await, Err(WalletError::Validation(_))));
    assert!(matches!(sys.wallets.request_topup("  ", Fcfa::from(500)).await, Err(WalletError::Validation(_))));
    let short_tid = TopupClaim::new("677123456", Fcfa::from(500), "P1");
    assert!(matches!(sys.wallets.claim_topup(ALICE, short_tid).await, Err(WalletError::Validation(_))));
    sys.tear_down().await;
}

#[tokio::test]
async fn wallet_orders_need_enough_balance() {
    let sys = System::new(ReconciliationConfig::default()).await;
    fund(&sys, ALICE, 500).await;

    let err = sys.orders.create_order(wallet_order_request(ALICE, 1_000)).await.unwrap_err();
    assert!(matches!(
        err,
        OrderFlowError::InsufficientBalance { available, required }
            if available == Fcfa::from(500) && required == Fcfa::from(1_000)
    ));
    let orders = sys.orders.search_orders(OrderQueryFilter::default().with_user_id(ALICE)).await.unwrap();
    assert!(orders.is_empty());
    let wallet = sys.wallets.fetch_wallet(ALICE).await.unwrap();
    assert_eq!(wallet.account.balance, Fcfa::from(500));
    assert_eq!(wallet.transactions.len(), 1);
    sys.tear_down().await;
}

#[tokio::test]
async fn wallet_orders_are_paid_immediately() {
    let sys = System::new(ReconciliationConfig::default()).await;
    fund(&sys, ALICE, 1_500).await;

    let created = sys.orders.create_order(wallet_order_request(ALICE, 1_000)).await.unwrap();
    assert_eq!(created.status, OrderStatusType::Paid);
    let order = sys.orders.fetch_order(created.order_id).await.unwrap().expect("order exists");
    assert_eq!(order.payment_method, PaymentMethod::Wallet);
    assert!(order.paid_at.is_some());

    let wallet = sys.wallets.fetch_wallet(ALICE).await.unwrap();
    assert_eq!(wallet.account.balance, Fcfa::from(500));
    let purchase = &wallet.transactions[0];
    assert_eq!(purchase.tx_type, WalletTransactionType::Purchase);
    assert_eq!(purchase.amount, Fcfa::from(-1_000));
    assert_eq!(purchase.reference, Some(created.order_id.to_string()));

    let audit = sys.wallets.audit_balance(ALICE).await.unwrap();
    assert!(audit.is_consistent());
    assert_eq!(audit.recorded, Fcfa::from(500));
    sys.tear_down().await;
}

#[tokio::test]
async fn concurrent_debits_never_overdraw() {
    let sys = System::new(ReconciliationConfig::default()).await;
    fund(&sys, ALICE, 3_000).await;

    let debits = (0..5).map(|i| {
        let order_ref = format!("#{}", 100 + i);
        let wallets = sys.wallets.clone();
        async move { wallets.debit_for_purchase(ALICE, Fcfa::from(1_000), &order_ref).await }
    });
    let results = join_all(debits).await;
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let refused = results.iter().filter(|r| matches!(r, Err(WalletError::InsufficientBalance { .. }))).count();
    assert_eq!(ok, 3);
    assert_eq!(refused, 2);

    let audit = sys.wallets.audit_balance(ALICE).await.unwrap();
    assert_eq!(audit.recorded, Fcfa::from(0));
    assert!(audit.is_consistent());
    sys.tear_down().await;
}

#[tokio::test]
async fn one_account_per_user() {
    let sys = System::new(ReconciliationConfig::default()).await;
    let calls = (0..6).map(|_| sys.wallets.ensure_account("user-bob"));
    let accounts = join_all(calls).await.into_iter().collect::<Result<Vec<_>, _>>().unwrap();
    assert!(accounts.iter().all(|a| a.id == accounts[0].id));
    assert_eq!(accounts[0].balance, Fcfa::from(0));
    sys.tear_down().await;
}
