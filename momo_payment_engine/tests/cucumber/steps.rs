use cucumber::{then, when};
use momo_common::Fcfa;
use momo_payment_engine::{
    db_types::{Customer, OrderItem, OrderStatusType, PaymentMethod, WalletTransactionStatus},
    order_objects::CreateOrderRequest,
    payment_objects::{IngestStatus, PaymentLogQuery},
    wallet_objects::TopupClaim,
    OrderFlowError,
    ReconciliationError,
};

use crate::cucumber::MomoWorld;

fn order_request(phone: &str, total: i64) -> CreateOrderRequest {
    let customer = Customer {
        phone: phone.into(),
        name: "Awa Ndiaye".into(),
        email: "awa@example.com".into(),
        ..Default::default()
    };
    CreateOrderRequest::new(customer, vec![OrderItem::new("Pagne wax", Fcfa::from(total), 1)])
}

#[when(expr = "customer {word} places order '{word}' for {int} FCFA")]
async fn place_order(world: &mut MomoWorld, phone: String, name: String, total: i64) {
    let created =
        world.system().orders.create_order(order_request(&phone, total)).await.expect("Error creating order");
    world.orders.insert(name, created.order_id);
}

#[when(expr = "the SMS {string} arrives at {word}")]
async fn sms_arrives(world: &mut MomoWorld, text: String, observed_at: String) {
    let result = world.system().payments.ingest_payment_notification(&text, Some("AirtelMoney"), &observed_at).await;
    world.last_ingest = Some(result);
}

#[when(expr = "order '{word}' moves to {word}")]
async fn move_order(world: &mut MomoWorld, name: String, status: String) {
    let id = world.order_id(&name);
    let status = status.parse::<OrderStatusType>().expect("Not a valid order status");
    world.system().orders.update_order_status(id, status).await.expect("Error updating order status");
}

#[when(expr = "'{word}' requests a top-up of {int} FCFA")]
async fn request_topup(world: &mut MomoWorld, user: String, amount: i64) {
    let topup = world.system().wallets.request_topup(&user, Fcfa::from(amount)).await.expect("Error requesting top-up");
    world.last_topup = Some(topup.id);
}

#[when(expr = "'{word}' claims a deposit of {int} FCFA from {word} with TID {word}")]
async fn claim_topup(world: &mut MomoWorld, user: String, amount: i64, number: String, tid: String) {
    let claim = TopupClaim::new(number, Fcfa::from(amount), tid);
    let topup = world.system().wallets.claim_topup(&user, claim).await.expect("Error claiming top-up");
    world.last_topup = Some(topup.id);
}

#[when("the admin confirms the last top-up")]
async fn confirm_topup(world: &mut MomoWorld) {
    let id = world.last_topup.expect("No top-up has been requested");
    world.system().wallets.confirm_topup(id, None).await.expect("Error confirming top-up");
}

#[when(expr = "the admin refuses the last top-up because {string}")]
async fn refuse_topup(world: &mut MomoWorld, reason: String) {
    let id = world.last_topup.expect("No top-up has been requested");
    world.system().wallets.refuse_topup(id, Some(reason)).await.expect("Error refusing top-up");
}

#[when(expr = "'{word}' pays order '{word}' for {int} FCFA from the wallet")]
async fn wallet_order(world: &mut MomoWorld, user: String, name: String, total: i64) {
    let request = order_request("237677123456", total).with_payment_method(PaymentMethod::Wallet).with_user_id(user);
    let result = world.system().orders.create_order(request).await;
    if let Ok(created) = &result {
        world.orders.insert(name, created.order_id);
    }
    world.last_order = Some(result);
}

#[then(expr = "the notification is matched to order '{word}'")]
async fn notification_matched(world: &mut MomoWorld, name: String) {
    let id = world.order_id(&name);
    let result = world.last_ingest.as_ref().expect("No notification received").as_ref().expect("Ingest failed");
    assert_eq!(result.status, IngestStatus::Matched);
    assert_eq!(result.order_id, Some(id));
}

#[then(expr = "the notification is a duplicate of order '{word}'")]
async fn notification_duplicate(world: &mut MomoWorld, name: String) {
    let id = world.order_id(&name);
    let result = world.last_ingest.as_ref().expect("No notification received").as_ref().expect("Ingest failed");
    assert_eq!(result.status, IngestStatus::Duplicate);
    assert_eq!(result.order_id, Some(id));
}

#[then(expr = "the notification is {word}")]
async fn notification_status(world: &mut MomoWorld, status: String) {
    let result = world.last_ingest.as_ref().expect("No notification received");
    match (status.as_str(), result) {
        ("rejected", Err(ReconciliationError::Validation(_))) => {},
        ("unmatched", Ok(r)) => {
            assert_eq!(r.status, IngestStatus::Unmatched);
            assert_eq!(r.order_id, None);
        },
        ("ignored", Ok(r)) => {
            assert_eq!(r.status, IngestStatus::Ignored);
            assert!(r.log_id.is_some());
        },
        (expected, actual) => panic!("Expected the notification to be {expected}, but got {actual:?}"),
    }
}

#[then(expr = "order '{word}' is paid with reference {word}")]
async fn order_paid(world: &mut MomoWorld, name: String, reference: String) {
    let check = world.system().orders.check_payment(world.order_id(&name)).await.expect("Error checking payment");
    assert!(check.paid, "Order {name} is {}", check.status);
    assert_eq!(check.payment_reference, Some(reference));
}

#[then(expr = "order '{word}' has status {word}")]
async fn order_status(world: &mut MomoWorld, name: String, status: String) {
    let check = world.system().orders.check_payment(world.order_id(&name)).await.expect("Error checking payment");
    assert_eq!(check.status.to_string(), status);
}

#[then(expr = "there are {int} payment log entries for transaction {word}")]
async fn log_entries(world: &mut MomoWorld, count: usize, tid: String) {
    let query = PaymentLogQuery::default().with_transaction_id(tid);
    let logs = world.system().payments.payment_logs(query).await.expect("Error fetching payment logs");
    assert_eq!(logs.len(), count);
}

#[then("the order is refused for insufficient balance")]
async fn insufficient_balance(world: &mut MomoWorld) {
    let result = world.last_order.as_ref().expect("No wallet order was placed");
    assert!(matches!(result, Err(OrderFlowError::InsufficientBalance { .. })), "Got {result:?}");
}

#[then(expr = "the wallet of '{word}' holds {int} FCFA")]
async fn wallet_balance(world: &mut MomoWorld, user: String, balance: i64) {
    let wallet = world.system().wallets.fetch_wallet(&user).await.expect("Error fetching wallet");
    assert_eq!(wallet.account.balance, Fcfa::from(balance));
    let audit = world.system().wallets.audit_balance(&user).await.expect("Error auditing wallet");
    assert!(audit.is_consistent(), "Wallet of {user} is inconsistent: {audit:?}");
}

#[then(expr = "the last top-up is {word}")]
async fn topup_status(world: &mut MomoWorld, status: String) {
    let id = world.last_topup.expect("No top-up has been requested");
    let status = status.parse::<WalletTransactionStatus>().expect("Not a valid top-up status");
    let queue = world.system().wallets.list_topups(status).await.expect("Error listing top-ups");
    assert!(queue.iter().any(|t| t.transaction.id == id), "Top-up #{id} is not {status}");
}
