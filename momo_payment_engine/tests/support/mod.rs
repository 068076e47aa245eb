#![allow(dead_code)]
use log::*;
use momo_common::Fcfa;
use momo_payment_engine::{
    db_types::{Customer, OrderItem, PaymentMethod},
    events::EventProducers,
    order_objects::CreateOrderRequest,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    OrderFlowApi,
    PaymentReconciliation,
    ReconciliationApi,
    ReconciliationConfig,
    SqliteDatabase,
    WalletApi,
};

pub const PAYER: &str = "237677123456";
pub const OBSERVED_AT: &str = "2024-06-01T10:00:00Z";

pub async fn setup_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn tear_down(db: SqliteDatabase) {
    db.pool().close().await;
    drop_database(db.url()).await;
    debug!("🚀️ Test database removed");
}

pub struct System {
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: ReconciliationApi<SqliteDatabase>,
    pub wallets: WalletApi<SqliteDatabase>,
}

impl System {
    pub async fn new(config: ReconciliationConfig) -> Self {
        Self::with_producers(config, EventProducers::default()).await
    }

    pub async fn with_producers(config: ReconciliationConfig, producers: EventProducers) -> Self {
        let db = setup_db().await;
        let timeout = config.event_timeout;
        let orders = OrderFlowApi::new(db.clone(), producers.clone()).with_event_timeout(timeout);
        let payments = ReconciliationApi::new(db.clone(), config, producers.clone());
        let wallets = WalletApi::new(db.clone(), producers).with_event_timeout(timeout);
        Self { db, orders, payments, wallets }
    }

    pub async fn tear_down(self) {
        let Self { db, .. } = self;
        tear_down(db).await;
    }
}

pub fn customer(phone: &str) -> Customer {
    Customer { phone: phone.into(), name: "Awa Ndiaye".into(), email: "awa@example.com".into(), ..Default::default() }
}

/// A single-item Airtel Money order for `total`.
pub fn order_request(phone: &str, total: i64) -> CreateOrderRequest {
    CreateOrderRequest::new(customer(phone), vec![OrderItem::new("Pagne wax", Fcfa::from(total), 1)])
}

pub fn wallet_order_request(user_id: &str, total: i64) -> CreateOrderRequest {
    order_request(PAYER, total).with_payment_method(PaymentMethod::Wallet).with_user_id(user_id)
}

/// An Airtel Money "money received" SMS.
pub fn payment_sms(amount: &str, payer: &str, tid: Option<&str>) -> String {
    let mut text = format!("Vous avez recu paiement, transaction de {amount} FCFA du {payer} le 01/06/2024.");
    if let Some(tid) = tid {
        text.push_str(&format!(" TID: {tid}"));
    }
    text
}
