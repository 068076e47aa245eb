use std::collections::HashMap;

use cucumber::World;
use log::*;
use momo_payment_engine::{
    db_types::OrderId,
    events::EventProducers,
    order_objects::OrderCreated,
    payment_objects::IngestResult,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    OrderFlowApi,
    OrderFlowError,
    ReconciliationApi,
    ReconciliationConfig,
    ReconciliationError,
    SqliteDatabase,
    WalletApi,
};

#[derive(Default, Debug, World)]
pub struct MomoWorld {
    pub system: Option<MomoSystem>,
    /// Scenario names for the orders placed so far
    pub orders: HashMap<String, OrderId>,
    pub last_ingest: Option<Result<IngestResult, ReconciliationError>>,
    pub last_order: Option<Result<OrderCreated, OrderFlowError>>,
    pub last_topup: Option<i64>,
}

pub struct MomoSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: ReconciliationApi<SqliteDatabase>,
    pub wallets: WalletApi<SqliteDatabase>,
}

impl std::fmt::Debug for MomoSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MomoSystem ({})", self.db_path)
    }
}

impl MomoWorld {
    pub fn system(&self) -> &MomoSystem {
        self.system.as_ref().expect("System not initialised")
    }

    pub fn order_id(&self, name: &str) -> OrderId {
        *self.orders.get(name).unwrap_or_else(|| panic!("No order called '{name}' has been placed"))
    }
}

impl MomoSystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        prepare_test_env(&db_path).await;
        let db = SqliteDatabase::new_with_url(&db_path, 2).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {db_path}");
        let producers = EventProducers::default();
        let orders = OrderFlowApi::new(db.clone(), producers.clone());
        let payments = ReconciliationApi::new(db.clone(), ReconciliationConfig::default(), producers.clone());
        let wallets = WalletApi::new(db.clone(), producers);
        Self { db_path, db, orders, payments, wallets }
    }
}
