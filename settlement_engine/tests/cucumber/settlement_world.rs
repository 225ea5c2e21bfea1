use std::collections::HashMap;

use cucumber::World;
use log::*;
use settlement_engine::{
    db_types::{Product, Store},
    events::EventProducers,
    order_objects::PlacedOrder,
    CartApi,
    OrderFlowApi,
    PaymentApi,
    PricingPolicy,
    SettlementDatabase,
    SettlementError,
    SqliteDatabase,
};

use crate::support::{mocks::MockGateway, prepare_env::new_test_db};

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<SettlementSystem>,
    pub store: Option<Store>,
    pub products: HashMap<String, Product>,
    pub last_order: Option<PlacedOrder>,
    pub last_error: Option<SettlementError>,
}

#[derive(Debug)]
pub struct SettlementSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub gateway: MockGateway,
    pub flow: OrderFlowApi<SqliteDatabase, MockGateway>,
    pub payments: PaymentApi<SqliteDatabase, MockGateway>,
    pub carts: CartApi<SqliteDatabase>,
}

impl SettlementWorld {
    pub fn system(&self) -> &SettlementSystem {
        self.system.as_ref().expect("Settlement engine not initialised")
    }

    pub fn product(&self, name: &str) -> &Product {
        self.products.get(name).unwrap_or_else(|| panic!("No product called {name}"))
    }

    pub fn store_id(&self) -> i64 {
        self.store.as_ref().map(|s| s.id).expect("No store has been opened")
    }

    pub fn last_order_id(&self) -> i64 {
        self.last_order.as_ref().map(|p| p.order.id).expect("No order has been placed")
    }

    /// Records the result of an order-producing step, so that later steps can inspect it.
    pub fn record(&mut self, result: Result<PlacedOrder, SettlementError>) {
        match result {
            Ok(placed) => {
                debug!("🚀️ Order {} placed", placed.order.order_number);
                self.last_order = Some(placed);
                self.last_error = None;
            },
            Err(e) => {
                debug!("🚀️ Order rejected: {e}");
                self.last_error = Some(e);
            },
        }
    }
}

impl SettlementSystem {
    pub async fn new() -> Self {
        let db = new_test_db(2).await;
        let db_path = db.url().to_string();
        debug!("Created database: {db_path}");
        let gateway = MockGateway::accepting();
        let policy = PricingPolicy::default();
        let flow = OrderFlowApi::new(db.clone(), gateway.clone(), policy, EventProducers::default());
        let payments = PaymentApi::new(db.clone(), gateway.clone(), policy, EventProducers::default());
        let carts = CartApi::new(db.clone());
        Self { db_path, db, gateway, flow, payments, carts }
    }
}
