use futures_util::future::join_all;
use log::*;
use settlement_engine::{
    events::EventProducers,
    order_objects::{LineItem, NewOrder},
    CatalogManagement,
    OrderFlowApi,
    OrderManagement,
    PricingPolicy,
    SettlementError,
};

use crate::support::{
    mocks::MockGateway,
    prepare_env::{new_test_db, tear_down},
    seed,
};

mod support;

const NUM_ORDERS: i64 = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_item_is_sold_once() {
    info!("🚀️ Starting burst order test");
    let db = new_test_db(NUM_ORDERS as u32).await;
    let store = seed::store(&db).await;
    let product = seed::product(&db, store.id, 75_000, 1).await;
    let api = OrderFlowApi::new(db.clone(), MockGateway::accepting(), PricingPolicy::default(), EventProducers::default());

    let attempts = (0..NUM_ORDERS).map(|buyer| {
        let order = NewOrder::from_items(100 + buyer, vec![LineItem::new(product.id, 1)]);
        api.create_order(order)
    });
    let results = join_all(attempts).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let sold_out =
        results.iter().filter(|r| matches!(r, Err(SettlementError::InsufficientStock { available: 0, .. }))).count();
    for r in results.iter().filter_map(|r| r.as_ref().err()) {
        debug!("🚀️ Order rejected: {r}");
    }
    assert_eq!(successes, 1);
    assert_eq!(sold_out, NUM_ORDERS as usize - 1);

    let product = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 0);
    let mut orders = Vec::new();
    for buyer in 0..NUM_ORDERS {
        orders.extend(db.fetch_orders_for_buyer(100 + buyer).await.unwrap());
    }
    assert_eq!(orders.len(), 1);
    info!("🚀️ Burst order test complete");
    tear_down(db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn credits_are_spent_once() {
    use settlement_engine::{order_objects::CheckoutPayment, CreditLedger};
    use settlement_common::Credits;

    let db = new_test_db(10).await;
    let store = seed::store(&db).await;
    let product = seed::dual_priced_product(&db, store.id, 10_000, 300, 50).await;
    seed::fund(&db, seed::BUYER, 500).await;
    let api = OrderFlowApi::new(db.clone(), MockGateway::accepting(), PricingPolicy::default(), EventProducers::default());

    let attempts = (0..5).map(|_| {
        let order =
            NewOrder::from_items(seed::BUYER, vec![LineItem::new(product.id, 1)]).with_payment(CheckoutPayment::Credits);
        api.create_order(order)
    });
    let results = join_all(attempts).await;
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, SettlementError::InsufficientCredits { .. })));
    assert_eq!(db.credit_balance(seed::BUYER).await.unwrap(), Credits::from(200));
    assert_eq!(db.fetch_product(product.id).await.unwrap().unwrap().quantity, 49);
    tear_down(db).await;
}
