use settlement_common::{Credits, Ugx};
use settlement_engine::{
    db_types::{NewPayment, OrderPaymentStatus, OrderStatusType, Payable, PaymentData, PaymentMethod, PaymentStatus},
    events::EventProducers,
    order_objects::{LineItem, NewOrder, PlacedOrder},
    payment_objects::PaymentRequest,
    se_api::pricing::PricingContext,
    sqlite::db::payments,
    CreditLedger,
    OrderFlowApi,
    OrderManagement,
    PaymentApi,
    PricingPolicy,
    SettlementError,
    SqliteDatabase,
};

use crate::support::{
    mocks::MockGateway,
    prepare_env::{new_test_db, tear_down},
    seed,
    seed::{BUYER, PHONE},
};

mod support;

fn payment_api(db: &SqliteDatabase, gateway: MockGateway, policy: PricingPolicy) -> PaymentApi<SqliteDatabase, MockGateway> {
    PaymentApi::new(db.clone(), gateway, policy, EventProducers::default())
}

/// Places an unpaid order for one unit of a product priced at `price_ugx` / `price_credits`, with free shipping.
async fn unpaid_order(db: &SqliteDatabase, price_ugx: i64, price_credits: i64) -> PlacedOrder {
    let store = seed::store(db).await;
    let product = seed::dual_priced_product(db, store.id, price_ugx, price_credits, 10).await;
    let api = OrderFlowApi::new(db.clone(), MockGateway::accepting(), PricingPolicy::default(), EventProducers::default());
    let order = NewOrder::from_items(BUYER, vec![LineItem::new(product.id, 1)])
        .with_pricing(PricingContext::default().with_shipping(Ugx::zero(), Credits::zero()));
    api.create_order(order).await.expect("Error creating order")
}

#[tokio::test]
async fn hybrid_payment_is_settled_on_confirmation() {
    let db = new_test_db(5).await;
    let placed = unpaid_order(&db, 20_000, 150).await;
    seed::fund(&db, BUYER, 100).await;
    let gateway = MockGateway::accepting();
    let api = payment_api(&db, gateway.clone(), PricingPolicy::default());

    let request = PaymentRequest::mobile_money(true, "mtn", PHONE);
    let outcome = api.process_order_payment(placed.order.id, request).await.expect("Error starting payment");
    let data = outcome.payment.payment_data;
    assert_eq!(data.credits_used, Credits::from(100));
    assert_eq!(data.ugx_amount, Ugx::from(19_900));
    assert!(data.is_hybrid);
    assert_eq!(outcome.payment.status, PaymentStatus::Pending);
    assert_eq!(outcome.order.payment_id, Some(outcome.payment.id));
    assert_eq!(gateway.requests()[0].amount, Ugx::from(19_900));
    // Credits are only taken when the payment is confirmed
    assert_eq!(db.credit_balance(BUYER).await.unwrap(), Credits::from(100));

    let confirmation = api.confirm_payment_by_transaction_id("MM-TX-0001").await.expect("Error confirming payment");
    assert!(confirmation.newly_confirmed);
    assert_eq!(confirmation.payment.status, PaymentStatus::Completed);
    assert!(confirmation.payment.completed_at.is_some());
    let order = confirmation.order;
    assert_eq!(order.status, OrderStatusType::Processing);
    assert_eq!(order.payment_status, OrderPaymentStatus::Paid);
    assert_eq!(order.paid_ugx, Ugx::from(19_900));
    assert_eq!(order.paid_credits, Credits::from(100));
    assert!(order.paid_at.is_some());
    assert_eq!(db.credit_balance(BUYER).await.unwrap(), Credits::zero());

    let again = api.confirm_payment(outcome.payment.id).await.expect("Confirming twice should be harmless");
    assert!(!again.newly_confirmed);
    assert_eq!(again.order, order);
    assert_eq!(db.credit_balance(BUYER).await.unwrap(), Credits::zero());
    tear_down(db).await;
}

#[tokio::test]
async fn credits_that_cover_everything_confirm_immediately() {
    let db = new_test_db(5).await;
    let placed = unpaid_order(&db, 1_000, 1_000).await;
    seed::fund(&db, BUYER, 5_000).await;
    let gateway = MockGateway::accepting();
    let policy = PricingPolicy::default().with_max_credit_percentage(100);
    let api = payment_api(&db, gateway.clone(), policy);

    let outcome = api.process_order_payment(placed.order.id, PaymentRequest::credits()).await.unwrap();
    assert_eq!(outcome.payment.status, PaymentStatus::Completed);
    assert_eq!(outcome.payment.payment_data, PaymentData::credits_only(Credits::from(1_000)));
    assert_eq!(outcome.order.payment_status, OrderPaymentStatus::Paid);
    assert_eq!(outcome.order.paid_credits, Credits::from(1_000));
    assert!(gateway.requests().is_empty());
    assert_eq!(db.credit_balance(BUYER).await.unwrap(), Credits::from(4_000));

    let err = api.process_order_payment(placed.order.id, PaymentRequest::credits()).await.unwrap_err();
    assert!(matches!(err, SettlementError::InvalidStateTransition(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn payments_for_other_payables_are_refused() {
    let db = new_test_db(5).await;
    seed::fund(&db, BUYER, 1_000).await;
    let subscription = NewPayment {
        payable: Payable::StoreSubscription(3),
        buyer_id: BUYER,
        method: PaymentMethod::Credits,
        provider: None,
        payment_data: PaymentData::credits_only(Credits::from(500)),
    };
    let payment = {
        let mut tx = db.pool().begin().await.unwrap();
        let payment = payments::insert_payment(subscription, PaymentStatus::Pending, &mut tx).await.unwrap();
        tx.commit().await.unwrap();
        payment
    };
    let api = payment_api(&db, MockGateway::accepting(), PricingPolicy::default());

    let err = api.confirm_payment(payment.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::WrongPayableType(id) if id == payment.id));
    assert_eq!(db.credit_balance(BUYER).await.unwrap(), Credits::from(1_000));
    let unchanged = db.fetch_payment(payment.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, PaymentStatus::Pending);
    tear_down(db).await;
}

#[tokio::test]
async fn spent_credits_abort_the_confirmation() {
    let db = new_test_db(5).await;
    let placed = unpaid_order(&db, 20_000, 150).await;
    seed::fund(&db, BUYER, 100).await;
    let api = payment_api(&db, MockGateway::accepting(), PricingPolicy::default());

    let outcome = api.process_order_payment(placed.order.id, PaymentRequest::deferred(true)).await.unwrap();
    assert_eq!(outcome.payment.payment_data.credits_used, Credits::from(100));
    db.debit(BUYER, Credits::from(60), "Spent elsewhere", None).await.unwrap();

    let err = api.confirm_payment(outcome.payment.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::InsufficientCredits { .. }));
    let payment = db.fetch_payment(outcome.payment.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    let order = db.fetch_order(placed.order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
    assert_eq!(db.credit_balance(BUYER).await.unwrap(), Credits::from(40));
    tear_down(db).await;
}

#[tokio::test]
async fn failed_payments_leave_the_order_payable() {
    let db = new_test_db(5).await;
    let placed = unpaid_order(&db, 8_000, 0).await;
    let api = payment_api(&db, MockGateway::accepting(), PricingPolicy::default());

    let outcome = api.process_order_payment(placed.order.id, PaymentRequest::deferred(false)).await.unwrap();
    let failed = api.fail_payment(outcome.payment.id, "Buyer walked away").await.unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("Buyer walked away"));

    let again = api.fail_payment(outcome.payment.id, "Twice").await.unwrap();
    assert_eq!(again.failure_reason.as_deref(), Some("Buyer walked away"));

    let err = api.confirm_payment(outcome.payment.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::InvalidStateTransition(_)));

    let order = db.fetch_order(placed.order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);

    let err = api.fail_payment(9_999, "Unknown").await.unwrap_err();
    assert!(matches!(err, SettlementError::PaymentNotFound(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn a_new_attempt_supersedes_the_pending_one() {
    let db = new_test_db(5).await;
    let placed = unpaid_order(&db, 8_000, 0).await;
    let api = payment_api(&db, MockGateway::accepting(), PricingPolicy::default());

    let first = api.process_order_payment(placed.order.id, PaymentRequest::deferred(false)).await.unwrap();
    let second = api.process_order_payment(placed.order.id, PaymentRequest::mobile_money(false, "mtn", PHONE)).await.unwrap();
    assert_ne!(first.payment.id, second.payment.id);
    assert_eq!(second.order.payment_id, Some(second.payment.id));
    assert_eq!(second.order.payment_method, PaymentMethod::MobileMoney);

    let all = db.fetch_payments_for_order(placed.order.id).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].status, PaymentStatus::Failed);
    assert_eq!(all[0].failure_reason.as_deref(), Some("superseded"));
    assert_eq!(all[1].status, PaymentStatus::Pending);
    tear_down(db).await;
}

#[tokio::test]
async fn gateway_errors_are_reported_and_recorded() {
    let db = new_test_db(5).await;
    let placed = unpaid_order(&db, 8_000, 0).await;
    let api = payment_api(&db, MockGateway::rejecting(), PricingPolicy::default());

    let err = api
        .process_order_payment(placed.order.id, PaymentRequest::mobile_money(false, "airtel", "0701234567"))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::GatewayError(_)));
    let order = db.fetch_order(placed.order.id).await.unwrap().unwrap();
    assert!(order.gateway_error.is_some());
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
    let payments = db.fetch_payments_for_order(placed.order.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Failed);

    let err = api.confirm_payment_by_transaction_id("MM-TX-UNKNOWN").await.unwrap_err();
    assert!(matches!(err, SettlementError::PaymentNotFound(_)));

    let err = api.process_order_payment(placed.order.id, PaymentRequest::mobile_money(false, "", PHONE)).await.unwrap_err();
    assert!(matches!(err, SettlementError::ValidationError(_)));
    tear_down(db).await;
}
