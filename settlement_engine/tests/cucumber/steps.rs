use cucumber::{given, then, when};
use settlement_common::{Credits, Ugx};
use settlement_engine::{
    db_types::{CartOwner, ItemOptions, NewProduct, NewStore},
    order_objects::{CheckoutPayment, LineItem, NewOrder},
    payment_objects::PaymentRequest,
    CatalogManagement,
    CreditLedger,
    OrderManagement,
    SettlementError,
};

use crate::cucumber::SettlementWorld;

#[given(expr = "a store charging a {int} basis point platform fee")]
async fn open_store(world: &mut SettlementWorld, fee_bps: i64) {
    let store = NewStore::new(1, "Ntinda Market").with_fee_bps(fee_bps);
    let store = world.system().db.insert_store(store).await.expect("Error opening store");
    world.store = Some(store);
}

#[given(expr = "a product '{word}' priced at {int} UGX with {int} in stock")]
async fn add_product(world: &mut SettlementWorld, name: String, price: i64, quantity: i64) {
    let product = NewProduct::new(world.store_id(), name.as_str(), Ugx::from(price)).with_quantity(quantity);
    let product = world.system().db.insert_product(product).await.expect("Error adding product");
    world.products.insert(name, product);
}

#[given(expr = "a product '{word}' priced at {int} UGX or {int} credits with {int} in stock")]
async fn add_dual_priced_product(world: &mut SettlementWorld, name: String, price: i64, credits: i64, quantity: i64) {
    let product = NewProduct::new(world.store_id(), name.as_str(), Ugx::from(price))
        .with_credit_price(Credits::from(credits))
        .with_quantity(quantity);
    let product = world.system().db.insert_product(product).await.expect("Error adding product");
    world.products.insert(name, product);
}

#[given(expr = "buyer {int} has {int} credits")]
async fn fund_buyer(world: &mut SettlementWorld, buyer_id: i64, credits: i64) {
    world.system().db.credit(buyer_id, Credits::from(credits), "Opening balance").await.expect("Error funding buyer");
}

fn checkout_payment(method: &str) -> CheckoutPayment {
    match method {
        "credits" => CheckoutPayment::Credits,
        "later" => CheckoutPayment::Deferred,
        other => CheckoutPayment::MobileMoney { provider: other.to_string(), phone_number: "0772123456".into() },
    }
}

#[when(expr = "buyer {int} orders {int} '{word}' paying with {word}")]
async fn place_order(world: &mut SettlementWorld, buyer_id: i64, quantity: i64, name: String, method: String) {
    let product_id = world.product(&name).id;
    let order =
        NewOrder::from_items(buyer_id, vec![LineItem::new(product_id, quantity)]).with_payment(checkout_payment(&method));
    let result = world.system().flow.create_order(order).await;
    world.record(result);
}

#[when(expr = "buyer {int} adds {int} '{word}' to their cart")]
async fn add_to_cart(world: &mut SettlementWorld, buyer_id: i64, quantity: i64, name: String) {
    let product_id = world.product(&name).id;
    let owner = CartOwner::Buyer(buyer_id);
    world.system().carts.add_item(&owner, product_id, quantity, ItemOptions::new()).await.expect("Error adding to cart");
}

#[when(expr = "buyer {int} checks out their cart paying with {word}")]
async fn checkout_cart(world: &mut SettlementWorld, buyer_id: i64, method: String) {
    let order = NewOrder::from_cart(buyer_id, CartOwner::Buyer(buyer_id)).with_payment(checkout_payment(&method));
    let result = world.system().flow.create_order(order).await;
    world.record(result);
}

#[when(expr = "the last order is cancelled")]
async fn cancel_last_order(world: &mut SettlementWorld) {
    let order_id = world.last_order_id();
    world.system().flow.cancel(order_id, "Cancelled by buyer").await.expect("Error cancelling order");
}

#[when(expr = "buyer pays for the last order with {word} mobile money and credits")]
async fn pay_hybrid(world: &mut SettlementWorld, provider: String) {
    let order_id = world.last_order_id();
    let request = PaymentRequest::mobile_money(true, provider, "0772123456");
    world.system().payments.process_order_payment(order_id, request).await.expect("Error starting payment");
}

#[when(expr = "the gateway confirms transaction [{word}]")]
async fn confirm_transaction(world: &mut SettlementWorld, txid: String) {
    world.system().payments.confirm_payment_by_transaction_id(&txid).await.expect("Error confirming payment");
}

#[then(expr = "the last order is {word} with payment {word}")]
async fn check_order_status(world: &mut SettlementWorld, status: String, payment_status: String) {
    let order_id = world.last_order_id();
    let order = world.system().db.fetch_order(order_id).await.expect("Error fetching order").expect("Order missing");
    assert_eq!(order.status.to_string(), status, "Order status is incorrect");
    assert_eq!(order.payment_status.to_string(), payment_status, "Payment status is incorrect");
}

#[then(expr = "the last order totals {int} UGX and {int} credits")]
async fn check_order_totals(world: &mut SettlementWorld, ugx: i64, credits: i64) {
    let order = &world.last_order.as_ref().expect("No order has been placed").order;
    assert_eq!(order.totals.total_ugx, Ugx::from(ugx), "UGX total is incorrect");
    assert_eq!(order.totals.total_credits, Credits::from(credits), "Credit total is incorrect");
}

#[then(expr = "the last order paid {int} UGX and {int} credits")]
async fn check_order_paid(world: &mut SettlementWorld, ugx: i64, credits: i64) {
    let order_id = world.last_order_id();
    let order = world.system().db.fetch_order(order_id).await.expect("Error fetching order").expect("Order missing");
    assert_eq!(order.paid_ugx, Ugx::from(ugx), "UGX paid is incorrect");
    assert_eq!(order.paid_credits, Credits::from(credits), "Credits paid is incorrect");
}

#[then(expr = "'{word}' has {int} in stock")]
async fn check_stock(world: &mut SettlementWorld, name: String, quantity: i64) {
    let product_id = world.product(&name).id;
    let product =
        world.system().db.fetch_product(product_id).await.expect("Error fetching product").expect("Product missing");
    assert_eq!(product.quantity, quantity, "Stock level is incorrect");
}

#[then(expr = "buyer {int} has {int} credits left")]
async fn check_credits(world: &mut SettlementWorld, buyer_id: i64, credits: i64) {
    let balance = world.system().db.credit_balance(buyer_id).await.expect("Error fetching balance");
    assert_eq!(balance, Credits::from(credits), "Credit balance is incorrect");
}

#[then(expr = "buyer {int} has {int} items in their cart")]
async fn check_cart(world: &mut SettlementWorld, buyer_id: i64, count: i64) {
    let cart = world.system().carts.cart(&CartOwner::Buyer(buyer_id)).await.expect("Error fetching cart");
    assert_eq!(cart.item_count(), count, "Cart size is incorrect");
}

#[then(expr = "the order is rejected for {word}")]
async fn check_rejection(world: &mut SettlementWorld, reason: String) {
    let err = world.last_error.as_ref().expect("The order was not rejected");
    let matched = match reason.as_str() {
        "stock" => matches!(err, SettlementError::InsufficientStock { .. }),
        "credits" => matches!(err, SettlementError::InsufficientCredits { .. }),
        "validation" => matches!(err, SettlementError::ValidationError(_)),
        "emptiness" => matches!(err, SettlementError::EmptyCart),
        _ => panic!("Unknown rejection reason {reason}"),
    };
    assert!(matched, "Unexpected error: {err}");
}

#[then(expr = "the gateway was asked for {int} UGX")]
async fn check_gateway_request(world: &mut SettlementWorld, ugx: i64) {
    let requests = world.system().gateway.requests();
    let last = requests.last().expect("The gateway was never called");
    assert_eq!(last.amount, Ugx::from(ugx), "Gateway amount is incorrect");
}
