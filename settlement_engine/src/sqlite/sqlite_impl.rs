//! `SqliteDatabase` is a concrete implementation of a settlement engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use settlement_common::{Credits, Ugx};
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{carts, credits, db_url, new_pool, order_items, orders, payments, products, stores};
use crate::{
    db_types::{
        Cart,
        CartOwner,
        CreditTransaction,
        NewOrderItem,
        NewPayment,
        NewProduct,
        NewStore,
        Order,
        OrderItem,
        OrderStatusType,
        Payable,
        Payment,
        PaymentData,
        PaymentMethod,
        PaymentStatus,
        Product,
        Store,
    },
    helpers::{is_valid_ugandan_mobile, normalize_phone},
    se_api::{
        hybrid_split::split_payment,
        order_objects::{CheckoutPayment, LineItem, NewOrder, OrderQueryFilter, OrderSource, PlacedOrder},
        payment_objects::{PaymentOutcome, PaymentRequest},
        policy::PricingPolicy,
        pricing::{calculate_totals, ensure_positive_quantity, resolve_store_id},
    },
    traits::{
        CartManagement,
        CatalogManagement,
        CreditLedger,
        ExpiryResult,
        InventoryManagement,
        NewCartItem,
        OrderManagement,
        PaymentConfirmation,
        SettlementDatabase,
        SettlementError,
    },
};

pub const SUPERSEDED: &str = "superseded";
pub const EXPIRED: &str = "expired";
pub const CANCELLED: &str = "cancelled";

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

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn place_order(&self, order: NewOrder, policy: &PricingPolicy) -> Result<PlacedOrder, SettlementError> {
        let NewOrder { buyer_id, source, pricing, payment, notes } = order;
        pricing.validate()?;
        let mobile_money = match &payment {
            CheckoutPayment::MobileMoney { provider, phone_number } => {
                Some(validate_mobile_money(provider, phone_number)?)
            },
            _ => None,
        };
        if let OrderSource::Items(items) = &source {
            if items.is_empty() {
                return Err(SettlementError::EmptyCart);
            }
            for item in items {
                ensure_positive_quantity(item.product_id, item.quantity)?;
            }
        }
        let mut tx = self.pool.begin().await?;
        let lines = match source {
            OrderSource::Cart(owner) => {
                let items = carts::take_items(&owner, &mut tx).await?;
                carts::delete_cart(&owner, &mut tx).await?;
                if items.is_empty() {
                    debug!("🛒️ The cart of {owner} is empty. No order will be placed.");
                    return Err(SettlementError::EmptyCart);
                }
                items
                    .into_iter()
                    .map(|i| LineItem { product_id: i.product_id, quantity: i.quantity, options: i.options.0 })
                    .collect::<Vec<_>>()
            },
            OrderSource::Items(items) => items,
        };
        let mut reserved = Vec::with_capacity(lines.len());
        for line in lines {
            let product = products::reserve(line.product_id, line.quantity, &mut tx).await?;
            reserved.push((product, line));
        }
        let store_id = resolve_store_id(pricing.store_id, reserved.iter().map(|(p, _)| p))?;
        let store = stores::fetch_store(store_id, &mut tx).await?.ok_or(SettlementError::StoreNotFound(store_id))?;
        let new_items = reserved
            .into_iter()
            .map(|(product, line)| NewOrderItem::snapshot(&product, line.quantity, line.options))
            .collect::<Vec<_>>();
        if payment == CheckoutPayment::Credits {
            if let Some(item) = new_items.iter().find(|i| i.unit_price_credits.is_none()) {
                return Err(SettlementError::ValidationError(format!(
                    "{} (product {}) cannot be paid for with credits",
                    item.product_name, item.product_id
                )));
            }
        }
        let totals = calculate_totals(&new_items, &store, &pricing, policy)?;
        let record = orders::NewOrderRecord {
            store_id,
            buyer_id,
            payment_method: payment.method(),
            totals: &totals,
            mobile_money_provider: mobile_money.as_ref().map(|(p, _)| p.as_str()),
            phone_number: mobile_money.as_ref().map(|(_, n)| n.as_str()),
            notes: notes.as_deref(),
        };
        let mut order = orders::insert_order(record, &mut tx).await?;
        let mut items = Vec::with_capacity(new_items.len());
        for item in new_items {
            items.push(order_items::insert_item(order.id, item, &mut tx).await?);
        }
        let checkout_payment = match mobile_money {
            None if payment == CheckoutPayment::Credits => {
                let reason = format!("Payment for order {}", order.order_number);
                credits::debit(buyer_id, totals.total_credits, &reason, Some(order.id), &mut tx).await?;
                let data = PaymentData::credits_only(totals.total_credits);
                let new_payment = NewPayment::for_order(&order, PaymentMethod::Credits, data);
                let p = payments::insert_payment(new_payment, PaymentStatus::Completed, &mut tx).await?;
                orders::link_payment(order.id, p.id, &mut tx).await?;
                order = orders::mark_paid(order.id, Ugx::zero(), totals.total_credits, &mut tx).await?.ok_or_else(|| {
                    SettlementError::DatabaseError(format!("Order {} was not awaiting payment", order.order_number))
                })?;
                info!("💰️ Order {} paid in full with {}", order.order_number, totals.total_credits);
                Some(p)
            },
            Some((provider, _)) => {
                let data = PaymentData::ugx_only(totals.total_ugx);
                let new_payment =
                    NewPayment::for_order(&order, PaymentMethod::MobileMoney, data).with_provider(provider);
                let p = payments::insert_payment(new_payment, PaymentStatus::Pending, &mut tx).await?;
                order = orders::link_payment(order.id, p.id, &mut tx).await?;
                Some(p)
            },
            None => None,
        };
        tx.commit().await?;
        info!(
            "🔄️ Order {} placed for buyer #{buyer_id} at store #{store_id}. Total: {} / {}",
            order.order_number, order.totals.total_ugx, order.totals.total_credits
        );
        Ok(PlacedOrder { order, items, payment: checkout_payment })
    }

    async fn record_gateway_transaction(
        &self,
        payment_id: i64,
        transaction_id: &str,
    ) -> Result<PaymentOutcome, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::set_transaction_id(payment_id, transaction_id, &mut tx).await?;
        let order_id = order_id_for(&payment)?;
        let order = orders::record_transaction_id(order_id, transaction_id, &mut tx).await?;
        tx.commit().await?;
        debug!("💰️ Gateway accepted payment #{payment_id} for order {} as [{transaction_id}]", order.order_number);
        Ok(PaymentOutcome { order, payment })
    }

    async fn record_gateway_failure(&self, payment_id: i64, error: &str) -> Result<PaymentOutcome, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let payment = match payments::fail_pending(payment_id, error, &mut tx).await? {
            Some(p) => p,
            None => payments::fetch_payment(payment_id, &mut tx)
                .await?
                .ok_or_else(|| SettlementError::PaymentNotFound(payment_id.to_string()))?,
        };
        let order_id = order_id_for(&payment)?;
        let order = orders::record_gateway_error(order_id, error, &mut tx).await?;
        tx.commit().await?;
        warn!("💰️ Gateway request for payment #{payment_id} (order {}) failed: {error}", order.order_number);
        Ok(PaymentOutcome { order, payment })
    }

    async fn start_payment(
        &self,
        order_id: i64,
        request: &PaymentRequest,
        policy: &PricingPolicy,
    ) -> Result<PaymentOutcome, SettlementError> {
        let mobile_money = match request.method {
            PaymentMethod::MobileMoney => Some(validate_mobile_money(
                request.provider.as_deref().unwrap_or_default(),
                request.phone_number.as_deref().unwrap_or_default(),
            )?),
            _ => None,
        };
        let mut tx = self.pool.begin().await?;
        let superseded = payments::fail_active_for_order(order_id, SUPERSEDED, &mut tx).await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
        if !order.awaiting_payment() {
            return Err(SettlementError::InvalidStateTransition(format!(
                "Order {} is {} with payment {}. Only pending, unpaid orders accept new payments",
                order.order_number, order.status, order.payment_status
            )));
        }
        if let Some(p) = superseded {
            debug!("💰️ Payment #{} for order {} superseded", p.id, order.order_number);
        }
        let available = credits::balance(order.buyer_id, &mut tx).await?;
        let use_credits = request.use_credits || request.method == PaymentMethod::Credits;
        let split = split_payment(order.totals.total_ugx, order.totals.total_credits, available, use_credits, policy);
        trace!(
            "💰️ Split for order {}: {} credits (of {available}), {} remaining. Hybrid: {}",
            order.order_number,
            split.credits_used,
            split.ugx_amount,
            split.is_hybrid
        );
        let mut new_payment = NewPayment::for_order(&order, request.method, split);
        if let Some((provider, phone)) = &mobile_money {
            orders::set_mobile_money_details(order_id, provider, phone, &mut tx).await?;
            new_payment = new_payment.with_provider(provider.as_str());
        }
        let payment = payments::insert_payment(new_payment, PaymentStatus::Pending, &mut tx).await?;
        let mut order = orders::link_payment(order_id, payment.id, &mut tx).await?;
        let payment = if split.ugx_amount.is_zero() {
            let confirmation = confirm_in_transaction(payment.id, &mut tx).await?;
            order = confirmation.order;
            confirmation.payment
        } else {
            payment
        };
        tx.commit().await?;
        debug!("💰️ Payment #{} started for order {} ({})", payment.id, order.order_number, payment.status);
        Ok(PaymentOutcome { order, payment })
    }

    async fn confirm_payment(&self, payment_id: i64) -> Result<PaymentConfirmation, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let confirmation = confirm_in_transaction(payment_id, &mut tx).await?;
        tx.commit().await?;
        Ok(confirmation)
    }

    async fn fail_payment(&self, payment_id: i64, reason: &str) -> Result<Payment, SettlementError> {
        let mut tx = self.pool.begin().await?;
        if let Some(payment) = payments::fail_pending(payment_id, reason, &mut tx).await? {
            tx.commit().await?;
            info!("💰️ Payment #{payment_id} failed: {reason}");
            return Ok(payment);
        }
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::PaymentNotFound(payment_id.to_string()))?;
        match payment.status {
            PaymentStatus::Failed => {
                debug!("💰️ Payment #{payment_id} has already failed. Nothing to do.");
                Ok(payment)
            },
            status => Err(SettlementError::InvalidStateTransition(format!(
                "Payment #{payment_id} is {status} and cannot be marked as failed"
            ))),
        }
    }

    async fn cancel_order(&self, order_id: i64, reason: &str) -> Result<Order, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::cancel(order_id, reason, &mut tx).await? else {
            let order =
                orders::fetch_order(order_id, &mut tx).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
            return Err(SettlementError::illegal_transition(&order, OrderStatusType::Cancelled));
        };
        release_order_items(order_id, &mut tx).await?;
        payments::fail_active_for_order(order_id, CANCELLED, &mut tx).await?;
        // UGX refunds happen outside the engine. Spent credits go straight back to the buyer.
        if order.is_paid() && order.paid_credits.is_positive() {
            let reason = format!("Refund for cancelled order {}", order.order_number);
            credits::credit(order.buyer_id, order.paid_credits, &reason, Some(order.id), &mut tx).await?;
            info!("💰️ {} refunded to buyer #{} for order {}", order.paid_credits, order.buyer_id, order.order_number);
        }
        tx.commit().await?;
        info!("🔄️ Order {} cancelled: {reason}", order.order_number);
        Ok(order)
    }

    async fn advance_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatusType,
    ) -> Result<Order, SettlementError> {
        let from = match new_status {
            OrderStatusType::Shipped => OrderStatusType::Processing,
            OrderStatusType::Delivered => OrderStatusType::Shipped,
            OrderStatusType::Completed => OrderStatusType::Delivered,
            other => {
                return Err(SettlementError::InvalidStateTransition(format!(
                    "{other} is not a fulfilment status. Use the order flow API to pay or cancel orders"
                )))
            },
        };
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::advance_status(order_id, from, new_status, &mut tx).await? else {
            let order =
                orders::fetch_order(order_id, &mut tx).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
            return Err(SettlementError::illegal_transition(&order, new_status));
        };
        tx.commit().await?;
        debug!("🔄️ Order {} moved from {from} to {new_status}", order.order_number);
        Ok(order)
    }

    async fn expire_stalled_orders(&self, unpaid_limit: Duration) -> Result<ExpiryResult, SettlementError> {
        let cutoff = Utc::now() - unpaid_limit;
        let ids = {
            let mut conn = self.pool.acquire().await?;
            orders::fetch_stalled_order_ids(cutoff, &mut conn).await?
        };
        trace!("🕰️ {} orders have been awaiting payment since before {cutoff}", ids.len());
        let mut expired = Vec::with_capacity(ids.len());
        for order_id in ids {
            let mut tx = self.pool.begin().await?;
            // The order may have been paid or cancelled since the ids were read
            let Some(order) = orders::expire(order_id, EXPIRED, &mut tx).await? else {
                continue;
            };
            release_order_items(order_id, &mut tx).await?;
            payments::fail_active_for_order(order_id, EXPIRED, &mut tx).await?;
            tx.commit().await?;
            debug!("🕰️ Order {} expired", order.order_number);
            expired.push(order);
        }
        Ok(ExpiryResult::new(expired))
    }

    async fn close(&mut self) -> Result<(), SettlementError> {
        self.pool.close().await;
        Ok(())
    }
}

/// The order a payment settles. Only order payments are handled by the settlement engine.
fn order_id_for(payment: &Payment) -> Result<i64, SettlementError> {
    match payment.payable {
        Payable::Order(order_id) => Ok(order_id),
        Payable::StoreSubscription(_) => Err(SettlementError::WrongPayableType(payment.id)),
    }
}

/// Returns the normalized provider and phone number, or a validation error.
fn validate_mobile_money(provider: &str, phone_number: &str) -> Result<(String, String), SettlementError> {
    let provider = provider.trim();
    if provider.is_empty() {
        return Err(SettlementError::ValidationError("A mobile-money provider is required".into()));
    }
    if !is_valid_ugandan_mobile(phone_number) {
        return Err(SettlementError::ValidationError(format!(
            "{phone_number} is not a valid Ugandan mobile number"
        )));
    }
    Ok((provider.to_string(), normalize_phone(phone_number)))
}

async fn release_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<(), SettlementError> {
    let items = order_items::fetch_items(order_id, conn).await?;
    for item in items {
        products::release(item.product_id, item.quantity, conn).await?;
    }
    trace!("📦️ Stock for order #{order_id} released");
    Ok(())
}

/// Completes a pending order payment, debits the credits it uses and marks the order as paid.
///
/// The first statement is the conditional update of the payment row, so this can run at the start of a write
/// transaction.
async fn confirm_in_transaction(
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<PaymentConfirmation, SettlementError> {
    let Some(payment) = payments::complete_pending_order_payment(payment_id, conn).await? else {
        let payment = payments::fetch_payment(payment_id, conn)
            .await?
            .ok_or_else(|| SettlementError::PaymentNotFound(payment_id.to_string()))?;
        let order_id = order_id_for(&payment)?;
        return match payment.status {
            PaymentStatus::Completed => {
                debug!("💰️ Payment #{payment_id} has already been confirmed. Nothing to do.");
                let order =
                    orders::fetch_order(order_id, conn).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
                Ok(PaymentConfirmation { order, payment, newly_confirmed: false })
            },
            status => Err(SettlementError::InvalidStateTransition(format!(
                "Payment #{payment_id} is {status} and cannot be confirmed"
            ))),
        };
    };
    let order_id = order_id_for(&payment)?;
    let PaymentData { credits_used, ugx_amount, .. } = payment.payment_data;
    if credits_used.is_positive() {
        let reason = format!("Payment #{payment_id}");
        credits::debit(payment.buyer_id, credits_used, &reason, Some(order_id), conn).await.map_err(|e| {
            if matches!(e, SettlementError::InsufficientCredits { .. }) {
                error!(
                    "💰️ Buyer #{} no longer has the {credits_used} that payment #{payment_id} was split with. The \
                     confirmation has been rolled back.",
                    payment.buyer_id
                );
            }
            e
        })?;
    }
    let order = orders::mark_paid(order_id, ugx_amount, credits_used, conn).await?.ok_or_else(|| {
        SettlementError::InvalidStateTransition(format!(
            "Order #{order_id} is no longer awaiting payment, so payment #{payment_id} cannot be confirmed"
        ))
    })?;
    info!("💰️ Payment #{payment_id} confirmed. Order {} is paid ({ugx_amount} + {credits_used})", order.order_number);
    Ok(PaymentConfirmation { order, payment, newly_confirmed: true })
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_store(&self, store: NewStore) -> Result<Store, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let store = stores::insert_store(store, &mut tx).await?;
        tx.commit().await?;
        Ok(store)
    }

    async fn fetch_store(&self, store_id: i64) -> Result<Option<Store>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(stores::fetch_store(store_id, &mut conn).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, SettlementError> {
        if product.name.trim().is_empty() {
            return Err(SettlementError::ValidationError("Products must have a name".into()));
        }
        if product.price_ugx.is_negative() || product.price_credits.map(|c| c.is_negative()).unwrap_or(false) {
            return Err(SettlementError::ValidationError(format!("{} cannot have a negative price", product.name)));
        }
        if product.track_inventory && !product.allow_backorder && product.quantity < 0 {
            return Err(SettlementError::ValidationError(format!(
                "{} does not allow backorders, so its stock cannot be negative",
                product.name
            )));
        }
        let store_id = product.store_id;
        let store = self.fetch_store(store_id).await?.ok_or(SettlementError::StoreNotFound(store_id))?;
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        let count = products::count_products_for_store(store_id, &mut tx).await?;
        if let Some(max) = store.tier.max_products() {
            if count > max {
                debug!("🗃️ Store #{store_id} is at its limit of {max} products. Product not added.");
                return Err(SettlementError::ValidationError(format!(
                    "Stores on the {:?} tier may list at most {max} products",
                    store.tier
                )));
            }
        }
        tx.commit().await?;
        Ok(product)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(product_id, &mut conn).await?)
    }

    async fn fetch_products_for_store(&self, store_id: i64) -> Result<Vec<Product>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_products_for_store(store_id, &mut conn).await?)
    }

    async fn archive_product(&self, product_id: i64) -> Result<Product, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let product = products::archive_product(product_id, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let product = products::reserve(product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let product = products::release(product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn set_stock(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let product = products::set_quantity(product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }
}

impl CreditLedger for SqliteDatabase {
    async fn credit_balance(&self, buyer_id: i64) -> Result<Credits, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(credits::balance(buyer_id, &mut conn).await?)
    }

    async fn debit(
        &self,
        buyer_id: i64,
        amount: Credits,
        reason: &str,
        order_id: Option<i64>,
    ) -> Result<Credits, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let balance = credits::debit(buyer_id, amount, reason, order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn credit(&self, buyer_id: i64, amount: Credits, reason: &str) -> Result<Credits, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let balance = credits::credit(buyer_id, amount, reason, None, &mut tx).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn credit_history(&self, buyer_id: i64) -> Result<Vec<CreditTransaction>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(credits::history(buyer_id, &mut conn).await?)
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, owner: &CartOwner) -> Result<Cart, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::fetch_cart(owner, &mut conn).await?)
    }

    async fn add_cart_item(&self, owner: &CartOwner, item: NewCartItem) -> Result<Cart, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::fetch_or_create_cart(owner, &mut tx).await?;
        carts::upsert_item(cart_id, item, &mut tx).await?;
        let cart = carts::fetch_cart(owner, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn set_cart_item_quantity(
        &self,
        owner: &CartOwner,
        item_key: &str,
        quantity: i64,
    ) -> Result<Cart, SettlementError> {
        if quantity <= 0 {
            return Err(SettlementError::ValidationError(format!("Cart quantities must be positive, not {quantity}")));
        }
        let mut tx = self.pool.begin().await?;
        let updated = carts::set_item_quantity(owner, item_key, quantity, &mut tx).await?;
        if updated == 0 {
            return Err(SettlementError::ValidationError(format!("[{item_key}] is not in the cart of {owner}")));
        }
        let cart = carts::fetch_cart(owner, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_cart_item(&self, owner: &CartOwner, item_key: &str) -> Result<Cart, SettlementError> {
        let mut tx = self.pool.begin().await?;
        carts::remove_item(owner, item_key, &mut tx).await?;
        let cart = carts::fetch_cart(owner, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn clear_cart(&self, owner: &CartOwner) -> Result<(), SettlementError> {
        let mut tx = self.pool.begin().await?;
        carts::delete_cart(owner, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn merge_carts(&self, from: &CartOwner, into: &CartOwner) -> Result<Cart, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let items = carts::take_items(from, &mut tx).await?;
        carts::delete_cart(from, &mut tx).await?;
        if !items.is_empty() {
            let cart_id = carts::fetch_or_create_cart(into, &mut tx).await?;
            for item in items {
                let item = NewCartItem {
                    item_key: item.item_key,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price_ugx: item.unit_price_ugx,
                    options: item.options.0,
                };
                carts::upsert_item(cart_id, item, &mut tx).await?;
            }
        }
        let cart = carts::fetch_cart(into, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(order_number, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(order_items::fetch_items(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment(payment_id, &mut conn).await?)
    }

    async fn fetch_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_by_transaction_id(transaction_id, &mut conn).await?)
    }

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payments_for_order(order_id, &mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `SE_DATABASE_URL` (or the default) as the database URL.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), SettlementError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
