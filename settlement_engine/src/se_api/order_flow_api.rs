use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    db_types::{Order, OrderStatusType, Payment},
    events::{EventProducers, OrderCancelledEvent, OrderCreatedEvent, OrderPaidEvent, OrderStatusChangedEvent},
    gateway::{initiate_payment, GatewayError, MobileMoneyGateway, MobileMoneyRequest},
    se_api::{
        order_objects::{NewOrder, PlacedOrder},
        payment_objects::{PaymentOutcome, PaymentRequest},
        policy::PricingPolicy,
    },
    traits::{SettlementDatabase, SettlementError},
};

/// `OrderFlowApi` is the primary API for taking orders through checkout, fulfilment, cancellation and expiry.
///
/// Database work happens inside the backend's transactions. The mobile-money gateway is only called once the order
/// has been committed, and its outcome is then written back in a second transaction.
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    policy: PricingPolicy,
    producers: EventProducers,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.policy)
    }
}

impl<B, G> OrderFlowApi<B, G> {
    pub fn new(db: B, gateway: G, policy: PricingPolicy, producers: EventProducers) -> Self {
        Self { db, gateway, policy, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: SettlementDatabase,
    G: MobileMoneyGateway,
{
    /// Places a new order.
    ///
    /// The order, its items, the stock reservations and (for credits checkouts) the credit debit all commit together,
    /// or not at all. For mobile-money checkouts the gateway is asked to collect `total_ugx` after the commit. A gateway
    /// failure does *not* fail this call: the order is kept, the payment is marked failed, and the error is recorded on
    /// the order's `gateway_error` so that payment can be retried.
    pub async fn create_order(&self, order: NewOrder) -> Result<PlacedOrder, SettlementError> {
        let buyer_id = order.buyer_id;
        let mut placed = self.db.place_order(order, &self.policy).await?;
        debug!("🔄️ Order {} created for buyer #{buyer_id}", placed.order.order_number);
        self.producers.publish_order_created(OrderCreatedEvent::new(placed.order.clone(), placed.items.clone())).await;
        if placed.order.is_paid() {
            self.producers.publish_order_paid(OrderPaidEvent::new(placed.order.clone())).await;
        }
        if let Some(payment) = placed.payment.take() {
            if payment.awaits_mobile_money() {
                let attempt = collect_mobile_money(&self.db, &self.gateway, &placed.order, payment).await?;
                placed.order = attempt.outcome.order;
                placed.payment = Some(attempt.outcome.payment);
            } else {
                placed.payment = Some(payment);
            }
        }
        Ok(placed)
    }

    /// Starts a fresh mobile-money attempt for an unpaid order. Any pending payment is superseded.
    ///
    /// Unlike [`Self::create_order`], a gateway failure here is returned as an error (after it has been recorded on the
    /// order).
    pub async fn retry_mobile_money(
        &self,
        order_id: i64,
        provider: &str,
        phone_number: &str,
    ) -> Result<PaymentOutcome, SettlementError> {
        let request = PaymentRequest::mobile_money(false, provider, phone_number);
        let PaymentOutcome { order, payment } = self.db.start_payment(order_id, &request, &self.policy).await?;
        collect_mobile_money(&self.db, &self.gateway, &order, payment).await?.into_result()
    }

    /// Cancels a `pending` or `processing` order and releases its stock.
    ///
    /// Cancelling a shipped, delivered, completed or already-cancelled order is an `InvalidStateTransition`.
    pub async fn cancel(&self, order_id: i64, reason: &str) -> Result<Order, SettlementError> {
        let order = self.db.cancel_order(order_id, reason).await?;
        self.producers.publish_order_cancelled(OrderCancelledEvent::new(order.clone())).await;
        Ok(order)
    }

    pub async fn mark_as_shipped(&self, order_id: i64) -> Result<Order, SettlementError> {
        self.advance(order_id, OrderStatusType::Processing, OrderStatusType::Shipped).await
    }

    pub async fn mark_as_delivered(&self, order_id: i64) -> Result<Order, SettlementError> {
        self.advance(order_id, OrderStatusType::Shipped, OrderStatusType::Delivered).await
    }

    /// The buyer confirms that the goods arrived. The order is completed.
    pub async fn confirm_received(&self, order_id: i64) -> Result<Order, SettlementError> {
        self.advance(order_id, OrderStatusType::Delivered, OrderStatusType::Completed).await
    }

    async fn advance(
        &self,
        order_id: i64,
        old_status: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Order, SettlementError> {
        let order = self.db.advance_order_status(order_id, new_status).await?;
        info!("🔄️ Order {} is now {new_status}", order.order_number);
        self.producers.publish_order_status_changed(OrderStatusChangedEvent::new(order.clone(), old_status)).await;
        Ok(order)
    }

    /// Cancels every unpaid order older than `unpaid_limit` and releases its stock.
    pub async fn expire_stalled_orders(&self, unpaid_limit: Duration) -> Result<Vec<Order>, SettlementError> {
        let result = self.db.expire_stalled_orders(unpaid_limit).await?;
        if !result.is_empty() {
            info!("🕰️ {} unpaid orders have expired", result.count());
        }
        for order in &result.expired {
            self.producers.publish_order_cancelled(OrderCancelledEvent::new(order.clone())).await;
        }
        Ok(result.expired)
    }
}

/// The recorded result of one call to the mobile-money gateway.
pub(crate) struct MobileMoneyAttempt {
    pub outcome: PaymentOutcome,
    pub error: Option<GatewayError>,
}

impl MobileMoneyAttempt {
    pub fn into_result(self) -> Result<PaymentOutcome, SettlementError> {
        match self.error {
            Some(e) => Err(SettlementError::GatewayError(e)),
            None => Ok(self.outcome),
        }
    }
}

/// Calls the gateway for a pending payment and records the result against the payment and the order.
///
/// Only a failure to record the result is returned as an `Err`. Gateway errors are carried in the attempt.
pub(crate) async fn collect_mobile_money<B, G>(
    db: &B,
    gateway: &G,
    order: &Order,
    payment: Payment,
) -> Result<MobileMoneyAttempt, SettlementError>
where
    B: SettlementDatabase,
    G: MobileMoneyGateway,
{
    let request = MobileMoneyRequest {
        amount: payment.payment_data.ugx_amount,
        payment_method: payment.provider.clone().or_else(|| order.mobile_money_provider.clone()).unwrap_or_default(),
        phone_number: order.phone_number.clone().unwrap_or_default(),
    };
    debug!(
        "💰️ Requesting {} from {} via {} for order {}",
        request.amount, request.phone_number, request.payment_method, order.order_number
    );
    match initiate_payment(gateway, request).await {
        Ok(txid) => {
            let outcome = db.record_gateway_transaction(payment.id, &txid).await?;
            Ok(MobileMoneyAttempt { outcome, error: None })
        },
        Err(e) => {
            warn!("💰️ Mobile-money request for order {} failed. {e}", order.order_number);
            let outcome = db.record_gateway_failure(payment.id, &e.to_string()).await?;
            Ok(MobileMoneyAttempt { outcome, error: Some(e) })
        },
    }
}
