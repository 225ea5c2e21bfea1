use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Payment, PaymentStatus},
    events::{EventProducers, OrderPaidEvent},
    gateway::MobileMoneyGateway,
    se_api::{
        order_flow_api::collect_mobile_money,
        payment_objects::{PaymentOutcome, PaymentRequest},
        policy::PricingPolicy,
    },
    traits::{PaymentConfirmation, SettlementDatabase, SettlementError},
};

/// `PaymentApi` settles existing orders: hybrid credit/UGX payments, gateway confirmations and failures.
pub struct PaymentApi<B, G> {
    db: B,
    gateway: G,
    policy: PricingPolicy,
    producers: EventProducers,
}

impl<B, G> Debug for PaymentApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi ({:?})", self.policy)
    }
}

impl<B, G> PaymentApi<B, G> {
    pub fn new(db: B, gateway: G, policy: PricingPolicy, producers: EventProducers) -> Self {
        Self { db, gateway, policy, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> PaymentApi<B, G>
where
    B: SettlementDatabase,
    G: MobileMoneyGateway,
{
    /// Starts paying for an unpaid order.
    ///
    /// The buyer's credits are applied first (when requested), capped at the policy's `max_credit_percentage` of the
    /// UGX total. If credits cover everything, the payment is confirmed straight away and the order is paid.
    /// Otherwise a pending payment for the UGX remainder is stored and, for mobile money, the gateway is asked to
    /// collect it.
    ///
    /// Any earlier pending payment for the order is superseded. A gateway failure is recorded on the payment and the
    /// order, and then returned as `GatewayError`.
    pub async fn process_order_payment(
        &self,
        order_id: i64,
        request: PaymentRequest,
    ) -> Result<PaymentOutcome, SettlementError> {
        let outcome = self.db.start_payment(order_id, &request, &self.policy).await?;
        let data = outcome.payment.payment_data;
        debug!(
            "💰️ Payment #{} for order {}: {} credits, {} UGX (hybrid: {})",
            outcome.payment.id, outcome.order.order_number, data.credits_used, data.ugx_amount, data.is_hybrid
        );
        if outcome.payment.status == PaymentStatus::Completed {
            self.producers.publish_order_paid(OrderPaidEvent::new(outcome.order.clone())).await;
            return Ok(outcome);
        }
        if outcome.payment.awaits_mobile_money() {
            let PaymentOutcome { order, payment } = outcome;
            return collect_mobile_money(&self.db, &self.gateway, &order, payment).await?.into_result();
        }
        Ok(outcome)
    }

    /// Confirms a pending payment. Credits reserved in the split are debited now and the order becomes paid.
    ///
    /// Confirming a payment a second time is harmless and returns the current state.
    pub async fn confirm_payment(&self, payment_id: i64) -> Result<PaymentConfirmation, SettlementError> {
        let confirmation = self.db.confirm_payment(payment_id).await?;
        if confirmation.newly_confirmed {
            self.producers.publish_order_paid(OrderPaidEvent::new(confirmation.order.clone())).await;
        }
        Ok(confirmation)
    }

    /// As [`Self::confirm_payment`], for gateway callbacks that only carry the provider's transaction id.
    pub async fn confirm_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<PaymentConfirmation, SettlementError> {
        let payment = self
            .db
            .fetch_payment_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| SettlementError::PaymentNotFound(transaction_id.to_string()))?;
        trace!("💰️ Transaction [{transaction_id}] belongs to payment #{}", payment.id);
        self.confirm_payment(payment.id).await
    }

    /// Marks a pending payment as failed. The order stays unpaid and keeps its stock.
    pub async fn fail_payment(&self, payment_id: i64, reason: &str) -> Result<Payment, SettlementError> {
        self.db.fail_payment(payment_id, reason).await
    }
}
