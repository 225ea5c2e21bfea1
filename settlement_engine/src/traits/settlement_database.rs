use chrono::Duration;
use settlement_common::Credits;
use thiserror::Error;

use crate::{
    db_types::{Order, OrderStatusType, Payment},
    gateway::GatewayError,
    se_api::{
        order_objects::{NewOrder, PlacedOrder},
        payment_objects::{PaymentOutcome, PaymentRequest},
        policy::PricingPolicy,
    },
    traits::{
        data_objects::{ExpiryResult, PaymentConfirmation},
        CartManagement,
        CatalogManagement,
        CreditLedger,
        InventoryManagement,
        OrderManagement,
    },
};

/// This trait defines the highest level of behaviour for backends supporting the settlement engine.
///
/// Every method is a single atomic unit of work: either all of its effects are visible afterwards, or none are.
/// Nothing here talks to the mobile-money gateway. The APIs call the gateway after these methods commit and then
/// report the outcome back through [`record_gateway_transaction`](Self::record_gateway_transaction) or
/// [`record_gateway_failure`](Self::record_gateway_failure).
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase:
    Clone + CatalogManagement + InventoryManagement + CreditLedger + CartManagement + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Takes a new order, and in a single atomic transaction:
    /// * consumes the source cart (if the order is placed from a cart),
    /// * reserves stock for every line, and snapshots the lines into order items,
    /// * prices the order using the live product rows and the given policy,
    /// * stores the order with a freshly generated order number,
    /// * for credit checkouts, debits the buyer and records a completed credits payment. The order is then `paid` and
    ///   `processing`,
    /// * for mobile-money checkouts, records a pending payment for `total_ugx`.
    ///
    /// Any failure rolls back the whole transaction, including the cart.
    async fn place_order(&self, order: NewOrder, policy: &PricingPolicy) -> Result<PlacedOrder, SettlementError>;

    /// Stores the transaction id returned by the gateway on both the payment and its order, and clears any previous
    /// gateway error on the order.
    async fn record_gateway_transaction(
        &self,
        payment_id: i64,
        transaction_id: &str,
    ) -> Result<PaymentOutcome, SettlementError>;

    /// Marks the payment as `failed` and records the gateway error on the order. The order itself stays unpaid, so
    /// payment can be retried.
    async fn record_gateway_failure(&self, payment_id: i64, error: &str) -> Result<PaymentOutcome, SettlementError>;

    /// Starts a new payment for a pending order:
    /// * any active (pending) payment for the order is marked `failed` with reason `superseded`,
    /// * the split between credits and UGX is calculated against the buyer's live balance,
    /// * a new pending payment is stored and linked to the order.
    ///
    /// If nothing is left to pay in UGX, the payment is confirmed within the same transaction.
    async fn start_payment(
        &self,
        order_id: i64,
        request: &PaymentRequest,
        policy: &PricingPolicy,
    ) -> Result<PaymentOutcome, SettlementError>;

    /// Confirms a pending order payment, debits any credits it uses, and marks the order as paid.
    ///
    /// ## Failure modes:
    /// * `PaymentNotFound` if the payment does not exist.
    /// * `WrongPayableType` if the payment does not settle an order. Nothing is changed.
    /// * `InvalidStateTransition` if the payment has failed.
    /// * `InsufficientCredits` if the buyer no longer has the credits the split assumed. Nothing is changed.
    ///
    /// Confirming a payment that is already completed changes nothing, and `newly_confirmed` is false in the result.
    async fn confirm_payment(&self, payment_id: i64) -> Result<PaymentConfirmation, SettlementError>;

    /// Marks a pending payment as `failed`. The order remains unpaid and its stock stays reserved.
    async fn fail_payment(&self, payment_id: i64, reason: &str) -> Result<Payment, SettlementError>;

    /// Cancels an order that is `pending` or `processing`, releasing the stock held by every one of its items. A pending
    /// payment for the order is marked as `failed`.
    async fn cancel_order(&self, order_id: i64, reason: &str) -> Result<Order, SettlementError>;

    /// Moves an order one step along `processing → shipped → delivered → completed`, recording the matching
    /// timestamp.
    async fn advance_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatusType,
    ) -> Result<Order, SettlementError>;

    /// Cancels every order that is still awaiting payment and was created longer than `unpaid_limit` ago.
    ///
    /// Stock for these orders is released, the order's payment status becomes `failed`, and so does its active
    /// payment (with reason `expired`).
    async fn expire_stalled_orders(&self, unpaid_limit: Duration) -> Result<ExpiryResult, SettlementError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), SettlementError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("There are no items to order")]
    EmptyCart,
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("The requested store {0} does not exist")]
    StoreNotFound(i64),
    #[error("Insufficient stock for {name} (product {product_id}). Requested {requested}, but only {available} available")]
    InsufficientStock { product_id: i64, name: String, requested: i64, available: i64 },
    #[error("Buyer {buyer_id} has {available} available, but {required} are required")]
    InsufficientCredits { buyer_id: i64, required: Credits, available: Credits },
    #[error("Illegal state transition. {0}")]
    InvalidStateTransition(String),
    #[error("Payment {0} does not settle an order")]
    WrongPayableType(i64),
    #[error("Mobile-money gateway error. {0}")]
    GatewayError(#[from] GatewayError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested payment does not exist: {0}")]
    PaymentNotFound(String),
}

impl SettlementError {
    pub fn illegal_transition(order: &Order, new_status: OrderStatusType) -> Self {
        Self::InvalidStateTransition(format!(
            "Order {} cannot move from {} (payment {}) to {new_status}",
            order.order_number, order.status, order.payment_status
        ))
    }
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for SettlementError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        SettlementError::DatabaseError(format!("Migration failed. {e}"))
    }
}
