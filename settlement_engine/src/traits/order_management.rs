use crate::{
    db_types::{Order, OrderItem, Payment},
    se_api::order_objects::OrderQueryFilter,
    traits::SettlementError,
};

/// Read-only queries over orders and payments.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError>;

    /// Orders matching the filter, oldest first
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementError>;

    async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, SettlementError> {
        self.search_orders(OrderQueryFilter::default().with_buyer_id(buyer_id)).await
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, SettlementError>;

    async fn fetch_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>, SettlementError>;

    /// Every payment attempt for an order, oldest first
    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, SettlementError>;
}
