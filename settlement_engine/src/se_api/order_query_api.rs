use std::fmt::Debug;

use crate::{
    db_types::{Order, OrderItem, Payment},
    se_api::order_objects::OrderQueryFilter,
    traits::{OrderManagement, SettlementError},
};

/// An order together with its line items and every payment attempt made for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

/// Read-only access to orders and payments.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn order(&self, order_id: i64) -> Result<Option<Order>, SettlementError> {
        self.db.fetch_order(order_id).await
    }

    pub async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, SettlementError> {
        self.db.fetch_order_by_number(order_number).await
    }

    pub async fn order_details(&self, order_id: i64) -> Result<OrderDetails, SettlementError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
        let items = self.db.fetch_order_items(order_id).await?;
        let payments = self.db.fetch_payments_for_order(order_id).await?;
        Ok(OrderDetails { order, items, payments })
    }

    pub async fn orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, SettlementError> {
        self.db.fetch_orders_for_buyer(buyer_id).await
    }

    pub async fn search(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementError> {
        self.db.search_orders(query).await
    }

    pub async fn payment(&self, payment_id: i64) -> Result<Option<Payment>, SettlementError> {
        self.db.fetch_payment(payment_id).await
    }
}
