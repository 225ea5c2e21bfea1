use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, OrderStatusType};

/// Emitted once an order (and its items) has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Emitted when an order's payment status first becomes `paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an order is cancelled, whether by a buyer, a merchant or the expiry worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
    pub reason: Option<String>,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        let reason = order.cancel_reason.clone();
        Self { order, reason }
    }
}

/// Emitted for each fulfilment step (`shipped`, `delivered`, `completed`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        Self { order, old_status }
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderPaid(OrderPaidEvent),
    OrderCancelled(OrderCancelledEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
}
