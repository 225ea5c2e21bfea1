use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCancelledEvent,
    OrderCreatedEvent,
    OrderPaidEvent,
    OrderStatusChangedEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The publishing side of every registered hook. Cloned into each API that emits events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_cancelled_producer: Vec<EventProducer<OrderCancelledEvent>>,
    pub order_status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        publish(&self.order_created_producer, event).await
    }

    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        publish(&self.order_paid_producer, event).await
    }

    pub async fn publish_order_cancelled(&self, event: OrderCancelledEvent) {
        publish(&self.order_cancelled_producer, event).await
    }

    pub async fn publish_order_status_changed(&self, event: OrderStatusChangedEvent) {
        publish(&self.order_status_changed_producer, event).await
    }
}

async fn publish<E: Clone + Send + Sync>(producers: &[EventProducer<E>], event: E) {
    for producer in producers {
        producer.publish_event(event.clone()).await;
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_cancelled: Option<EventHandler<OrderCancelledEvent>>,
    pub on_order_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new("OrderCreated", buffer_size, f));
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new("OrderPaid", buffer_size, f));
        let on_order_cancelled =
            hooks.on_order_cancelled.map(|f| EventHandler::new("OrderCancelled", buffer_size, f));
        let on_order_status_changed =
            hooks.on_order_status_changed.map(|f| EventHandler::new("OrderStatusChanged", buffer_size, f));
        Self { on_order_created, on_order_paid, on_order_cancelled, on_order_status_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_cancelled {
            result.order_cancelled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_status_changed {
            result.order_status_changed_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for every registered handler. Each task ends once all of its producers are dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_cancelled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_status_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_cancelled: Option<Handler<OrderCancelledEvent>>,
    pub on_order_status_changed: Option<Handler<OrderStatusChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_cancelled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCancelledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_cancelled = Some(Arc::new(f));
        self
    }

    pub fn on_order_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_status_changed = Some(Arc::new(f));
        self
    }
}
