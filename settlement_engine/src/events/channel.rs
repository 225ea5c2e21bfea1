//! Stateless pub-sub plumbing for settlement events.
//!
//! Each [`EventHandler`] owns one channel and one async callback. Any number of [`EventProducer`]s can publish into the
//! channel. The handler runs every event on its own task, so a slow hook never blocks the order flow that emitted the
//! event. Hooks only see the event itself, never the engine's state.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    name: &'static str,
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(name: &'static str, buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size.max(1));
        Self { name, listener, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.name, self.sender.clone())
    }

    /// Runs until every producer has been dropped and all in-flight hooks have finished.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting {} handler", self.name);
        // Only producers keep the channel open from here on
        drop(self.sender);
        let mut jobs = JoinSet::new();
        loop {
            tokio::select! {
                ev = self.listener.recv() => {
                    let Some(ev) = ev else { break };
                    trace!("📬️ {} event received", self.name);
                    let handler = Arc::clone(&self.handler);
                    jobs.spawn(async move { (handler)(ev).await });
                },
                // Reap finished hooks so the set does not grow with the event count
                Some(done) = jobs.join_next(), if !jobs.is_empty() => log_join_result(self.name, done),
            }
        }
        if !jobs.is_empty() {
            debug!("📬️ {} handler is waiting for {} hooks to finish", self.name, jobs.len());
        }
        while let Some(done) = jobs.join_next().await {
            log_join_result(self.name, done);
        }
        debug!("📬️ {} handler has shut down", self.name);
    }
}

fn log_join_result(name: &str, result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ {name} event handled"),
        Err(e) => warn!("📬️ A {name} hook did not complete: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    name: &'static str,
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(name: &'static str, sender: mpsc::Sender<E>) -> Self {
        Self { name, sender }
    }

    /// Publishing never fails the caller. If the handler has gone away, the event is logged and dropped.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to publish {} event: {e}", self.name);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicI64, Ordering};

    use settlement_common::Ugx;

    use super::*;

    #[tokio::test]
    async fn handler_sees_every_event_from_every_producer() {
        let _ = env_logger::try_init();
        let collected = Arc::new(AtomicI64::new(0));
        let c2 = collected.clone();
        let handler: Handler<Ugx> = Arc::new(move |amount: Ugx| {
            let collected = collected.clone();
            Box::pin(async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                collected.fetch_add(amount.value(), Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new("test", 1, handler);
        let mobile_money = event_handler.subscribe();
        let credits = event_handler.subscribe();
        tokio::spawn(async move {
            for amount in [25_000, 5_000, 1_500] {
                mobile_money.publish_event(Ugx::from(amount)).await;
            }
        });
        tokio::spawn(async move {
            for amount in [100, 400] {
                credits.publish_event(Ugx::from(amount)).await;
            }
        });
        event_handler.start_handler().await;
        assert_eq!(c2.load(Ordering::SeqCst), 32_000);
    }
}
