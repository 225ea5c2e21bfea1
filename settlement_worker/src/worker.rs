use log::*;
use settlement_engine::{
    events::{EventHandlers, EventHooks},
    OfflineGateway,
    OrderFlowApi,
    SqliteDatabase,
};

use crate::{config::WorkerConfig, errors::WorkerError, expiry_worker::start_expiry_worker};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_worker(config: WorkerConfig) -> Result<(), WorkerError> {
    config.validate()?;
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| WorkerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await?;
    } else {
        info!("🗃️ SE_RUN_MIGRATIONS is off. Assuming the schema is up to date.");
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, expiry_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = OrderFlowApi::new(db, OfflineGateway, config.pricing, producers);
    let expiry = start_expiry_worker(api, config.expiry_interval, config.unpaid_order_timeout);
    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutdown requested. Stopping the expiry worker.");
    expiry.abort();
    Ok(())
}

/// The worker only cancels orders, so it only listens for cancellations.
fn expiry_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_cancelled(|ev| {
        Box::pin(async move {
            let reason = ev.reason.as_deref().unwrap_or("no reason given");
            info!(
                "📬️ Order {} for buyer #{} was cancelled ({reason}). Its stock is available again.",
                ev.order.order_number, ev.order.buyer_id
            );
        })
    });
    hooks
}
