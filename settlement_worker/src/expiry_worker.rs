use std::time::Duration as StdDuration;

use chrono::Duration;
use log::*;
use settlement_engine::{db_types::Order, OfflineGateway, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

pub type ExpiryApi = OrderFlowApi<SqliteDatabase, OfflineGateway>;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(api: ExpiryApi, interval: StdDuration, unpaid_expiry: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Unpaid order expiry worker started. Orders expire after {} hrs", unpaid_expiry.num_hours());
        loop {
            timer.tick().await;
            run_expiry_job(&api, unpaid_expiry).await;
        }
    })
}

/// Runs one pass of the expiry job and returns the number of orders that were cancelled. Errors are logged, since the
/// next tick will try again.
pub async fn run_expiry_job(api: &ExpiryApi, unpaid_expiry: Duration) -> usize {
    trace!("🕰️ Running unpaid order expiry job");
    match api.expire_stalled_orders(unpaid_expiry).await {
        Ok(expired) => {
            if !expired.is_empty() {
                info!("🕰️ {} orders expired", expired.len());
                debug!("🕰️ Expired unpaid orders: {}", order_list(&expired));
            }
            expired.len()
        },
        Err(e) => {
            error!("🕰️ Error running unpaid order expiry job: {e}");
            0
        },
    }
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] {} buyer: {}", o.id, o.order_number, o.buyer_id))
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod test {
    use settlement_common::Ugx;
    use settlement_engine::{
        db_types::{NewProduct, NewStore, OrderStatusType},
        events::EventProducers,
        order_objects::{LineItem, NewOrder},
        CatalogManagement,
        OrderManagement,
        PricingPolicy,
    };

    use super::*;

    #[tokio::test]
    async fn expiry_job_cancels_unpaid_orders() {
        let dir = tempfile::tempdir().expect("Error creating temp dir");
        let url = format!("sqlite://{}/worker.db", dir.path().display());
        let db = SqliteDatabase::new_with_url(&url, 2).await.expect("Error opening database");
        db.migrate().await.expect("Error running migrations");
        let store = db.insert_store(NewStore::new(1, "Jinja Weavers")).await.unwrap();
        let product =
            db.insert_product(NewProduct::new(store.id, "Sisal basket", Ugx::from(15_000)).with_quantity(2)).await.unwrap();
        let api = OrderFlowApi::new(db.clone(), OfflineGateway, PricingPolicy::default(), EventProducers::default());
        let placed = api.create_order(NewOrder::from_items(3, vec![LineItem::new(product.id, 2)])).await.unwrap();

        assert_eq!(run_expiry_job(&api, Duration::hours(1)).await, 0);
        assert_eq!(run_expiry_job(&api, Duration::zero()).await, 1);
        let order = db.fetch_order(placed.order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatusType::Cancelled);
        let product = db.fetch_product(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 2);
        assert_eq!(run_expiry_job(&api, Duration::zero()).await, 0);
    }
}
