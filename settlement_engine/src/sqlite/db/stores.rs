use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewStore, Store},
    traits::SettlementError,
};

pub async fn insert_store(store: NewStore, conn: &mut SqliteConnection) -> Result<Store, SettlementError> {
    if !(0..=10_000).contains(&store.fee_bps) {
        return Err(SettlementError::ValidationError(format!(
            "A platform fee of {} basis points is not valid",
            store.fee_bps
        )));
    }
    let store: Store =
        sqlx::query_as("INSERT INTO stores (owner_id, name, fee_bps, tier) VALUES ($1, $2, $3, $4) RETURNING *")
            .bind(store.owner_id)
            .bind(store.name)
            .bind(store.fee_bps)
            .bind(store.tier)
            .fetch_one(conn)
            .await?;
    debug!("🗃️ Store #{} ({}) created on the {:?} tier", store.id, store.name, store.tier);
    Ok(store)
}

pub async fn fetch_store(store_id: i64, conn: &mut SqliteConnection) -> Result<Option<Store>, sqlx::Error> {
    let store = sqlx::query_as("SELECT * FROM stores WHERE id = $1").bind(store_id).fetch_optional(conn).await?;
    Ok(store)
}
