use log::trace;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{NewOrderItem, OrderItem};

/// Snapshots a line into the order. Line totals equal line subtotals; order-level shipping, tax and discounts are not
/// apportioned to lines.
pub async fn insert_item(
    order_id: i64,
    item: NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let subtotal_ugx = item.subtotal_ugx();
    let subtotal_credits = item.subtotal_credits();
    let item: OrderItem = sqlx::query_as(
        r#"
            INSERT INTO order_items (
                order_id,
                product_id,
                product_name,
                product_description,
                unit_price_ugx,
                unit_price_credits,
                quantity,
                subtotal_ugx,
                subtotal_credits,
                total_ugx,
                total_credits,
                options
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.product_name)
    .bind(item.product_description)
    .bind(item.unit_price_ugx)
    .bind(item.unit_price_credits)
    .bind(item.quantity)
    .bind(subtotal_ugx)
    .bind(subtotal_credits)
    .bind(subtotal_ugx)
    .bind(subtotal_credits)
    .bind(Json(item.options))
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Item #{} ({} x {}) added to order #{order_id}", item.id, item.quantity, item.product_name);
    Ok(item)
}

pub async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await?;
    Ok(items)
}
