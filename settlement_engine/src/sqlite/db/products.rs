//! Product rows and the inventory ledger.
//!
//! Stock changes are single conditional `UPDATE` statements, so they serialize on the row and can never take tracked
//! stock below zero, whichever transaction they run in.
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product},
    traits::SettlementError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, SettlementError> {
    let status = product.initial_status();
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (
                store_id,
                name,
                description,
                price_ugx,
                price_credits,
                track_inventory,
                allow_backorder,
                quantity,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(product.store_id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.price_ugx)
    .bind(product.price_credits)
    .bind(product.track_inventory)
    .bind(product.allow_backorder)
    .bind(product.quantity)
    .bind(status)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product #{} ({}) registered for store #{}", product.id, product.name, product.store_id);
    Ok(product)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn count_products_for_store(store_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE store_id = $1 AND status != 'archived'")
        .bind(store_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn fetch_products_for_store(store_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products WHERE store_id = $1 AND status != 'archived' ORDER BY id")
        .bind(store_id)
        .fetch_all(conn)
        .await?;
    Ok(products)
}

pub async fn archive_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Product, SettlementError> {
    let product = sqlx::query_as(
        "UPDATE products SET status = 'archived', updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SettlementError::ProductNotFound(product_id))?;
    debug!("🗃️ Product #{product_id} archived");
    Ok(product)
}

/// Takes `quantity` units out of stock.
///
/// The row is only updated if the product is sellable and (for tracked, no-backorder products) there is enough stock.
/// If nothing was updated, the product is re-read to report why.
pub async fn reserve(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<Product, SettlementError> {
    if quantity <= 0 {
        return Err(SettlementError::ValidationError(format!(
            "Cannot reserve {quantity} units of product {product_id}"
        )));
    }
    let updated: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET
                quantity = CASE WHEN track_inventory THEN quantity - $1 ELSE quantity END,
                status = CASE
                    WHEN track_inventory AND NOT allow_backorder AND quantity - $1 <= 0 THEN 'out_of_stock'
                    ELSE status
                END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
              AND status != 'archived'
              AND (NOT track_inventory OR allow_backorder OR quantity >= $1)
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(product) => {
            trace!("📦️ Reserved {quantity} of product #{product_id}. {} left on hand", product.quantity);
            Ok(product)
        },
        None => {
            let product = fetch_product(product_id, conn).await?.ok_or(SettlementError::ProductNotFound(product_id))?;
            if product.is_archived() {
                return Err(SettlementError::ValidationError(format!(
                    "Product {product_id} ({}) has been archived and cannot be ordered",
                    product.name
                )));
            }
            debug!("📦️ Cannot reserve {quantity} of product #{product_id}. Only {} on hand", product.quantity);
            Err(SettlementError::InsufficientStock {
                product_id,
                name: product.name,
                requested: quantity,
                available: product.quantity.max(0),
            })
        },
    }
}

/// Puts `quantity` units back into stock. Untracked products are left as they are.
pub async fn release(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<Product, SettlementError> {
    if quantity <= 0 {
        return Err(SettlementError::ValidationError(format!(
            "Cannot release {quantity} units of product {product_id}"
        )));
    }
    let product: Product = sqlx::query_as(
        r#"
            UPDATE products SET
                quantity = CASE WHEN track_inventory THEN quantity + $1 ELSE quantity END,
                status = CASE
                    WHEN track_inventory AND status = 'out_of_stock' AND quantity + $1 > 0 THEN 'active'
                    ELSE status
                END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SettlementError::ProductNotFound(product_id))?;
    trace!("📦️ Released {quantity} of product #{product_id}. {} on hand", product.quantity);
    Ok(product)
}

/// Sets the stock on hand. The status follows the stock level unless the product is archived.
pub async fn set_quantity(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, SettlementError> {
    let updated: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET
                quantity = $1,
                status = CASE
                    WHEN status = 'archived' THEN status
                    WHEN track_inventory AND NOT allow_backorder AND $1 <= 0 THEN 'out_of_stock'
                    ELSE 'active'
                END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
              AND (NOT track_inventory OR allow_backorder OR $1 >= 0)
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(product) => {
            debug!("📦️ Stock for product #{product_id} set to {quantity}. Status is {}", product.status);
            Ok(product)
        },
        None => match fetch_product(product_id, conn).await? {
            None => Err(SettlementError::ProductNotFound(product_id)),
            Some(_) => Err(SettlementError::ValidationError(format!(
                "Product {product_id} does not allow backorders, so its stock cannot be set to {quantity}"
            ))),
        },
    }
}

