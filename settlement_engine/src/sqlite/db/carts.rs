use log::*;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{Cart, CartItem, CartOwner},
    traits::NewCartItem,
};

/// Returns the id of the owner's cart, creating the cart if it does not exist yet.
pub async fn fetch_or_create_cart(owner: &CartOwner, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO carts (owner_type, owner_key) VALUES ($1, $2)
            ON CONFLICT (owner_type, owner_key) DO UPDATE SET updated_at = CURRENT_TIMESTAMP
            RETURNING id;
        "#,
    )
    .bind(owner.owner_type())
    .bind(owner.owner_key())
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_cart(owner: &CartOwner, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    let items: Vec<CartItem> = sqlx::query_as(
        r#"
            SELECT cart_items.* FROM cart_items
            JOIN carts ON carts.id = cart_items.cart_id
            WHERE carts.owner_type = $1 AND carts.owner_key = $2
            ORDER BY cart_items.added_at, cart_items.item_key;
        "#,
    )
    .bind(owner.owner_type())
    .bind(owner.owner_key())
    .fetch_all(conn)
    .await?;
    Ok(Cart { owner: owner.clone(), items })
}

/// Adds the item to the cart. An existing line with the same key has the quantities summed.
pub async fn upsert_item(cart_id: i64, item: NewCartItem, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (cart_id, item_key, product_id, quantity, unit_price_ugx, options)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (cart_id, item_key) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                unit_price_ugx = excluded.unit_price_ugx;
        "#,
    )
    .bind(cart_id)
    .bind(&item.item_key)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_ugx)
    .bind(Json(item.options))
    .execute(conn)
    .await?;
    trace!("🛒️ {} x [{}] added to cart #{cart_id}", item.quantity, item.item_key);
    Ok(())
}

/// Returns the number of lines changed (0 if the item is not in the cart).
pub async fn set_item_quantity(
    owner: &CartOwner,
    item_key: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE cart_items SET quantity = $1
            WHERE item_key = $2 AND cart_id = (SELECT id FROM carts WHERE owner_type = $3 AND owner_key = $4);
        "#,
    )
    .bind(quantity)
    .bind(item_key)
    .bind(owner.owner_type())
    .bind(owner.owner_key())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn remove_item(owner: &CartOwner, item_key: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            DELETE FROM cart_items
            WHERE item_key = $1 AND cart_id = (SELECT id FROM carts WHERE owner_type = $2 AND owner_key = $3);
        "#,
    )
    .bind(item_key)
    .bind(owner.owner_type())
    .bind(owner.owner_key())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Removes every item from the owner's cart and returns them. The cart row itself is left in place.
///
/// This is a write, so calling it first in a transaction takes the database write lock before anything is read.
pub async fn take_items(owner: &CartOwner, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let mut items: Vec<CartItem> = sqlx::query_as(
        r#"
            DELETE FROM cart_items
            WHERE cart_id = (SELECT id FROM carts WHERE owner_type = $1 AND owner_key = $2)
            RETURNING *;
        "#,
    )
    .bind(owner.owner_type())
    .bind(owner.owner_key())
    .fetch_all(conn)
    .await?;
    items.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.item_key.cmp(&b.item_key)));
    trace!("🛒️ {} items taken from the cart of {owner}", items.len());
    Ok(items)
}

/// Destroys the owner's cart and everything in it. Returns false if there was no cart.
pub async fn delete_cart(owner: &CartOwner, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM carts WHERE owner_type = $1 AND owner_key = $2")
        .bind(owner.owner_type())
        .bind(owner.owner_key())
        .execute(conn)
        .await?;
    let deleted = result.rows_affected() > 0;
    if deleted {
        debug!("🛒️ Cart of {owner} destroyed");
    }
    Ok(deleted)
}
