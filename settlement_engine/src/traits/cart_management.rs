use serde::{Deserialize, Serialize};
use settlement_common::Ugx;

use crate::{
    db_types::{Cart, CartOwner, ItemOptions},
    traits::SettlementError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub item_key: String,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_ugx: Ugx,
    pub options: ItemOptions,
}

/// Persistence for shopping carts. Validation against the catalog happens in the cart API.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// The owner's cart. A cart that has never been created is returned empty.
    async fn fetch_cart(&self, owner: &CartOwner) -> Result<Cart, SettlementError>;

    /// Adds an item to the owner's cart, creating the cart if needed. If the item key is already in the cart, the
    /// quantities are added together and the unit price is refreshed.
    async fn add_cart_item(&self, owner: &CartOwner, item: NewCartItem) -> Result<Cart, SettlementError>;

    /// Sets the quantity of an existing cart item.
    async fn set_cart_item_quantity(&self, owner: &CartOwner, item_key: &str, quantity: i64)
        -> Result<Cart, SettlementError>;

    /// Removes an item. Removing an item that is not in the cart is not an error.
    async fn remove_cart_item(&self, owner: &CartOwner, item_key: &str) -> Result<Cart, SettlementError>;

    /// Destroys the owner's cart.
    async fn clear_cart(&self, owner: &CartOwner) -> Result<(), SettlementError>;

    /// Moves every item of the `from` cart into the `into` cart, summing quantities per item key, and destroys the
    /// `from` cart.
    async fn merge_carts(&self, from: &CartOwner, into: &CartOwner) -> Result<Cart, SettlementError>;
}
