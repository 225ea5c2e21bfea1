use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cart, CartOwner, ItemOptions},
    helpers::cart_item_key,
    se_api::pricing::{ensure_positive_quantity, ensure_sellable},
    traits::{CartManagement, CatalogManagement, NewCartItem, SettlementError},
};

/// Shopping carts for signed-in buyers and anonymous sessions.
///
/// Carts hold no stock. Quantities are checked against the catalog when items are added, and again (atomically) when
/// the cart is turned into an order.
pub struct CartApi<B> {
    db: B,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B>
where B: CartManagement + CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn cart(&self, owner: &CartOwner) -> Result<Cart, SettlementError> {
        self.db.fetch_cart(owner).await
    }

    /// Adds `quantity` of a product to the cart. The same product with the same options is a single cart line.
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: i64,
        quantity: i64,
        options: ItemOptions,
    ) -> Result<Cart, SettlementError> {
        ensure_positive_quantity(product_id, quantity)?;
        let product = self.db.fetch_product(product_id).await?.ok_or(SettlementError::ProductNotFound(product_id))?;
        ensure_sellable(&product)?;
        let item_key = cart_item_key(product_id, &options);
        let cart = self.db.fetch_cart(owner).await?;
        let in_cart = cart.item(&item_key).map(|i| i.quantity).unwrap_or(0);
        let wanted = in_cart + quantity;
        if !product.can_supply(wanted) {
            return Err(SettlementError::InsufficientStock {
                product_id,
                name: product.name,
                requested: wanted,
                available: product.quantity,
            });
        }
        let item = NewCartItem { item_key, product_id, quantity, unit_price_ugx: product.price_ugx, options };
        let cart = self.db.add_cart_item(owner, item).await?;
        debug!("🛒️ {quantity} x {} added to the cart of {owner}", product.name);
        Ok(cart)
    }

    /// Sets the quantity of a cart line. A quantity of zero (or less) removes the line.
    pub async fn update_quantity(
        &self,
        owner: &CartOwner,
        item_key: &str,
        quantity: i64,
    ) -> Result<Cart, SettlementError> {
        if quantity <= 0 {
            return self.remove_item(owner, item_key).await;
        }
        let cart = self.db.fetch_cart(owner).await?;
        let item = cart
            .item(item_key)
            .ok_or_else(|| SettlementError::ValidationError(format!("[{item_key}] is not in the cart of {owner}")))?;
        let product =
            self.db.fetch_product(item.product_id).await?.ok_or(SettlementError::ProductNotFound(item.product_id))?;
        if !product.can_supply(quantity) {
            return Err(SettlementError::InsufficientStock {
                product_id: product.id,
                name: product.name,
                requested: quantity,
                available: product.quantity,
            });
        }
        self.db.set_cart_item_quantity(owner, item_key, quantity).await
    }

    pub async fn remove_item(&self, owner: &CartOwner, item_key: &str) -> Result<Cart, SettlementError> {
        self.db.remove_cart_item(owner, item_key).await
    }

    pub async fn clear(&self, owner: &CartOwner) -> Result<(), SettlementError> {
        self.db.clear_cart(owner).await
    }

    /// Moves an anonymous session's cart into the buyer's cart, e.g. when the buyer signs in.
    pub async fn merge_session_cart(&self, session_token: &str, buyer_id: i64) -> Result<Cart, SettlementError> {
        let from = CartOwner::Session(session_token.to_string());
        let into = CartOwner::Buyer(buyer_id);
        let cart = self.db.merge_carts(&from, &into).await?;
        debug!("🛒️ Session cart merged into the cart of {into}. It now has {} lines", cart.items.len());
        Ok(cart)
    }
}
