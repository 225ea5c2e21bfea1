use crate::{db_types::Product, traits::SettlementError};

/// The inventory ledger. Each call is atomic; stock changes made as part of an order go through the order
/// transaction instead.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Takes `quantity` units out of stock.
    ///
    /// Untracked products are returned unchanged. Tracked products without backorders fail with `InsufficientStock`
    /// rather than going negative, and become `out_of_stock` when they reach zero.
    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError>;

    /// Puts `quantity` units back into stock. An `out_of_stock` product becomes `active` again once stock is positive.
    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError>;

    /// Sets the stock on hand to an absolute value. Archived products keep their status.
    async fn set_stock(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError>;
}
