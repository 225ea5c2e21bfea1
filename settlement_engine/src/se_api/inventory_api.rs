use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, Product},
    traits::{CatalogManagement, InventoryManagement, SettlementError},
};

/// Merchant-facing catalog and stock maintenance.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B>
where B: CatalogManagement + InventoryManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Lists a new product. Fails if the store has reached the product limit of its tier.
    pub async fn add_product(&self, product: NewProduct) -> Result<Product, SettlementError> {
        let product = self.db.insert_product(product).await?;
        info!("📦️ Product #{} ({}) listed in store #{}", product.id, product.name, product.store_id);
        Ok(product)
    }

    pub async fn product(&self, product_id: i64) -> Result<Product, SettlementError> {
        self.db.fetch_product(product_id).await?.ok_or(SettlementError::ProductNotFound(product_id))
    }

    pub async fn products_for_store(&self, store_id: i64) -> Result<Vec<Product>, SettlementError> {
        self.db.fetch_products_for_store(store_id).await
    }

    /// Archived products can no longer be ordered or added to carts. Existing orders are not affected.
    pub async fn archive_product(&self, product_id: i64) -> Result<Product, SettlementError> {
        let product = self.db.archive_product(product_id).await?;
        debug!("📦️ Product #{product_id} archived");
        Ok(product)
    }

    pub async fn reserve(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError> {
        self.db.reserve_stock(product_id, quantity).await
    }

    pub async fn release(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError> {
        self.db.release_stock(product_id, quantity).await
    }

    /// Records a stock count. Only products that allow backorders may be set below zero.
    pub async fn set_stock(&self, product_id: i64, quantity: i64) -> Result<Product, SettlementError> {
        self.db.set_stock(product_id, quantity).await
    }
}
