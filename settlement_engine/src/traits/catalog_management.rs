use crate::{
    db_types::{NewProduct, NewStore, Product, Store},
    traits::SettlementError,
};

/// Store and product records, as far as the settlement engine needs them.
///
/// Full catalog editing belongs to the storefront. These methods exist so that stores and products can be registered
/// and looked up when pricing and reserving orders.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn insert_store(&self, store: NewStore) -> Result<Store, SettlementError>;

    async fn fetch_store(&self, store_id: i64) -> Result<Option<Store>, SettlementError>;

    /// Registers a new product for a store.
    ///
    /// ## Failure modes:
    /// * `StoreNotFound` if the store does not exist.
    /// * `ValidationError` if the store's tier does not allow any more products, or the price is negative.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, SettlementError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, SettlementError>;

    /// All the products of a store that have not been archived
    async fn fetch_products_for_store(&self, store_id: i64) -> Result<Vec<Product>, SettlementError>;

    /// Withdraws a product from sale. Existing orders are unaffected.
    async fn archive_product(&self, product_id: i64) -> Result<Product, SettlementError>;
}
