use settlement_common::{Credits, Ugx};
use settlement_engine::{
    db_types::{NewProduct, NewStore, Product, Store, StoreTier},
    CatalogManagement,
    CreditLedger,
    SqliteDatabase,
};

pub const BUYER: i64 = 7;
pub const OTHER_BUYER: i64 = 8;
pub const PHONE: &str = "0772123456";

pub async fn store(db: &SqliteDatabase) -> Store {
    store_with_tier(db, StoreTier::Premium).await
}

pub async fn store_with_tier(db: &SqliteDatabase, tier: StoreTier) -> Store {
    let store = NewStore::new(1, "Kampala Crafts").with_fee_bps(500).with_tier(tier);
    db.insert_store(store).await.expect("Error inserting store")
}

pub async fn product(db: &SqliteDatabase, store_id: i64, price_ugx: i64, quantity: i64) -> Product {
    let product = NewProduct::new(store_id, format!("Basket {price_ugx}"), Ugx::from(price_ugx)).with_quantity(quantity);
    db.insert_product(product).await.expect("Error inserting product")
}

pub async fn dual_priced_product(
    db: &SqliteDatabase,
    store_id: i64,
    price_ugx: i64,
    price_credits: i64,
    quantity: i64,
) -> Product {
    let product = NewProduct::new(store_id, format!("Mat {price_ugx}"), Ugx::from(price_ugx))
        .with_credit_price(Credits::from(price_credits))
        .with_quantity(quantity);
    db.insert_product(product).await.expect("Error inserting product")
}

pub async fn fund(db: &SqliteDatabase, buyer_id: i64, credits: i64) {
    db.credit(buyer_id, Credits::from(credits), "Welcome bonus").await.expect("Error funding buyer");
}
