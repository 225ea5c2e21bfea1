use blake2::{digest::consts::U16, Blake2b, Digest};

use crate::db_types::ItemOptions;

type Blake2b128 = Blake2b<U16>;

/// The synthetic key of a cart line. The same product with different options gets a different key.
///
/// Without options the key is just the product id. Otherwise it is `{product_id}-{hash}`, where the hash is a
/// Blake2b digest over the options in key order, so the key does not depend on the order options were selected in.
pub fn cart_item_key(product_id: i64, options: &ItemOptions) -> String {
    if options.is_empty() {
        return product_id.to_string();
    }
    let mut hasher = Blake2b128::new();
    for (name, value) in options {
        hasher.update((name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update((value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    format!("{product_id}-{:x}", hasher.finalize())
}
