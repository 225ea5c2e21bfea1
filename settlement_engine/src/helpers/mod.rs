mod cart_key;
mod order_number;
mod phone;

pub use cart_key::cart_item_key;
pub use order_number::{is_valid_order_number, new_order_number, ORDER_NUMBER_PREFIX};
pub use phone::{is_valid_ugandan_mobile, normalize_phone};
