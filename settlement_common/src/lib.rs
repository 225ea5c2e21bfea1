mod money;

pub mod helpers;
pub mod op;

pub use money::{Credits, MoneyConversionError, Ugx, CREDITS_CODE, UGX_CURRENCY_CODE};
