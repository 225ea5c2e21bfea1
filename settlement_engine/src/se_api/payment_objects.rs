use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment, PaymentMethod};

/// A request to (re)start payment for a pending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Whether the buyer wants to apply their credit balance
    pub use_credits: bool,
    pub method: PaymentMethod,
    pub provider: Option<String>,
    pub phone_number: Option<String>,
}

impl PaymentRequest {
    /// Pay the remainder by mobile money, applying credits first if `use_credits` is set.
    pub fn mobile_money<S: Into<String>, P: Into<String>>(use_credits: bool, provider: S, phone_number: P) -> Self {
        Self {
            use_credits,
            method: PaymentMethod::MobileMoney,
            provider: Some(provider.into()),
            phone_number: Some(phone_number.into()),
        }
    }

    /// Apply credits and settle the remainder out of band.
    pub fn deferred(use_credits: bool) -> Self {
        Self { use_credits, method: PaymentMethod::Deferred, provider: None, phone_number: None }
    }

    pub fn credits() -> Self {
        Self { use_credits: true, method: PaymentMethod::Credits, provider: None, phone_number: None }
    }
}

/// The outcome of a payment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub order: Order,
    pub payment: Payment,
}
