use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment};

/// The orders cancelled by an expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryResult {
    pub expired: Vec<Order>,
}

impl ExpiryResult {
    pub fn new(expired: Vec<Order>) -> Self {
        Self { expired }
    }

    pub fn count(&self) -> usize {
        self.expired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expired.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub order: Order,
    pub payment: Payment,
    /// False if the payment had already been confirmed and nothing changed
    pub newly_confirmed: bool,
}
