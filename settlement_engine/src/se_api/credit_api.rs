use std::fmt::Debug;

use log::*;
use settlement_common::Credits;

use crate::{
    db_types::CreditTransaction,
    traits::{CreditLedger, SettlementError},
};

/// Read access to credit balances, plus top-ups. Spending happens through the payment flows.
pub struct CreditApi<B> {
    db: B,
}

impl<B> Debug for CreditApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CreditApi")
    }
}

impl<B> CreditApi<B>
where B: CreditLedger
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn balance(&self, buyer_id: i64) -> Result<Credits, SettlementError> {
        self.db.credit_balance(buyer_id).await
    }

    /// Adds credits to the buyer's balance and returns the new balance.
    pub async fn top_up(&self, buyer_id: i64, amount: Credits, reason: &str) -> Result<Credits, SettlementError> {
        if !amount.is_positive() {
            return Err(SettlementError::ValidationError(format!("Cannot top up by {amount}")));
        }
        let balance = self.db.credit(buyer_id, amount, reason).await?;
        info!("💰️ Buyer #{buyer_id} topped up by {amount}. New balance: {balance}");
        Ok(balance)
    }

    pub async fn history(&self, buyer_id: i64) -> Result<Vec<CreditTransaction>, SettlementError> {
        self.db.credit_history(buyer_id).await
    }
}
