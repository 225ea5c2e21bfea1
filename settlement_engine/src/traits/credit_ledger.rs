use settlement_common::Credits;

use crate::{db_types::CreditTransaction, traits::SettlementError};

/// The only way to change a buyer's credit balance. Every change is journalled.
#[allow(async_fn_in_trait)]
pub trait CreditLedger {
    /// The buyer's current balance. Buyers without an account have a balance of zero.
    async fn credit_balance(&self, buyer_id: i64) -> Result<Credits, SettlementError>;

    /// Removes `amount` credits from the buyer's balance, returning the new balance.
    ///
    /// The debit is a compare-and-set against the stored balance, so two concurrent debits can never spend the same
    /// credits. Fails with `InsufficientCredits` if the balance is too low.
    async fn debit(
        &self,
        buyer_id: i64,
        amount: Credits,
        reason: &str,
        order_id: Option<i64>,
    ) -> Result<Credits, SettlementError>;

    /// Adds `amount` credits to the buyer's balance, creating the account if needed. Returns the new balance.
    async fn credit(&self, buyer_id: i64, amount: Credits, reason: &str) -> Result<Credits, SettlementError>;

    /// The buyer's credit journal, newest first.
    async fn credit_history(&self, buyer_id: i64) -> Result<Vec<CreditTransaction>, SettlementError>;
}
