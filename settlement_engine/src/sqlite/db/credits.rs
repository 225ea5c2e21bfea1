//! The credit ledger. Balances live in `credit_accounts`, and every change is journalled in `credit_transactions`.
use log::*;
use settlement_common::Credits;
use sqlx::SqliteConnection;

use crate::{db_types::CreditTransaction, traits::SettlementError};

pub async fn balance(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Credits, sqlx::Error> {
    let balance: Option<Credits> = sqlx::query_scalar("SELECT balance FROM credit_accounts WHERE buyer_id = $1")
        .bind(buyer_id)
        .fetch_optional(conn)
        .await?;
    Ok(balance.unwrap_or_default())
}

/// Compare-and-set debit. The balance is only reduced if it covers `amount` at the moment the statement runs.
pub async fn debit(
    buyer_id: i64,
    amount: Credits,
    reason: &str,
    order_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Credits, SettlementError> {
    if amount.is_negative() {
        return Err(SettlementError::ValidationError(format!("Cannot debit a negative amount ({amount})")));
    }
    if amount.is_zero() {
        return Ok(balance(buyer_id, conn).await?);
    }
    let new_balance: Option<Credits> = sqlx::query_scalar(
        r#"
            UPDATE credit_accounts SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
            WHERE buyer_id = $2 AND balance >= $1
            RETURNING balance;
        "#,
    )
    .bind(amount)
    .bind(buyer_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(new_balance) = new_balance else {
        let available = balance(buyer_id, conn).await?;
        debug!("💰️ Buyer #{buyer_id} cannot cover a debit of {amount}. Balance is {available}");
        return Err(SettlementError::InsufficientCredits { buyer_id, required: amount, available });
    };
    journal(buyer_id, -amount, new_balance, reason, order_id, conn).await?;
    debug!("💰️ Debited {amount} from buyer #{buyer_id} ({reason}). New balance: {new_balance}");
    Ok(new_balance)
}

/// Adds credits to a buyer's balance, opening the account if it does not exist yet.
pub async fn credit(
    buyer_id: i64,
    amount: Credits,
    reason: &str,
    order_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Credits, SettlementError> {
    if !amount.is_positive() {
        return Err(SettlementError::ValidationError(format!("Credit amounts must be positive, not {amount}")));
    }
    let new_balance: Credits = sqlx::query_scalar(
        r#"
            INSERT INTO credit_accounts (buyer_id, balance) VALUES ($1, $2)
            ON CONFLICT (buyer_id) DO UPDATE SET
                balance = balance + excluded.balance,
                updated_at = CURRENT_TIMESTAMP
            RETURNING balance;
        "#,
    )
    .bind(buyer_id)
    .bind(amount)
    .fetch_one(&mut *conn)
    .await?;
    journal(buyer_id, amount, new_balance, reason, order_id, conn).await?;
    debug!("💰️ Credited {amount} to buyer #{buyer_id} ({reason}). New balance: {new_balance}");
    Ok(new_balance)
}

async fn journal(
    buyer_id: i64,
    amount: Credits,
    balance_after: Credits,
    reason: &str,
    order_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO credit_transactions (buyer_id, amount, balance_after, reason, order_id)
            VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(buyer_id)
    .bind(amount)
    .bind(balance_after)
    .bind(reason)
    .bind(order_id)
    .execute(conn)
    .await?;
    trace!("🗃️ Credit journal entry for buyer #{buyer_id}: {amount}");
    Ok(())
}

pub async fn history(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CreditTransaction>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM credit_transactions WHERE buyer_id = $1 ORDER BY id DESC")
        .bind(buyer_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
