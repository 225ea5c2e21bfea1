use log::*;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::SettlementError,
};

/// Inserts a payment record with the given status. A `completed` payment is stamped with `completed_at`.
///
/// The schema allows only one `pending` payment per payable, so supersede the active payment first.
pub async fn insert_payment(
    payment: NewPayment,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Payment, sqlx::Error> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                payable_type,
                payable_id,
                buyer_id,
                method,
                provider,
                status,
                payment_data,
                completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $6 = 'completed' THEN CURRENT_TIMESTAMP ELSE NULL END)
            RETURNING *;
        "#,
    )
    .bind(payment.payable.payable_type())
    .bind(payment.payable.payable_id())
    .bind(payment.buyer_id)
    .bind(payment.method)
    .bind(payment.provider)
    .bind(status)
    .bind(Json(payment.payment_data))
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Payment #{} ({}) recorded for {} as {}", payment.id, payment.method, payment.payable, payment.status);
    Ok(payment)
}

pub async fn fetch_payment(payment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payments_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments =
        sqlx::query_as("SELECT * FROM payments WHERE payable_type = 'order' AND payable_id = $1 ORDER BY id")
            .bind(order_id)
            .fetch_all(conn)
            .await?;
    Ok(payments)
}

/// Fails the active (pending) payment of an order, if there is one.
pub async fn fail_active_for_order(
    order_id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments SET status = 'failed', failure_reason = $1, updated_at = CURRENT_TIMESTAMP
            WHERE payable_type = 'order' AND payable_id = $2 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    if let Some(p) = &payment {
        debug!("🗃️ Payment #{} for order #{order_id} marked as failed ({reason})", p.id);
    }
    Ok(payment)
}

/// Completes a pending payment that settles an order. Returns `None` if the payment is not pending, or does not settle
/// an order.
pub async fn complete_pending_order_payment(
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET status = 'completed', completed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'pending' AND payable_type = 'order'
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Fails a pending payment. Returns `None` if the payment is not pending.
pub async fn fail_pending(
    payment_id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET status = 'failed', failure_reason = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn set_transaction_id(
    payment_id: i64,
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, SettlementError> {
    let payment = sqlx::query_as(
        "UPDATE payments SET transaction_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(transaction_id)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| SettlementError::PaymentNotFound(payment_id.to_string()))?;
    trace!("🗃️ Payment #{payment_id} has gateway transaction id {transaction_id}");
    Ok(payment)
}
