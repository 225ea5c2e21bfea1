use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use settlement_common::{Credits, Ugx};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Order, OrderStatusType, OrderTotals, PaymentMethod},
    helpers::new_order_number,
    se_api::order_objects::OrderQueryFilter,
    traits::SettlementError,
};

const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

/// The columns of a new order row. Everything else takes its default (`pending` / `pending`, nothing paid).
#[derive(Debug, Clone)]
pub struct NewOrderRecord<'a> {
    pub store_id: i64,
    pub buyer_id: i64,
    pub payment_method: PaymentMethod,
    pub totals: &'a OrderTotals,
    pub mobile_money_provider: Option<&'a str>,
    pub phone_number: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Generates an order number that is not in use yet.
pub async fn unique_order_number(conn: &mut SqliteConnection) -> Result<String, SettlementError> {
    for _ in 0..MAX_ORDER_NUMBER_ATTEMPTS {
        let candidate = new_order_number(Utc::now());
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE order_number = $1")
            .bind(&candidate)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            return Ok(candidate);
        }
        warn!("🗃️ Order number {candidate} is already taken. Trying another.");
    }
    Err(SettlementError::DatabaseError(format!(
        "Could not generate a unique order number after {MAX_ORDER_NUMBER_ATTEMPTS} attempts"
    )))
}

/// Inserts a new order using the given connection. This is not atomic. Embed the call inside a transaction and pass
/// `&mut *tx` as the connection argument.
pub async fn insert_order(record: NewOrderRecord<'_>, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    let order_number = unique_order_number(conn).await?;
    let t = record.totals;
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                store_id,
                buyer_id,
                payment_method,
                subtotal_ugx,
                tax_ugx,
                shipping_ugx,
                discount_ugx,
                platform_fee_ugx,
                total_ugx,
                subtotal_credits,
                tax_credits,
                shipping_credits,
                discount_credits,
                platform_fee_credits,
                total_credits,
                subtotal,
                total,
                mobile_money_provider,
                phone_number,
                notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING *;
        "#,
    )
    .bind(order_number)
    .bind(record.store_id)
    .bind(record.buyer_id)
    .bind(record.payment_method)
    .bind(t.subtotal_ugx)
    .bind(t.tax_ugx)
    .bind(t.shipping_ugx)
    .bind(t.discount_ugx)
    .bind(t.platform_fee_ugx)
    .bind(t.total_ugx)
    .bind(t.subtotal_credits)
    .bind(t.tax_credits)
    .bind(t.shipping_credits)
    .bind(t.discount_credits)
    .bind(t.platform_fee_credits)
    .bind(t.total_credits)
    .bind(t.subtotal_ugx)
    .bind(t.total_ugx)
    .bind(record.mobile_money_provider)
    .bind(record.phone_number)
    .bind(record.notes)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} inserted with id {}", order.order_number, order.id);
    Ok(order)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(buyer_id) = query.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer_id);
    }
    if let Some(store_id) = query.store_id {
        where_clause.push("store_id = ");
        where_clause.push_bind_unseparated(store_id);
    }
    if let Some(since) = query.since {
        where_clause.push("datetime(created_at) >= datetime(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("datetime(created_at) <= datetime(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        let status_clause = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {} orders", orders.len());
    Ok(orders)
}

/// Points the order at its active payment.
pub async fn link_payment(order_id: i64, payment_id: i64, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    let order = sqlx::query_as(
        "UPDATE orders SET payment_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(payment_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SettlementError::OrderNotFound(order_id))?;
    trace!("🗃️ Order #{order_id} now settles through payment #{payment_id}");
    Ok(order)
}

/// Marks an unpaid order as paid and moves it to `processing`. Returns `None` if the order is not awaiting payment.
pub async fn mark_paid(
    order_id: i64,
    paid_ugx: Ugx,
    paid_credits: Credits,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = 'paid',
                status = 'processing',
                paid_ugx = $1,
                paid_credits = $2,
                paid_at = CURRENT_TIMESTAMP,
                gateway_error = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'pending' AND payment_status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(paid_ugx)
    .bind(paid_credits)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn record_transaction_id(
    order_id: i64,
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, SettlementError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET transaction_id = $1, gateway_error = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(transaction_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SettlementError::OrderNotFound(order_id))?;
    Ok(order)
}

pub async fn record_gateway_error(
    order_id: i64,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, SettlementError> {
    let order = sqlx::query_as(
        "UPDATE orders SET gateway_error = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(error)
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SettlementError::OrderNotFound(order_id))?;
    Ok(order)
}

/// Sets the checkout details for a new mobile-money attempt.
pub async fn set_mobile_money_details(
    order_id: i64,
    provider: &str,
    phone_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, SettlementError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_method = 'mobile_money',
                mobile_money_provider = $1,
                phone_number = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(provider)
    .bind(phone_number)
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or(SettlementError::OrderNotFound(order_id))?;
    Ok(order)
}

/// Cancels an order that is still `pending` or `processing`. Returns `None` if the order is in any other state.
pub async fn cancel(order_id: i64, reason: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'cancelled',
                cancel_reason = $1,
                cancelled_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status IN ('pending', 'processing')
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Cancels an order that is still waiting for payment, and marks its payment as failed. Returns `None` if the order
/// has been paid or cancelled in the meantime.
pub async fn expire(order_id: i64, reason: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'cancelled',
                payment_status = 'failed',
                cancel_reason = $1,
                cancelled_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'pending' AND payment_status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Moves an order from `from` to `to`, stamping the timestamp column that belongs to `to`. Returns `None` if the order
/// is not in the `from` state (or, for shipping, has not been paid).
pub async fn advance_status(
    order_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SettlementError> {
    let timestamp_column = match to {
        OrderStatusType::Shipped => "shipped_at",
        OrderStatusType::Delivered => "delivered_at",
        OrderStatusType::Completed => "completed_at",
        other => {
            return Err(SettlementError::InvalidStateTransition(format!(
                "{other} is not a fulfilment status"
            )))
        },
    };
    let paid_clause = if from == OrderStatusType::Processing { " AND payment_status = 'paid'" } else { "" };
    let sql = format!(
        "UPDATE orders SET status = $1, {timestamp_column} = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP WHERE \
         id = $2 AND status = $3{paid_clause} RETURNING *"
    );
    let order = sqlx::query_as(&sql).bind(to).bind(order_id).bind(from).fetch_optional(conn).await?;
    Ok(order)
}

/// The ids of orders still waiting for payment that were created at or before `cutoff`.
pub async fn fetch_stalled_order_ids(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<i64>, sqlx::Error> {
    let ids = sqlx::query_scalar(
        r#"
            SELECT id FROM orders
            WHERE status = 'pending' AND payment_status = 'pending' AND datetime(created_at) <= datetime($1)
            ORDER BY id;
        "#,
    )
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}
