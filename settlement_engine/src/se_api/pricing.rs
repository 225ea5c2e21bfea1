//! # Pricing & totals
//!
//! [`calculate_totals`] turns a set of priced order lines into the dual-currency [`OrderTotals`] breakdown. It is pure,
//! so the order transaction can call it on the product rows it has just reserved, and [`PricingApi`] can call it to
//! quote a basket without touching stock.
use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};
use settlement_common::{Credits, Ugx};

use crate::{
    db_types::{NewOrderItem, OrderTotals, Product, Store},
    se_api::{order_objects::LineItem, policy::PricingPolicy},
    traits::{CatalogManagement, SettlementError},
};

/// Per-order pricing inputs. Anything left as `None` falls back to the [`PricingPolicy`] (shipping) or zero
/// (discounts).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingContext {
    pub store_id: Option<i64>,
    pub shipping_ugx: Option<Ugx>,
    pub shipping_credits: Option<Credits>,
    /// A precomputed discount. No promotion rules are evaluated here.
    pub discount_ugx: Option<Ugx>,
    pub discount_credits: Option<Credits>,
}

impl PricingContext {
    pub fn for_store(store_id: i64) -> Self {
        Self { store_id: Some(store_id), ..Default::default() }
    }

    pub fn with_shipping(mut self, ugx: Ugx, credits: Credits) -> Self {
        self.shipping_ugx = Some(ugx);
        self.shipping_credits = Some(credits);
        self
    }

    pub fn with_discount(mut self, ugx: Ugx, credits: Credits) -> Self {
        self.discount_ugx = Some(ugx);
        self.discount_credits = Some(credits);
        self
    }

    /// Shipping and discounts may not be negative.
    pub fn validate(&self) -> Result<(), SettlementError> {
        let negative_ugx = [self.shipping_ugx, self.discount_ugx].into_iter().flatten().any(|v| v.is_negative());
        let negative_credits =
            [self.shipping_credits, self.discount_credits].into_iter().flatten().any(|v| v.is_negative());
        if negative_ugx || negative_credits {
            return Err(SettlementError::ValidationError("Shipping and discount amounts cannot be negative".into()));
        }
        Ok(())
    }
}

/// Determines which store an order belongs to. All lines must come from the same store, and if a store was requested,
/// it must be that one.
pub fn resolve_store_id<'a, I>(requested: Option<i64>, products: I) -> Result<i64, SettlementError>
where I: IntoIterator<Item = &'a Product> {
    let mut store_id = requested;
    for product in products {
        match store_id {
            None => store_id = Some(product.store_id),
            Some(id) if id == product.store_id => {},
            Some(id) => {
                return Err(SettlementError::ValidationError(format!(
                    "Product {} belongs to store {}, but the order is for store {id}. Orders cannot span stores.",
                    product.id, product.store_id
                )))
            },
        }
    }
    store_id.ok_or_else(|| SettlementError::ValidationError("Cannot determine the store for an empty order".into()))
}

/// Products must be sellable before they can be priced into an order.
pub fn ensure_sellable(product: &Product) -> Result<(), SettlementError> {
    if product.is_archived() {
        return Err(SettlementError::ValidationError(format!(
            "Product {} ({}) has been archived and cannot be ordered",
            product.id, product.name
        )));
    }
    Ok(())
}

pub fn ensure_positive_quantity(product_id: i64, quantity: i64) -> Result<(), SettlementError> {
    if quantity <= 0 {
        return Err(SettlementError::ValidationError(format!(
            "Quantity for product {product_id} must be positive, but was {quantity}"
        )));
    }
    Ok(())
}

/// Computes the dual-currency breakdown for the given lines.
///
/// `total_X = subtotal_X + shipping_X + tax_X - discount_X`. The platform fee is the store's basis-point share of the
/// UGX subtotal, rounded down. There is no credits fee.
///
/// A discount may not exceed `subtotal_X + shipping_X + tax_X` in its currency, so totals are never negative.
pub fn calculate_totals(
    lines: &[NewOrderItem],
    store: &Store,
    context: &PricingContext,
    policy: &PricingPolicy,
) -> Result<OrderTotals, SettlementError> {
    context.validate()?;
    for line in lines {
        ensure_positive_quantity(line.product_id, line.quantity)?;
    }
    let subtotal_ugx =
        lines.iter().fold(Ugx::zero(), |acc, l| acc.saturating_add(l.unit_price_ugx.saturating_mul(l.quantity)));
    let subtotal_credits = lines.iter().fold(Credits::zero(), |acc, l| {
        let line_credits = l.unit_price_credits.map(|p| p.saturating_mul(l.quantity)).unwrap_or_default();
        acc.saturating_add(line_credits)
    });
    let shipping_ugx = context.shipping_ugx.unwrap_or(policy.default_shipping_ugx);
    let shipping_credits = context.shipping_credits.unwrap_or(policy.default_shipping_credits);
    let discount_ugx = context.discount_ugx.unwrap_or_default();
    let discount_credits = context.discount_credits.unwrap_or_default();
    let tax_ugx = policy.tax_ugx(subtotal_ugx);
    let tax_credits = policy.tax_credits(subtotal_credits);
    let gross_ugx = subtotal_ugx.saturating_add(shipping_ugx).saturating_add(tax_ugx);
    let gross_credits = subtotal_credits.saturating_add(shipping_credits).saturating_add(tax_credits);
    if discount_ugx > gross_ugx {
        return Err(SettlementError::ValidationError(format!(
            "The UGX discount of {discount_ugx} exceeds the UGX value of the order ({gross_ugx})"
        )));
    }
    if discount_credits > gross_credits {
        return Err(SettlementError::ValidationError(format!(
            "The credits discount of {discount_credits} exceeds the credits value of the order ({gross_credits})"
        )));
    }
    let total_ugx = gross_ugx - discount_ugx;
    let total_credits = gross_credits - discount_credits;
    Ok(OrderTotals {
        subtotal_ugx,
        tax_ugx,
        shipping_ugx,
        discount_ugx,
        platform_fee_ugx: store.platform_fee(subtotal_ugx),
        total_ugx,
        subtotal_credits,
        tax_credits,
        shipping_credits,
        discount_credits,
        platform_fee_credits: Credits::zero(),
        total_credits,
    })
}

/// Quotes baskets against the live catalog without reserving any stock.
pub struct PricingApi<B> {
    db: B,
    policy: PricingPolicy,
}

impl<B> Debug for PricingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PricingApi ({:?})", self.policy)
    }
}

impl<B> PricingApi<B>
where B: CatalogManagement
{
    pub fn new(db: B, policy: PricingPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Prices the given lines at current catalog prices.
    pub async fn quote(&self, items: &[LineItem], context: &PricingContext) -> Result<OrderTotals, SettlementError> {
        if items.is_empty() {
            return Err(SettlementError::EmptyCart);
        }
        context.validate()?;
        let mut lines = Vec::with_capacity(items.len());
        let mut products = Vec::with_capacity(items.len());
        for item in items {
            ensure_positive_quantity(item.product_id, item.quantity)?;
            let product = self
                .db
                .fetch_product(item.product_id)
                .await?
                .ok_or(SettlementError::ProductNotFound(item.product_id))?;
            ensure_sellable(&product)?;
            lines.push(NewOrderItem::snapshot(&product, item.quantity, item.options.clone()));
            products.push(product);
        }
        let store_id = resolve_store_id(context.store_id, &products)?;
        let store = self.db.fetch_store(store_id).await?.ok_or(SettlementError::StoreNotFound(store_id))?;
        let totals = calculate_totals(&lines, &store, context, &self.policy)?;
        trace!("💰️ Quoted {} lines for store #{store_id}: {} / {}", lines.len(), totals.total_ugx, totals.total_credits);
        Ok(totals)
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;
    use crate::db_types::{ItemOptions, StoreTier};

    fn store(fee_bps: i64) -> Store {
        Store { id: 1, owner_id: 1, name: "Kampala Crafts".into(), fee_bps, tier: StoreTier::Basic, created_at: Utc::now() }
    }

    fn line(product_id: i64, price: i64, credits: Option<i64>, quantity: i64) -> NewOrderItem {
        NewOrderItem {
            product_id,
            product_name: format!("Product {product_id}"),
            product_description: None,
            unit_price_ugx: Ugx::from(price),
            unit_price_credits: credits.map(Credits::from),
            quantity,
            options: ItemOptions::new(),
        }
    }

    #[test]
    fn default_shipping_is_applied() {
        let policy = PricingPolicy::default();
        let totals = calculate_totals(&[line(1, 10_000, None, 2)], &store(0), &PricingContext::default(), &policy).unwrap();
        assert_eq!(totals.subtotal_ugx, Ugx::from(20_000));
        assert_eq!(totals.shipping_ugx, Ugx::from(5_000));
        assert_eq!(totals.total_ugx, Ugx::from(25_000));
        assert_eq!(totals.subtotal_credits, Credits::zero());
        assert_eq!(totals.total_credits, Credits::zero());
        assert_eq!(totals.tax_ugx, Ugx::zero());
    }

    #[test]
    fn mixed_credit_prices() {
        let policy = PricingPolicy::default();
        let lines = [line(1, 1_000, Some(50), 3), line(2, 2_500, None, 1)];
        let ctx = PricingContext::for_store(1).with_shipping(Ugx::from(1_000), Credits::from(10));
        let totals = calculate_totals(&lines, &store(0), &ctx, &policy).unwrap();
        assert_eq!(totals.subtotal_ugx, Ugx::from(5_500));
        assert_eq!(totals.subtotal_credits, Credits::from(150));
        assert_eq!(totals.total_ugx, Ugx::from(6_500));
        assert_eq!(totals.total_credits, Credits::from(160));
    }

    #[test]
    fn platform_fee_rounds_down() {
        let policy = PricingPolicy::default();
        // 2.5% of 9_999 is 249.975
        let totals = calculate_totals(&[line(1, 9_999, None, 1)], &store(250), &PricingContext::default(), &policy).unwrap();
        assert_eq!(totals.platform_fee_ugx, Ugx::from(249));
        assert_eq!(totals.platform_fee_credits, Credits::zero());
        // the fee is not charged to the buyer
        assert_eq!(totals.total_ugx, Ugx::from(9_999 + 5_000));
    }

    #[test]
    fn discounts_reduce_the_total() {
        let policy = PricingPolicy::default();
        let ctx = PricingContext::default().with_discount(Ugx::from(2_000), Credits::from(5));
        let totals = calculate_totals(&[line(1, 10_000, Some(100), 1)], &store(0), &ctx, &policy).unwrap();
        assert_eq!(totals.total_ugx, Ugx::from(13_000));
        assert_eq!(totals.total_credits, Credits::from(95));
    }

    #[test]
    fn invalid_inputs() {
        let policy = PricingPolicy::default();
        let err = calculate_totals(&[line(1, 1_000, None, 0)], &store(0), &PricingContext::default(), &policy);
        assert!(matches!(err, Err(SettlementError::ValidationError(_))));
        let ctx = PricingContext::default().with_shipping(Ugx::from(-1), Credits::zero());
        let err = calculate_totals(&[line(1, 1_000, None, 1)], &store(0), &ctx, &policy);
        assert!(matches!(err, Err(SettlementError::ValidationError(_))));
        let ctx = PricingContext::default().with_discount(Ugx::zero(), Credits::from(-3));
        let err = calculate_totals(&[line(1, 1_000, None, 1)], &store(0), &ctx, &policy);
        assert!(matches!(err, Err(SettlementError::ValidationError(_))));
    }

    #[test]
    fn discounts_cannot_exceed_the_order_value() {
        let policy = PricingPolicy::default();
        let lines = [line(1, 10_000, Some(100), 1)];
        // Shipping counts towards the value that can be discounted
        let ctx = PricingContext::default().with_discount(Ugx::from(15_000), Credits::from(100));
        let totals = calculate_totals(&lines, &store(0), &ctx, &policy).unwrap();
        assert_eq!(totals.total_ugx, Ugx::zero());
        assert_eq!(totals.total_credits, Credits::zero());

        let ctx = PricingContext::default().with_discount(Ugx::from(15_001), Credits::zero());
        let err = calculate_totals(&lines, &store(0), &ctx, &policy).unwrap_err();
        assert!(matches!(err, SettlementError::ValidationError(msg) if msg.contains("UGX")));
        let ctx = PricingContext::default().with_discount(Ugx::zero(), Credits::from(101));
        let err = calculate_totals(&lines, &store(0), &ctx, &policy).unwrap_err();
        assert!(matches!(err, SettlementError::ValidationError(msg) if msg.contains("credits")));
    }

    proptest! {
        #[test]
        fn totals_balance(
            prices in proptest::collection::vec((1i64..1_000_000, proptest::option::of(0i64..10_000), 1i64..100), 1..10),
            shipping in proptest::option::of(0i64..100_000),
            discount in 0i64..50_000,
            fee_bps in 0i64..2_000,
        ) {
            let policy = PricingPolicy::default();
            let lines = prices
                .iter()
                .enumerate()
                .map(|(i, (p, c, q))| line(i as i64 + 1, *p, *c, *q))
                .collect::<Vec<_>>();
            let expected_subtotal: i64 = prices.iter().map(|(p, _, q)| p * q).sum();
            let discount = discount.min(expected_subtotal);
            let mut ctx = PricingContext::default().with_discount(Ugx::from(discount), Credits::zero());
            ctx.shipping_ugx = shipping.map(Ugx::from);
            let totals = calculate_totals(&lines, &store(fee_bps), &ctx, &policy).unwrap();
            prop_assert!(!totals.total_ugx.is_negative());
            prop_assert_eq!(
                totals.total_ugx,
                totals.subtotal_ugx + totals.shipping_ugx + totals.tax_ugx - totals.discount_ugx
            );
            prop_assert_eq!(
                totals.total_credits,
                totals.subtotal_credits + totals.shipping_credits + totals.tax_credits - totals.discount_credits
            );
            prop_assert_eq!(totals.subtotal_ugx, Ugx::from(expected_subtotal));
            prop_assert_eq!(totals.platform_fee_ugx, Ugx::from(expected_subtotal * fee_bps / 10_000));
        }
    }
}
