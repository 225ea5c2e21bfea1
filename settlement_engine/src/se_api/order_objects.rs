use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{CartOwner, ItemOptions, Order, OrderItem, OrderStatusType, Payment, PaymentMethod},
    se_api::pricing::PricingContext,
};

/// A single requested line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub options: ItemOptions,
}

impl LineItem {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self { product_id, quantity, options: ItemOptions::new() }
    }

    pub fn with_option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Where the lines of a new order come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSource {
    /// The persisted cart of the given owner. The cart is consumed by the order.
    Cart(CartOwner),
    Items(Vec<LineItem>),
}

/// How the buyer intends to pay at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutPayment {
    /// Settle immediately from the buyer's credit balance.
    Credits,
    /// Collect `total_ugx` via the mobile-money gateway once the order is committed.
    MobileMoney { provider: String, phone_number: String },
    /// Leave the order unpaid. Payment happens later via the payment API.
    Deferred,
}

impl CheckoutPayment {
    pub fn method(&self) -> PaymentMethod {
        match self {
            CheckoutPayment::Credits => PaymentMethod::Credits,
            CheckoutPayment::MobileMoney { .. } => PaymentMethod::MobileMoney,
            CheckoutPayment::Deferred => PaymentMethod::Deferred,
        }
    }

    /// Builds the checkout choice from the loosely-typed fields a storefront submits.
    pub fn from_request(method: &str, provider: Option<String>, phone_number: Option<String>) -> Self {
        match method.parse::<PaymentMethod>() {
            Ok(PaymentMethod::Credits) => CheckoutPayment::Credits,
            Ok(PaymentMethod::MobileMoney) => CheckoutPayment::MobileMoney {
                provider: provider.unwrap_or_default(),
                phone_number: phone_number.unwrap_or_default(),
            },
            _ => CheckoutPayment::Deferred,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub source: OrderSource,
    pub pricing: PricingContext,
    pub payment: CheckoutPayment,
    pub notes: Option<String>,
}

impl NewOrder {
    pub fn from_cart(buyer_id: i64, owner: CartOwner) -> Self {
        Self::new(buyer_id, OrderSource::Cart(owner))
    }

    pub fn from_items(buyer_id: i64, items: Vec<LineItem>) -> Self {
        Self::new(buyer_id, OrderSource::Items(items))
    }

    fn new(buyer_id: i64, source: OrderSource) -> Self {
        Self { buyer_id, source, pricing: PricingContext::default(), payment: CheckoutPayment::Deferred, notes: None }
    }

    pub fn with_pricing(mut self, pricing: PricingContext) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_payment(mut self, payment: CheckoutPayment) -> Self {
        self.payment = payment;
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The result of committing a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// The payment recorded at checkout, if any
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub buyer_id: Option<i64>,
    pub store_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_buyer_id(mut self, buyer_id: i64) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn with_store_id(mut self, store_id: i64) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buyer_id.is_none() &&
            self.store_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checkout_payment_from_request() {
        let p = CheckoutPayment::from_request("credit", None, None);
        assert_eq!(p, CheckoutPayment::Credits);
        let p = CheckoutPayment::from_request("credits", None, None);
        assert_eq!(p.method(), PaymentMethod::Credits);
        let p = CheckoutPayment::from_request("mobile_money", Some("mtn".into()), Some("0772000000".into()));
        assert_eq!(p, CheckoutPayment::MobileMoney { provider: "mtn".into(), phone_number: "0772000000".into() });
        let p = CheckoutPayment::from_request("cash_on_delivery", None, None);
        assert_eq!(p, CheckoutPayment::Deferred);
        let p = CheckoutPayment::from_request("", None, None);
        assert_eq!(p, CheckoutPayment::Deferred);
    }

    #[test]
    fn empty_filter() {
        assert!(OrderQueryFilter::default().is_empty());
        assert!(!OrderQueryFilter::default().with_buyer_id(4).is_empty());
        assert!(!OrderQueryFilter::default().with_status(OrderStatusType::Pending).is_empty());
    }
}
