use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use settlement_common::{Credits, Ugx};
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, Row, Type};
use thiserror::Error;

/// Options selected for a cart line (size, colour, ...). A `BTreeMap` keeps the keys in canonical order.
pub type ItemOptions = BTreeMap<String, String>;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------    ProductStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// The product can be sold.
    Active,
    /// Tracked stock has run out and backorders are not allowed.
    OutOfStock,
    /// The product has been withdrawn from sale by the store.
    Archived,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Active => write!(f, "active"),
            ProductStatus::OutOfStock => write!(f, "out_of_stock"),
            ProductStatus::Archived => write!(f, "archived"),
        }
    }
}

//--------------------------------------       Product       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub store_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_ugx: Ugx,
    /// Products without a credit price contribute nothing to the credits breakdown of an order.
    pub price_credits: Option<Credits>,
    pub track_inventory: bool,
    pub allow_backorder: bool,
    pub quantity: i64,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_archived(&self) -> bool {
        self.status == ProductStatus::Archived
    }

    /// True if stock is tracked and may not go below zero.
    pub fn is_stock_limited(&self) -> bool {
        self.track_inventory && !self.allow_backorder
    }

    /// Whether `quantity` units could be reserved right now.
    pub fn can_supply(&self, quantity: i64) -> bool {
        !self.is_stock_limited() || self.quantity >= quantity
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub store_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_ugx: Ugx,
    pub price_credits: Option<Credits>,
    pub track_inventory: bool,
    pub allow_backorder: bool,
    pub quantity: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(store_id: i64, name: S, price_ugx: Ugx) -> Self {
        Self {
            store_id,
            name: name.into(),
            description: None,
            price_ugx,
            price_credits: None,
            track_inventory: true,
            allow_backorder: false,
            quantity: 0,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_credit_price(mut self, price: Credits) -> Self {
        self.price_credits = Some(price);
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_backorder(mut self) -> Self {
        self.allow_backorder = true;
        self
    }

    pub fn untracked(mut self) -> Self {
        self.track_inventory = false;
        self
    }

    /// The status a freshly registered product starts with.
    pub fn initial_status(&self) -> ProductStatus {
        if self.track_inventory && !self.allow_backorder && self.quantity <= 0 {
            ProductStatus::OutOfStock
        } else {
            ProductStatus::Active
        }
    }
}

//--------------------------------------      StoreTier      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StoreTier {
    Free,
    Basic,
    Premium,
}

impl StoreTier {
    /// The maximum number of products a store on this tier may list. `None` means unlimited.
    pub fn max_products(&self) -> Option<i64> {
        match self {
            StoreTier::Free => Some(10),
            StoreTier::Basic => Some(100),
            StoreTier::Premium => None,
        }
    }
}

//--------------------------------------        Store        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    /// Platform fee in basis points of the UGX subtotal (250 = 2.5%)
    pub fee_bps: i64,
    pub tier: StoreTier,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// The platform fee for the given UGX subtotal, rounded down to the nearest shilling.
    pub fn platform_fee(&self, subtotal: Ugx) -> Ugx {
        let fee = i128::from(subtotal.value()) * i128::from(self.fee_bps) / 10_000;
        Ugx::from(i64::try_from(fee).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone)]
pub struct NewStore {
    pub owner_id: i64,
    pub name: String,
    pub fee_bps: i64,
    pub tier: StoreTier,
}

impl NewStore {
    pub fn new<S: Into<String>>(owner_id: i64, name: S) -> Self {
        Self { owner_id, name: name.into(), fee_bps: 0, tier: StoreTier::Free }
    }

    pub fn with_fee_bps(mut self, fee_bps: i64) -> Self {
        self.fee_bps = fee_bps;
        self
    }

    pub fn with_tier(mut self, tier: StoreTier) -> Self {
        self.tier = tier;
        self
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been placed, but not paid for yet.
    Pending,
    /// The order is paid and the store is preparing it.
    Processing,
    Shipped,
    Delivered,
    /// The buyer has confirmed receipt.
    Completed,
    /// The order has been cancelled by the buyer, an admin, or the expiry worker. Its stock has been released.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatusType::Pending | OrderStatusType::Processing)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Shipped => write!(f, "shipped"),
            OrderStatusType::Delivered => write!(f, "delivered"),
            OrderStatusType::Completed => write!(f, "completed"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------  OrderPaymentStatus  --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderPaymentStatus::Pending => write!(f, "pending"),
            OrderPaymentStatus::Paid => write!(f, "paid"),
            OrderPaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid from the buyer's credit balance at checkout.
    Credits,
    /// Collected through the mobile-money gateway.
    MobileMoney,
    /// Any other arrangement (cash on delivery, bank transfer, ...). Settled out of band and confirmed later.
    Deferred,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Credits => write!(f, "credits"),
            PaymentMethod::MobileMoney => write!(f, "mobile_money"),
            PaymentMethod::Deferred => write!(f, "deferred"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    /// Storefronts send `credit` and `credits` interchangeably. Unknown methods are deferred.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(ConversionError("Empty payment method".into())),
            "credit" | "credits" => Ok(Self::Credits),
            "mobile_money" | "mobilemoney" => Ok(Self::MobileMoney),
            _ => Ok(Self::Deferred),
        }
    }
}

//--------------------------------------     OrderTotals     ---------------------------------------------------------
/// The dual-currency breakdown of an order.
///
/// For each currency, `total = subtotal + shipping + tax - discount`. The platform fee is informational: it is the
/// store's cut retained by the platform and is not added to what the buyer pays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal_ugx: Ugx,
    pub tax_ugx: Ugx,
    pub shipping_ugx: Ugx,
    pub discount_ugx: Ugx,
    pub platform_fee_ugx: Ugx,
    pub total_ugx: Ugx,
    pub subtotal_credits: Credits,
    pub tax_credits: Credits,
    pub shipping_credits: Credits,
    pub discount_credits: Credits,
    pub platform_fee_credits: Credits,
    pub total_credits: Credits,
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub store_id: i64,
    pub buyer_id: i64,
    pub status: OrderStatusType,
    pub payment_status: OrderPaymentStatus,
    pub payment_method: PaymentMethod,
    #[sqlx(flatten)]
    pub totals: OrderTotals,
    /// Legacy display field. Mirrors `subtotal_ugx`.
    pub subtotal: Ugx,
    /// Legacy display field. Mirrors `total_ugx`.
    pub total: Ugx,
    pub paid_ugx: Ugx,
    pub paid_credits: Credits,
    /// The active payment record, if any
    pub payment_id: Option<i64>,
    pub mobile_money_provider: Option<String>,
    pub phone_number: Option<String>,
    /// The mobile-money transaction id returned by the gateway
    pub transaction_id: Option<String>,
    /// The last gateway failure. Cleared when a gateway request succeeds.
    pub gateway_error: Option<String>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == OrderPaymentStatus::Paid
    }

    pub fn awaiting_payment(&self) -> bool {
        self.status == OrderStatusType::Pending && self.payment_status == OrderPaymentStatus::Pending
    }
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
/// A snapshot of a product at the time it was ordered. Later catalog edits do not affect it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_description: Option<String>,
    pub unit_price_ugx: Ugx,
    pub unit_price_credits: Option<Credits>,
    pub quantity: i64,
    pub subtotal_ugx: Ugx,
    pub subtotal_credits: Credits,
    pub total_ugx: Ugx,
    pub total_credits: Credits,
    pub options: Json<ItemOptions>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub product_description: Option<String>,
    pub unit_price_ugx: Ugx,
    pub unit_price_credits: Option<Credits>,
    pub quantity: i64,
    pub options: ItemOptions,
}

impl NewOrderItem {
    pub fn snapshot(product: &Product, quantity: i64, options: ItemOptions) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            product_description: product.description.clone(),
            unit_price_ugx: product.price_ugx,
            unit_price_credits: product.price_credits,
            quantity,
            options,
        }
    }

    pub fn subtotal_ugx(&self) -> Ugx {
        self.unit_price_ugx * self.quantity
    }

    pub fn subtotal_credits(&self) -> Credits {
        self.unit_price_credits.map(|p| p * self.quantity).unwrap_or_default()
    }
}

//--------------------------------------       Payable       ---------------------------------------------------------
/// The entity a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Payable {
    Order(i64),
    /// A store's subscription fee. These payments are managed by the subscription billing subsystem.
    StoreSubscription(i64),
}

impl Payable {
    pub fn payable_type(&self) -> &'static str {
        match self {
            Payable::Order(_) => "order",
            Payable::StoreSubscription(_) => "store_subscription",
        }
    }

    pub fn payable_id(&self) -> i64 {
        match self {
            Payable::Order(id) | Payable::StoreSubscription(id) => *id,
        }
    }

    pub fn from_parts(payable_type: &str, id: i64) -> Result<Self, ConversionError> {
        match payable_type {
            "order" => Ok(Payable::Order(id)),
            "store_subscription" => Ok(Payable::StoreSubscription(id)),
            s => Err(ConversionError(format!("Unknown payable type: {s}"))),
        }
    }
}

impl Display for Payable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.payable_type(), self.payable_id())
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------     PaymentData     ---------------------------------------------------------
/// How a payment is split between credits and UGX. Stored as JSON in the `payment_data` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    pub credits_used: Credits,
    pub ugx_amount: Ugx,
    pub is_hybrid: bool,
}

impl PaymentData {
    pub fn ugx_only(amount: Ugx) -> Self {
        Self { credits_used: Credits::zero(), ugx_amount: amount, is_hybrid: false }
    }

    pub fn credits_only(amount: Credits) -> Self {
        Self { credits_used: amount, ugx_amount: Ugx::zero(), is_hybrid: false }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub payable: Payable,
    pub buyer_id: i64,
    pub method: PaymentMethod,
    pub provider: Option<String>,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub payment_data: PaymentData,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// The payment still needs money collected through the mobile-money gateway.
    pub fn awaits_mobile_money(&self) -> bool {
        self.is_pending() && self.method == PaymentMethod::MobileMoney && self.payment_data.ugx_amount.is_positive()
    }
}

impl FromRow<'_, SqliteRow> for Payment {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let payable_type: String = row.try_get("payable_type")?;
        let payable_id: i64 = row.try_get("payable_id")?;
        let payable = Payable::from_parts(&payable_type, payable_id)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "payable_type".into(), source: Box::new(e) })?;
        let payment_data: Json<PaymentData> = row.try_get("payment_data")?;
        Ok(Self {
            id: row.try_get("id")?,
            payable,
            buyer_id: row.try_get("buyer_id")?,
            method: row.try_get("method")?,
            provider: row.try_get("provider")?,
            transaction_id: row.try_get("transaction_id")?,
            status: row.try_get("status")?,
            payment_data: payment_data.0,
            failure_reason: row.try_get("failure_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payable: Payable,
    pub buyer_id: i64,
    pub method: PaymentMethod,
    pub provider: Option<String>,
    pub payment_data: PaymentData,
}

impl NewPayment {
    pub fn for_order(order: &Order, method: PaymentMethod, payment_data: PaymentData) -> Self {
        Self { payable: Payable::Order(order.id), buyer_id: order.buyer_id, method, provider: None, payment_data }
    }

    pub fn with_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

//--------------------------------------  CreditTransaction  ---------------------------------------------------------
/// An entry in a buyer's credit journal. Debits are negative.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: i64,
    pub buyer_id: i64,
    pub amount: Credits,
    pub balance_after: Credits,
    pub reason: String,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      CartOwner      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    Buyer(i64),
    /// An anonymous shopper, identified by their session token.
    Session(String),
}

impl CartOwner {
    pub fn owner_type(&self) -> &'static str {
        match self {
            CartOwner::Buyer(_) => "buyer",
            CartOwner::Session(_) => "session",
        }
    }

    pub fn owner_key(&self) -> String {
        match self {
            CartOwner::Buyer(id) => id.to_string(),
            CartOwner::Session(token) => token.clone(),
        }
    }
}

impl Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartOwner::Buyer(id) => write!(f, "buyer #{id}"),
            CartOwner::Session(token) => write!(f, "session [{token}]"),
        }
    }
}

//--------------------------------------      CartItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub item_key: String,
    pub product_id: i64,
    pub quantity: i64,
    /// The price when the item was added. Informational only; orders are priced from the live catalog.
    pub unit_price_ugx: Ugx,
    pub options: Json<ItemOptions>,
    pub added_at: DateTime<Utc>,
}

//--------------------------------------        Cart         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub owner: CartOwner,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(owner: CartOwner) -> Self {
        Self { owner, items: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, key: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.item_key == key)
    }

    /// The total number of units in the cart
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal_ugx(&self) -> Ugx {
        self.items.iter().map(|i| i.unit_price_ugx * i.quantity).sum()
    }
}
