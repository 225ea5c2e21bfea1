//! Settlement Engine
//!
//! The settlement engine turns carts into durable orders for a multi-store marketplace. It reserves inventory, splits
//! payment between Ugandan shillings (UGX) and an internal credit balance, and reconciles payment confirmations back
//! into order and inventory state.
//!
//! The library is divided into these main sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite backend that implements them ([`mod@sqlite`]). You should
//!    never need to access the database directly. Instead, use the public API. The exception is the data types stored
//!    in the database. These are defined in the [`mod@db_types`] module and are public.
//! 2. The public API ([`mod@se_api`]). This provides order flows, payments, carts, inventory and credit management.
//!    Each API is generic over the backend traits it requires.
//! 3. The mobile-money gateway contract ([`mod@gateway`]). The engine never calls a provider directly; deployments
//!    supply a [`MobileMoneyGateway`] implementation.
//!
//! The engine also emits events that can be subscribed to. For example, when a new order is committed an
//! `OrderCreated` event is emitted. A simple actor framework ([`mod@events`]) lets you hook into these events and
//! perform custom actions (notifications, analytics) without ever affecting the order that triggered them.
pub mod db_types;
pub mod events;
pub mod gateway;
pub mod helpers;
pub mod se_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use gateway::{GatewayError, MobileMoneyGateway, OfflineGateway};
pub use se_api::{
    cart_api::CartApi,
    credit_api::CreditApi,
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    order_query_api::OrderQueryApi,
    payment_api::PaymentApi,
    payment_objects,
    policy::PricingPolicy,
    pricing::PricingApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CartManagement,
    CatalogManagement,
    CreditLedger,
    InventoryManagement,
    OrderManagement,
    SettlementDatabase,
    SettlementError,
};
