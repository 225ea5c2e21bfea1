//! # Settlement engine public API
//!
//! The `se_api` module exposes the programmatic API of the settlement engine. The API is modular, so clients can
//! pick the pieces they need.
//!
//! * [`order_flow_api`] takes orders through checkout, fulfilment, cancellation and expiry.
//! * [`payment_api`] settles orders with credits, mobile money, or a mix of the two, and handles gateway callbacks.
//! * [`cart_api`] manages buyer and session carts.
//! * [`inventory_api`] and [`credit_api`] maintain stock levels and credit balances.
//! * [`order_query_api`] answers read-only questions about orders and payments.
//!
//! The pure building blocks ([`pricing`], [`hybrid_split`] and [`policy`]) are public so that storefronts can quote
//! prices without touching the database.
//!
//! # API usage
//!
//! Every API is created from a database backend that implements the backend traits it needs:
//!
//! ```rust,ignore
//! use settlement_engine::{events::EventProducers, OfflineGateway, OrderFlowApi, PricingPolicy, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/settlement.db", 5).await?;
//! let api = OrderFlowApi::new(db, OfflineGateway, PricingPolicy::from_env_or_default(), EventProducers::default());
//! let placed = api.create_order(new_order).await?;
//! ```

pub mod cart_api;
pub mod credit_api;
pub mod hybrid_split;
pub mod inventory_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;
pub mod payment_api;
pub mod payment_objects;
pub mod policy;
pub mod pricing;
