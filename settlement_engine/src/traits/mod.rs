//! #  Database management and control.
//!
//! This module provides the interfaces that define the contracts of the settlement engine database *backends*.
//!
//! ## Traits
//! * [`SettlementDatabase`] defines the highest level of behaviour: placing orders, driving payments through their
//!   lifecycle, cancelling and expiring orders. Each of its methods is a single atomic transaction.
//! * [`CatalogManagement`] registers and looks up stores and products.
//! * [`InventoryManagement`] is the inventory ledger (`reserve`, `release`, `set`).
//! * [`CreditLedger`] is the only way to change a buyer's credit balance.
//! * [`CartManagement`] persists session- and buyer-scoped carts.
//! * [`OrderManagement`] provides read-only queries over orders and payments.
mod cart_management;
mod catalog_management;
mod credit_ledger;
mod inventory_management;
mod order_management;
mod settlement_database;

mod data_objects;

pub use cart_management::{CartManagement, NewCartItem};
pub use catalog_management::CatalogManagement;
pub use credit_ledger::CreditLedger;
pub use data_objects::{ExpiryResult, PaymentConfirmation};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use settlement_database::{SettlementDatabase, SettlementError};
