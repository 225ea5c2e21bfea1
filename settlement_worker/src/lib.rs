//! # Settlement worker
//! The worker hosts the background jobs of the settlement engine. It is responsible for:
//! * Loading the platform configuration (database, pricing policy, timeouts) from the environment.
//! * Bringing the database schema up to date.
//! * Periodically cancelling orders that were never paid and returning their stock.
//!
//! ## Configuration
//! The worker is configured via environment variables. See [config](config/index.html) for more information.

pub mod cli;
pub mod config;
pub mod errors;
pub mod expiry_worker;
pub mod worker;
