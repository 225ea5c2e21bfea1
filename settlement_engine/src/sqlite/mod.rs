//! SQLite backend for the settlement engine.
//!
//! [`SqliteDatabase`] implements every backend trait in [`crate::traits`]. The free functions in [`db`] hold the
//! individual queries.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
