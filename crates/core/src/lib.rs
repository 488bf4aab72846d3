//! Paperdesk Core - Domain entities, services, and traits.
//!
//! This crate contains the core business logic for Paperdesk.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod ai;
pub mod constants;
pub mod errors;
pub mod ledger;
pub mod market_data;
pub mod portfolios;
pub mod trades;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
pub use errors::{DatabaseError, ValidationError};
