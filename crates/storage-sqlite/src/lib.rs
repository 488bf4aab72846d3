//! SQLite storage implementation for Paperdesk.
//!
//! This crate provides all database-related functionality using Diesel ORM
//! with SQLite. It implements the repository traits defined in
//! `paperdesk-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for portfolios, trades, and AI configuration
//! - The ledger executor (single-writer, transactional batch application)
//! - Database-specific model types (with Diesel derives)
//!
//! This crate is the only place in the workspace where Diesel dependencies
//! exist. All other crates are database-agnostic and work with traits.

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod ai_config;
pub mod ledger;
pub mod portfolios;
pub mod trades;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, run_migrations, spawn_writer, DbConnection, DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{DieselErrorExt, StorageError};

// Re-export from paperdesk-core for convenience
pub use paperdesk_core::errors::{DatabaseError, Error, Result};
