//! SQLite storage implementation for the brokerage valuation engine.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository and ledger traits defined in `brokerage-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for portfolios, positions, orders, market prices and settings
//! - The ledger store that runs each write as one immediate transaction
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! The `core` crate is database-agnostic and works with traits.
//!
//! ```text
//!          core (domain)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod ledger;
pub mod market_prices;
pub mod orders;
pub mod portfolios;
pub mod positions;
pub mod settings;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from brokerage-core for convenience
pub use brokerage_core::errors::{DatabaseError, Error, Result};
