//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Single-connection pool management
//! - Raw statement execution with row limits and timeouts
//! - Schema introspection
//! - Row decoding
//! - The `Database` handle consumed by sessions

pub mod database;
pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use database::{Database, SqlDatabase};
pub use executor::QueryExecutor;
pub use pool::DbPool;
pub use schema::SchemaInspector;
