//! Data models for the SQL query generator.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod conversation;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{
    ConnectionConfig, ConnectionConfigError, ConnectionInfo, ConnectionParams, DatabaseType,
};
pub use conversation::{AttemptOutcome, ConversationTurn, QueryAttempt, QueryOutcome, Role};
pub use query::{ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, QueryResult};
pub use schema::{
    ColumnDefinition, ForeignKey, FragmentKind, IndexInfo, KeyRole, SchemaFragment, TableSchema,
};
