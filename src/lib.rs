//! SQL Query Generator Library
//!
//! Turns plain-language questions into SQL for a connected database
//! (MySQL, PostgreSQL, SQLite). Schema lines are embedded and retrieved by
//! similarity, a language model writes the statement, and failed statements
//! are retried with the conversation so far.

pub mod config;
pub mod db;
pub mod describe;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod format;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::RetryOrchestrator;
pub use session::Session;
