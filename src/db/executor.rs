//! Query execution engine.
//!
//! Generated statements are executed verbatim (no parameters, no rewriting).
//! Execution is bounded by:
//! - a row limit, enforced via streaming (only `limit + 1` rows are fetched)
//! - a timeout around the whole fetch
//!
//! Each backend module provides identical functionality adapted to its pool type.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{AppError, AppResult};
use crate::models::{ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, QueryResult};
use futures_util::StreamExt;
use sqlx::{Column, TypeInfo};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Duration,
    row_limit: u32,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self::with_defaults(DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT)
    }

    /// Create a new query executor with custom settings.
    ///
    /// A zero row limit is raised to 1 so that a non-empty result is never
    /// reported as entirely truncated.
    pub fn with_defaults(timeout_secs: u64, row_limit: u32) -> Self {
        Self {
            query_timeout: Duration::from_secs(timeout_secs),
            row_limit: row_limit.max(1),
        }
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Execute a statement and materialize its result set.
    pub async fn execute(&self, pool: &DbPool, sql: &str) -> AppResult<QueryResult> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(AppError::invalid_input("SQL statement is empty"));
        }

        let start = Instant::now();
        debug!(
            sql = %sql,
            limit = self.row_limit,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        match pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, self.row_limit, self.query_timeout).await?;
                let fallback = if rows.is_empty() {
                    mysql::describe_columns(p, sql, self.query_timeout).await
                } else {
                    Vec::new()
                };
                Ok(process_rows(rows, fallback, self.row_limit, start))
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, self.row_limit, self.query_timeout).await?;
                let fallback = if rows.is_empty() {
                    postgres::describe_columns(p, sql, self.query_timeout).await
                } else {
                    Vec::new()
                };
                Ok(process_rows(rows, fallback, self.row_limit, start))
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, self.row_limit, self.query_timeout).await?;
                let fallback = if rows.is_empty() {
                    sqlite::describe_columns(p, sql, self.query_timeout).await
                } else {
                    Vec::new()
                };
                Ok(process_rows(rows, fallback, self.row_limit, start))
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `QueryResult` from fetched rows.
///
/// `empty_columns` supplies the column list when the statement returned no rows.
fn process_rows<R: RowToJson>(
    rows: Vec<R>,
    empty_columns: Vec<ColumnMetadata>,
    row_limit: u32,
    start: Instant,
) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        let mut result = QueryResult::empty(execution_time_ms);
        result.columns = empty_columns;
        return result;
    };

    let columns = first.column_metadata();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;

    let json_rows = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_json_values())
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    QueryResult {
        columns,
        rows: json_rows,
        truncated,
        execution_time_ms,
    }
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> AppResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(AppError::from)?);
    }
    Ok(rows)
}

fn to_metadata<C: Column>(columns: &[C]) -> Vec<ColumnMetadata> {
    columns
        .iter()
        .map(|c| ColumnMetadata::new(c.name(), c.type_info().name()))
        .collect()
}

fn timeout_error(operation: &str, timeout: Duration) -> AppError {
    AppError::timeout(operation, timeout.as_secs())
}

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{Executor, MySqlPool};

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AppResult<Vec<MySqlRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn describe_columns(
        pool: &MySqlPool,
        sql: &str,
        query_timeout: Duration,
    ) -> Vec<ColumnMetadata> {
        match timeout(query_timeout, pool.describe(sql)).await {
            Ok(Ok(describe)) => to_metadata(describe.columns()),
            _ => Vec::new(),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::{Executor, PgPool};

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AppResult<Vec<PgRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn describe_columns(
        pool: &PgPool,
        sql: &str,
        query_timeout: Duration,
    ) -> Vec<ColumnMetadata> {
        match timeout(query_timeout, pool.describe(sql)).await {
            Ok(Ok(describe)) => to_metadata(describe.columns()),
            _ => Vec::new(),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Executor, SqlitePool};

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AppResult<Vec<SqliteRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn describe_columns(
        pool: &SqlitePool,
        sql: &str,
        query_timeout: Duration,
    ) -> Vec<ColumnMetadata> {
        match timeout(query_timeout, pool.describe(sql)).await {
            Ok(Ok(describe)) => to_metadata(describe.columns()),
            _ => Vec::new(),
        }
    }
}
