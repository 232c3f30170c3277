//! The database handle used by a session.
//!
//! [`Database`] is the seam between the query-generation loop and a live
//! connection; [`SqlDatabase`] implements it over a [`DbPool`].

use async_trait::async_trait;

use crate::db::executor::QueryExecutor;
use crate::db::pool::DbPool;
use crate::db::schema::SchemaInspector;
use crate::error::AppResult;
use crate::models::{ConnectionConfig, ConnectionInfo, DatabaseType, QueryResult, TableSchema};

#[async_trait]
pub trait Database: Send + Sync {
    /// Backend of the connected database.
    fn db_type(&self) -> DatabaseType;

    /// Table (and view) names, in catalog order.
    async fn list_tables(&self) -> AppResult<Vec<String>>;

    /// Columns and keys of one table. An unknown table is a `Schema` error.
    async fn describe_table(&self, table: &str) -> AppResult<TableSchema>;

    /// Run a statement verbatim and return its rows.
    async fn execute(&self, sql: &str) -> AppResult<QueryResult>;
}

/// [`Database`] backed by a single-connection sqlx pool.
#[derive(Debug, Clone)]
pub struct SqlDatabase {
    pool: DbPool,
    executor: QueryExecutor,
    info: ConnectionInfo,
}

impl SqlDatabase {
    /// Connect using `config` and execute statements with `executor`'s limits.
    pub async fn connect(config: &ConnectionConfig, executor: QueryExecutor) -> AppResult<Self> {
        let (pool, info) = DbPool::connect(config).await?;
        Ok(Self::from_pool(pool, info, executor))
    }

    pub fn from_pool(pool: DbPool, info: ConnectionInfo, executor: QueryExecutor) -> Self {
        Self {
            pool,
            executor,
            info,
        }
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Database for SqlDatabase {
    fn db_type(&self) -> DatabaseType {
        self.pool.db_type()
    }

    async fn list_tables(&self) -> AppResult<Vec<String>> {
        SchemaInspector::list_tables(&self.pool).await
    }

    async fn describe_table(&self, table: &str) -> AppResult<TableSchema> {
        SchemaInspector::describe_table(&self.pool, table).await
    }

    async fn execute(&self, sql: &str) -> AppResult<QueryResult> {
        self.executor.execute(&self.pool, sql).await
    }
}
