//! Schema introspection module.
//!
//! This module provides database schema introspection functionality
//! for SQLite, PostgreSQL, and MySQL databases.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface.
//! All lookups are scoped to the connection's current database/schema.

use crate::db::pool::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{ColumnDefinition, ForeignKey, IndexInfo, TableSchema};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Names of all tables and views, ordered by name.
    pub async fn list_tables(pool: &DbPool) -> AppResult<Vec<String>> {
        match pool {
            DbPool::Postgres(p) => postgres::list_tables(p).await,
            DbPool::MySql(p) => mysql::list_tables(p).await,
            DbPool::SQLite(p) => sqlite::list_tables(p).await,
        }
    }

    /// Describe a table's columns (in ordinal order) and keys.
    pub async fn describe_table(pool: &DbPool, table_name: &str) -> AppResult<TableSchema> {
        match pool {
            DbPool::Postgres(p) => postgres::describe_table(p, table_name).await,
            DbPool::MySql(p) => mysql::describe_table(p, table_name).await,
            DbPool::SQLite(p) => sqlite::describe_table(p, table_name).await,
        }
    }
}

fn table_not_found(table_name: &str) -> AppError {
    AppError::schema(
        format!("Table '{}' not found", table_name),
        table_name.to_string(),
    )
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT t.table_name::text AS table_name
            FROM information_schema.tables t
            WHERE t.table_schema = current_schema()
            AND t.table_type IN ('BASE TABLE', 'VIEW')
            ORDER BY t.table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            c.is_nullable::text AS is_nullable,
            CASE WHEN pk.column_name IS NOT NULL THEN true ELSE false END AS is_primary_key
        FROM information_schema.columns c
        JOIN pg_class t ON t.relname = c.table_name
        JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
        LEFT JOIN (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_name = $1
            AND tc.table_schema = current_schema()
            AND tc.constraint_type = 'PRIMARY KEY'
        ) pk ON c.column_name = pk.column_name
        WHERE c.table_name = $1 AND c.table_schema = current_schema()
        ORDER BY c.ordinal_position
        "#;

        pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            kcu.column_name::text AS column_name,
            ccu.table_name::text AS foreign_table_name,
            ccu.column_name::text AS foreign_column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        JOIN information_schema.constraint_column_usage ccu
            ON ccu.constraint_name = tc.constraint_name
            AND ccu.table_schema = tc.table_schema
        WHERE tc.table_name = $1
        AND tc.table_schema = current_schema()
        AND tc.constraint_type = 'FOREIGN KEY'
        "#;

        pub const DESCRIBE_INDEXES: &str = r#"
        SELECT
            i.relname::text AS index_name,
            array_agg(a.attname::text ORDER BY array_position(ix.indkey, a.attnum)) AS column_names,
            ix.indisunique AS is_unique,
            ix.indisprimary AS is_primary
        FROM pg_index ix
        JOIN pg_class i ON i.oid = ix.indexrelid
        JOIN pg_class t ON t.oid = ix.indrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
        WHERE t.relname = $1 AND n.nspname = current_schema()
        GROUP BY i.relname, ix.indisunique, ix.indisprimary
        ORDER BY i.relname
        "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE IN ('BASE TABLE', 'VIEW')
            ORDER BY TABLE_NAME
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
            CONVERT(COLUMN_KEY USING utf8) AS COLUMN_KEY
        FROM information_schema.columns
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
        ORDER BY ORDINAL_POSITION
        "#;

        pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(REFERENCED_TABLE_NAME USING utf8) AS REFERENCED_TABLE_NAME,
            CONVERT(REFERENCED_COLUMN_NAME USING utf8) AS REFERENCED_COLUMN_NAME
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE TABLE_NAME = ?
        AND TABLE_SCHEMA = DATABASE()
        AND REFERENCED_TABLE_NAME IS NOT NULL
        "#;

        pub const DESCRIBE_INDEXES: &str = r#"
        SELECT
            CONVERT(INDEX_NAME USING utf8) AS INDEX_NAME,
            CONVERT(GROUP_CONCAT(COLUMN_NAME ORDER BY SEQ_IN_INDEX) USING utf8) AS COLUMN_NAMES,
            NOT NON_UNIQUE AS IS_UNIQUE
        FROM information_schema.STATISTICS
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
        GROUP BY INDEX_NAME, NON_UNIQUE
        ORDER BY INDEX_NAME
        "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type IN ('table', 'view')
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_tables(pool: &PgPool) -> AppResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables = rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("table_name").ok())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed PostgreSQL tables");
        Ok(tables)
    }

    pub async fn describe_table(pool: &PgPool, table_name: &str) -> AppResult<TableSchema> {
        let columns = fetch_columns(pool, table_name).await?;
        if columns.is_empty() {
            return Err(table_not_found(table_name));
        }

        let primary_key = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();

        let foreign_keys = fetch_foreign_keys(pool, table_name).await?;
        let indexes = fetch_indexes(pool, table_name).await;

        Ok(TableSchema {
            table_name: table_name.to_string(),
            schema_name: None,
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    async fn fetch_columns(pool: &PgPool, table_name: &str) -> AppResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("column_name")?;
            let column_type: String = row.try_get("column_type")?;
            let nullable: String = row.try_get("is_nullable")?;
            let is_pk: bool = row.try_get("is_primary_key")?;

            columns.push(
                ColumnDefinition::new(name, column_type, nullable == "YES").with_primary_key(is_pk),
            );
        }
        Ok(columns)
    }

    async fn fetch_foreign_keys(pool: &PgPool, table_name: &str) -> AppResult<Vec<ForeignKey>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_FOREIGN_KEYS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let mut foreign_keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let column: String = row.try_get("column_name")?;
            let ref_table: String = row.try_get("foreign_table_name")?;
            let ref_column: String = row.try_get("foreign_column_name")?;
            foreign_keys.push(ForeignKey::new(column, ref_table, ref_column));
        }
        Ok(foreign_keys)
    }

    // Index metadata only refines key designations; a catalog error here is not fatal.
    async fn fetch_indexes(pool: &PgPool, table_name: &str) -> Vec<IndexInfo> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_INDEXES)
            .bind(table_name)
            .fetch_all(pool)
            .await
            .unwrap_or_default();

        rows.iter()
            .filter_map(|row| {
                let name: String = row.try_get("index_name").ok()?;
                let columns: Vec<String> = row.try_get("column_names").ok()?;
                let is_unique: bool = row.try_get("is_unique").unwrap_or(false);
                let is_primary: bool = row.try_get("is_primary").unwrap_or(false);

                if columns.is_empty() {
                    None
                } else {
                    Some(
                        IndexInfo::new(name, columns)
                            .with_unique(is_unique)
                            .with_primary(is_primary),
                    )
                }
            })
            .collect()
    }
}

mod mysql {
    use super::*;
    use sqlx::{MySqlPool, Row};

    /// Safely get a string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_string(row: &sqlx::mysql::MySqlRow, column: &str) -> String {
        get_optional_string(row, column).unwrap_or_default()
    }

    fn get_optional_string(row: &sqlx::mysql::MySqlRow, column: &str) -> Option<String> {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<Vec<u8>>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
    }

    pub async fn list_tables(pool: &MySqlPool) -> AppResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables = rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    pub async fn describe_table(pool: &MySqlPool, table_name: &str) -> AppResult<TableSchema> {
        let columns = fetch_columns(pool, table_name).await?;
        if columns.is_empty() {
            return Err(table_not_found(table_name));
        }

        let primary_key = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();

        let foreign_keys = fetch_foreign_keys(pool, table_name).await?;
        let indexes = fetch_indexes(pool, table_name).await;

        Ok(TableSchema {
            table_name: table_name.to_string(),
            schema_name: None,
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    async fn fetch_columns(pool: &MySqlPool, table_name: &str) -> AppResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = get_string(row, "COLUMN_NAME");
                let column_type = get_string(row, "COLUMN_TYPE");
                let nullable = get_string(row, "IS_NULLABLE");
                let is_pk = get_string(row, "COLUMN_KEY") == "PRI";

                ColumnDefinition::new(name, column_type, nullable == "YES").with_primary_key(is_pk)
            })
            .collect())
    }

    async fn fetch_foreign_keys(pool: &MySqlPool, table_name: &str) -> AppResult<Vec<ForeignKey>> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_FOREIGN_KEYS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let column = get_string(row, "COLUMN_NAME");
                let ref_table = get_string(row, "REFERENCED_TABLE_NAME");
                let ref_column = get_string(row, "REFERENCED_COLUMN_NAME");
                ForeignKey::new(column, ref_table, ref_column)
            })
            .collect())
    }

    async fn fetch_indexes(pool: &MySqlPool, table_name: &str) -> Vec<IndexInfo> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_INDEXES)
            .bind(table_name)
            .fetch_all(pool)
            .await
            .unwrap_or_default();

        rows.iter()
            .map(|row| {
                let name = get_string(row, "INDEX_NAME");
                let columns_str = get_string(row, "COLUMN_NAMES");
                let is_unique: i64 = row.try_get("IS_UNIQUE").unwrap_or(0);
                let columns: Vec<String> = columns_str.split(',').map(|s| s.to_string()).collect();
                let is_primary = name == "PRIMARY";

                IndexInfo::new(name, columns)
                    .with_unique(is_unique != 0 || is_primary)
                    .with_primary(is_primary)
            })
            .collect()
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    /// Quote an identifier for use inside a PRAGMA argument.
    fn quote(name: &str) -> String {
        format!("'{}'", name.replace('\'', "''"))
    }

    pub async fn list_tables(pool: &SqlitePool) -> AppResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            tables.push(row.try_get::<String, _>("name")?);
        }

        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    pub async fn describe_table(pool: &SqlitePool, table_name: &str) -> AppResult<TableSchema> {
        let columns = fetch_columns(pool, table_name).await?;
        if columns.is_empty() {
            return Err(table_not_found(table_name));
        }

        let primary_key = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();

        let foreign_keys = fetch_foreign_keys(pool, table_name).await?;
        let indexes = fetch_indexes(pool, table_name).await;

        Ok(TableSchema {
            table_name: table_name.to_string(),
            schema_name: None,
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    async fn fetch_columns(pool: &SqlitePool, table_name: &str) -> AppResult<Vec<ColumnDefinition>> {
        let pragma_query = format!("PRAGMA table_info({})", quote(table_name));
        let rows = sqlx::query(&pragma_query).fetch_all(pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let notnull: i64 = row.try_get("notnull")?;
            let pk: i64 = row.try_get("pk")?;

            columns.push(ColumnDefinition::new(name, data_type, notnull == 0).with_primary_key(pk > 0));
        }
        Ok(columns)
    }

    async fn fetch_foreign_keys(
        pool: &SqlitePool,
        table_name: &str,
    ) -> AppResult<Vec<ForeignKey>> {
        let fk_query = format!("PRAGMA foreign_key_list({})", quote(table_name));
        let rows = sqlx::query(&fk_query).fetch_all(pool).await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let column: String = row.try_get("from").ok()?;
                let ref_table: String = row.try_get("table").ok()?;
                // `to` is NULL when the reference targets the parent's primary key implicitly
                let ref_column: String = row
                    .try_get::<Option<String>, _>("to")
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                Some(ForeignKey::new(column, ref_table, ref_column))
            })
            .collect())
    }

    async fn fetch_indexes(pool: &SqlitePool, table_name: &str) -> Vec<IndexInfo> {
        let idx_query = format!("PRAGMA index_list({})", quote(table_name));
        let idx_list = sqlx::query(&idx_query)
            .fetch_all(pool)
            .await
            .unwrap_or_default();

        let mut indexes = Vec::new();
        for idx_row in &idx_list {
            let Ok(name) = idx_row.try_get::<String, _>("name") else {
                continue;
            };
            let is_unique: i64 = idx_row.try_get("unique").unwrap_or(0);
            let origin: String = idx_row.try_get("origin").unwrap_or_default();
            let is_primary = origin == "pk";

            let columns = fetch_index_columns(pool, &name).await;
            if !columns.is_empty() {
                indexes.push(
                    IndexInfo::new(name, columns)
                        .with_unique(is_unique != 0)
                        .with_primary(is_primary),
                );
            }
        }
        indexes
    }

    async fn fetch_index_columns(pool: &SqlitePool, index_name: &str) -> Vec<String> {
        let query = format!("PRAGMA index_info({})", quote(index_name));
        sqlx::query(&query)
            .fetch_all(pool)
            .await
            .unwrap_or_default()
            .iter()
            // Expression index columns have no name
            .filter_map(|row| row.try_get::<Option<String>, _>("name").ok().flatten())
            .collect()
    }

}
