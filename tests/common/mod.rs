//! Shared SQLite fixture for integration tests.

#![allow(dead_code)]

use std::str::FromStr;

use sql_query_generator::db::{QueryExecutor, SqlDatabase};
use sql_query_generator::models::ConnectionConfig;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use tempfile::TempDir;

const SHOP_SCHEMA: &[&str] = &[
    "CREATE TABLE customers (
        id INTEGER PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE,
        name TEXT
    )",
    "CREATE TABLE orders (
        id INTEGER PRIMARY KEY NOT NULL,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        total REAL,
        created_at TEXT
    )",
    "CREATE INDEX idx_orders_created_at ON orders(created_at)",
    "CREATE VIEW big_orders AS SELECT id, total FROM orders WHERE total > 100",
    "INSERT INTO customers (id, email, name) VALUES
        (1, 'ann@example.com', 'Ann'),
        (2, 'bob@example.com', 'Bob'),
        (3, 'cy@example.com', NULL)",
    "INSERT INTO orders (id, customer_id, total, created_at) VALUES
        (1, 1, 25.5, '2024-01-03'),
        (2, 1, 120.0, '2024-01-05'),
        (3, 2, 9.99, '2024-02-11'),
        (4, 2, 310.0, '2024-02-12'),
        (5, 3, 42.0, '2024-03-01')",
];

/// Tables (and views) in the fixture.
pub const TABLE_COUNT: usize = 3;
/// Columns across all tables and views.
pub const COLUMN_COUNT: usize = 9;

/// Create `shop.db` inside `dir` and return its connection string.
pub async fn shop_database(dir: &TempDir) -> String {
    let url = format!("sqlite:{}", dir.path().join("shop.db").display());
    let options = SqliteConnectOptions::from_str(&url)
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await.unwrap();
    for statement in SHOP_SCHEMA {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;
    url
}

pub async fn connect(url: &str, executor: QueryExecutor) -> SqlDatabase {
    let config = ConnectionConfig::new(url, 5).unwrap();
    SqlDatabase::connect(&config, executor).await.unwrap()
}
