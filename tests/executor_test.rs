//! Integration tests for statement execution against a SQLite file.

mod common;

use serde_json::json;
use sql_query_generator::db::{Database, QueryExecutor};
use sql_query_generator::error::AppError;
use tempfile::TempDir;

#[tokio::test]
async fn test_select_returns_columns_in_order() {
    let dir = TempDir::new().unwrap();
    let url = common::shop_database(&dir).await;
    let db = common::connect(&url, QueryExecutor::new()).await;

    let result = db
        .execute("SELECT name, id FROM customers ORDER BY id")
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["name", "id"]);
    assert_eq!(result.row_count(), 3);
    assert!(!result.truncated);
    assert_eq!(result.rows[0], vec![json!("Ann"), json!(1)]);
    assert_eq!(result.value(2, "name"), Some(&json!(null)));

    db.close().await;
}

#[tokio::test]
async fn test_aggregate_over_join() {
    let dir = TempDir::new().unwrap();
    let url = common::shop_database(&dir).await;
    let db = common::connect(&url, QueryExecutor::new()).await;

    let result = db
        .execute(
            "SELECT c.name AS customer, COUNT(o.id) AS order_count \
             FROM customers c JOIN orders o ON o.customer_id = c.id \
             WHERE c.name IS NOT NULL GROUP BY c.id ORDER BY c.id",
        )
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["customer", "order_count"]);
    assert_eq!(result.value(0, "order_count"), Some(&json!(2)));
    assert_eq!(result.value(1, "customer"), Some(&json!("Bob")));

    db.close().await;
}

#[tokio::test]
async fn test_join_keeps_columns_with_the_same_name() {
    let dir = TempDir::new().unwrap();
    let url = common::shop_database(&dir).await;
    let db = common::connect(&url, QueryExecutor::new()).await;

    let result = db
        .execute(
            "SELECT c.id, o.id FROM customers c JOIN orders o ON o.customer_id = c.id \
             ORDER BY o.id DESC LIMIT 1",
        )
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["id", "id"]);
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows[0].len(), 2);
    assert_eq!(result.rows[0], vec![json!(3), json!(5)]);

    db.close().await;
}

#[tokio::test]
async fn test_row_limit_truncates() {
    let dir = TempDir::new().unwrap();
    let url = common::shop_database(&dir).await;
    let db = common::connect(&url, QueryExecutor::with_defaults(30, 2)).await;

    let result = db.execute("SELECT id FROM orders ORDER BY id").await.unwrap();
    assert_eq!(result.row_count(), 2);
    assert!(result.truncated);

    db.close().await;
}

#[tokio::test]
async fn test_row_limit_exact_is_not_truncated() {
    let dir = TempDir::new().unwrap();
    let url = common::shop_database(&dir).await;
    let db = common::connect(&url, QueryExecutor::with_defaults(30, 5)).await;

    let result = db.execute("SELECT id FROM orders").await.unwrap();
    assert_eq!(result.row_count(), 5);
    assert!(!result.truncated);

    db.close().await;
}

#[tokio::test]
async fn test_empty_result_keeps_column_names() {
    let dir = TempDir::new().unwrap();
    let url = common::shop_database(&dir).await;
    let db = common::connect(&url, QueryExecutor::new()).await;

    let result = db
        .execute("SELECT id, email FROM customers WHERE id > 100")
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.column_names(), vec!["id", "email"]);

    db.close().await;
}

#[tokio::test]
async fn test_invalid_sql_is_attempt_failure() {
    let dir = TempDir::new().unwrap();
    let url = common::shop_database(&dir).await;
    let db = common::connect(&url, QueryExecutor::new()).await;

    let err = db
        .execute("SELECT full_name FROM customers")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Execution { .. }));
    assert!(err.is_attempt_failure());
    assert!(err.to_string().contains("full_name"));

    db.close().await;
}

#[tokio::test]
async fn test_empty_sql_rejected() {
    let dir = TempDir::new().unwrap();
    let url = common::shop_database(&dir).await;
    let db = common::connect(&url, QueryExecutor::new()).await;

    let err = db.execute("  \n ").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput { .. }));
    assert!(err.is_attempt_failure());

    db.close().await;
}
