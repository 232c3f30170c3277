//! Scripted stand-ins for the database, the embedding model and the
//! generation client.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::db::Database;
use crate::embedding::EmbeddingProvider;
use crate::error::{AppError, AppResult};
use crate::llm::GenerationClient;
use crate::models::{
    ColumnDefinition, ColumnMetadata, ConversationTurn, DatabaseType, ForeignKey, QueryResult,
    TableSchema,
};

/// In-memory catalog whose first `failures` executions fail.
pub struct StaticDatabase {
    db_type: DatabaseType,
    tables: Vec<TableSchema>,
    failures: usize,
    executed: Mutex<Vec<String>>,
}

impl StaticDatabase {
    /// `customers(id, name)` and `orders(id, customer_id, total)`.
    pub fn shop() -> Self {
        Self {
            db_type: DatabaseType::MySQL,
            tables: vec![
                TableSchema::new("customers")
                    .with_column(ColumnDefinition::new("id", "int", false).with_primary_key(true))
                    .with_column(ColumnDefinition::new("name", "varchar(100)", false)),
                TableSchema::new("orders")
                    .with_column(ColumnDefinition::new("id", "int", false).with_primary_key(true))
                    .with_column(ColumnDefinition::new("customer_id", "int", false))
                    .with_column(ColumnDefinition::new("total", "decimal(10,2)", true))
                    .with_foreign_key(ForeignKey::new("customer_id", "customers", "id")),
            ],
            failures: 0,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    /// Statements seen so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Database for StaticDatabase {
    fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    async fn list_tables(&self) -> AppResult<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.table_name.clone()).collect())
    }

    async fn describe_table(&self, table: &str) -> AppResult<TableSchema> {
        self.tables
            .iter()
            .find(|t| t.table_name == table)
            .cloned()
            .ok_or_else(|| AppError::schema(format!("Table '{}' not found", table), table))
    }

    async fn execute(&self, sql: &str) -> AppResult<QueryResult> {
        let mut executed = self.executed.lock().unwrap();
        executed.push(sql.to_string());

        if executed.len() <= self.failures {
            return Err(AppError::execution(
                format!("Unknown column 'totl' (statement {})", executed.len()),
                Some("42S22".to_string()),
                "Check column names",
            ));
        }

        Ok(QueryResult {
            columns: vec![ColumnMetadata::new("order_count", "BIGINT")],
            rows: vec![vec![json!(3)]],
            truncated: false,
            execution_time_ms: 1,
        })
    }
}

/// Replies from a queue, then a fixed statement once the queue is empty.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<AppResult<String>>>,
    seen_history: Mutex<Vec<usize>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub const FALLBACK: &'static str = "```sql\nSELECT COUNT(*) AS order_count FROM orders\n```";

    pub fn new(replies: Vec<AppResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen_history: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// History length passed on each call.
    pub fn history_lengths(&self) -> Vec<usize> {
        self.seen_history.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedGenerator {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, history: &[ConversationTurn], prompt: &str) -> AppResult<String> {
        self.seen_history.lock().unwrap().push(history.len());
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::FALLBACK.to_string()))
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    fn dimensions(&self) -> usize {
        8
    }

    async fn embed(&self, _texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::embedding("model unavailable"))
    }
}
