//! Plain-text rendering of a database schema.
//!
//! Every column becomes one line in a fixed format:
//!
//! ```text
//! Table: orders, Column: customer_id, Type: int, Null: NO, Key: FK
//! ```
//!
//! The same lines serve as the full schema section of a prompt and as the
//! fragments indexed for retrieval.

use serde::Serialize;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::AppResult;
use crate::models::{KeyRole, SchemaFragment, TableSchema};

/// One column, as rendered into a schema line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub key: KeyRole,
}

impl ColumnDescription {
    pub fn line(&self) -> String {
        format!(
            "Table: {}, Column: {}, Type: {}, Null: {}, Key: {}",
            self.table,
            self.name,
            self.data_type,
            if self.nullable { "YES" } else { "NO" },
            self.key.code()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
}

impl TableDescription {
    /// Columns of `schema` in ordinal order, with their key designations.
    pub fn from_schema(schema: &TableSchema) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|col| ColumnDescription {
                table: schema.table_name.clone(),
                name: col.name.clone(),
                data_type: col.data_type.clone(),
                nullable: col.nullable,
                key: schema.key_role(&col.name),
            })
            .collect();

        Self {
            name: schema.table_name.clone(),
            columns,
        }
    }

    pub fn heading(&self) -> String {
        format!("Table: {}", self.name)
    }

    pub fn lines(&self) -> Vec<String> {
        self.columns.iter().map(ColumnDescription::line).collect()
    }
}

/// Description of every table in a database.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableDescription>,
}

impl SchemaDescription {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Headings and column lines, table by table, in column order.
    pub fn fragments(&self) -> Vec<SchemaFragment> {
        let mut fragments = Vec::with_capacity(self.tables.len() + self.column_count());
        for table in &self.tables {
            fragments.push(SchemaFragment::heading(&table.name, table.heading()));
            for column in &table.columns {
                fragments.push(SchemaFragment::column(&table.name, column.line()));
            }
        }
        fragments
    }

    /// The table list, then each table's heading and column lines followed
    /// by a blank line.
    pub fn render(&self) -> String {
        let mut out = format!("Tables: {}\n\n", self.table_names().join(", "));
        for table in &self.tables {
            out.push_str(&table.heading());
            out.push('\n');
            for line in table.lines() {
                out.push_str(&line);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

/// Introspects a connected database into text.
pub struct SchemaDescriber;

impl SchemaDescriber {
    /// One line per column of `table`, in the database's column order.
    pub async fn describe_table(db: &dyn Database, table: &str) -> AppResult<Vec<String>> {
        let schema = db.describe_table(table).await?;
        Ok(TableDescription::from_schema(&schema).lines())
    }

    /// Every table, in catalog order.
    pub async fn describe_all(db: &dyn Database) -> AppResult<SchemaDescription> {
        let names = db.list_tables().await?;
        debug!(tables = ?names, "Describing tables");

        let mut tables = Vec::with_capacity(names.len());
        for name in &names {
            let schema = db.describe_table(name).await?;
            tables.push(TableDescription::from_schema(&schema));
        }

        let description = SchemaDescription { tables };
        info!(
            tables = description.tables.len(),
            columns = description.column_count(),
            "Described schema"
        );
        Ok(description)
    }
}
