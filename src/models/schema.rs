//! Schema-related data models.
//!
//! This module defines types for database schema introspection and the
//! text fragments rendered from it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexInfo>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            schema_name: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Add a column definition.
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        if column.is_primary_key {
            self.primary_key.push(column.name.clone());
        }
        self.columns.push(column);
        self
    }

    /// Add a foreign key.
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Add an index.
    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indexes.push(index);
        self
    }

    /// Key designation for a column of this table.
    ///
    /// Precedence: primary key, single-column unique index, foreign key
    /// source, leading column of any other index.
    pub fn key_role(&self, column: &str) -> KeyRole {
        if self.primary_key.iter().any(|c| c == column) {
            return KeyRole::Primary;
        }
        if self
            .indexes
            .iter()
            .any(|idx| idx.is_unique && idx.columns.len() == 1 && idx.columns[0] == column)
        {
            return KeyRole::Unique;
        }
        if self.foreign_keys.iter().any(|fk| fk.column == column) {
            return KeyRole::Foreign;
        }
        if self
            .indexes
            .iter()
            .any(|idx| idx.columns.first().is_some_and(|c| c == column))
        {
            return KeyRole::Indexed;
        }
        KeyRole::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Full type (e.g., `varchar(30)`, `bigint unsigned`)
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
}

impl ColumnDefinition {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            is_primary_key: false,
        }
    }

    /// Set whether this is a primary key column.
    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

impl ForeignKey {
    /// Create a new foreign key.
    pub fn new(
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

impl IndexInfo {
    /// Create a new index info.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            is_unique: false,
            is_primary: false,
        }
    }

    /// Set whether this is a unique index.
    pub fn with_unique(mut self, is_unique: bool) -> Self {
        self.is_unique = is_unique;
        self
    }

    /// Set whether this is the primary key index.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        if is_primary {
            self.is_unique = true;
        }
        self
    }
}

/// Key designation rendered into a column line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    Primary,
    Unique,
    Foreign,
    Indexed,
    None,
}

impl KeyRole {
    /// Short code in the style of MySQL's `DESCRIBE` output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Primary => "PRI",
            Self::Unique => "UNI",
            Self::Foreign => "FK",
            Self::Indexed => "MUL",
            Self::None => "",
        }
    }
}

impl std::fmt::Display for KeyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Whether a fragment is a table heading or a single column line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    TableHeading,
    Column,
}

/// One indexable line of schema text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFragment {
    pub kind: FragmentKind,
    pub table: String,
    pub text: String,
}

impl SchemaFragment {
    /// Create a table heading fragment.
    pub fn heading(table: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::TableHeading,
            table: table.into(),
            text: text.into(),
        }
    }

    /// Create a column fragment.
    pub fn column(table: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Column,
            table: table.into(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for SchemaFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> TableSchema {
        TableSchema::new("orders")
            .with_column(ColumnDefinition::new("id", "int", false).with_primary_key(true))
            .with_column(ColumnDefinition::new("customer_id", "int", false))
            .with_column(ColumnDefinition::new("reference", "varchar(32)", false))
            .with_column(ColumnDefinition::new("placed_at", "datetime", true))
            .with_column(ColumnDefinition::new("note", "text", true))
            .with_foreign_key(ForeignKey::new("customer_id", "customers", "id"))
            .with_index(IndexInfo::new("uq_reference", vec!["reference".to_string()]).with_unique(true))
            .with_index(IndexInfo::new(
                "idx_placed",
                vec!["placed_at".to_string(), "note".to_string()],
            ))
    }

    #[test]
    fn test_with_column_tracks_primary_key() {
        let table = orders();
        assert_eq!(table.primary_key, vec!["id".to_string()]);
        assert_eq!(table.columns.len(), 5);
    }

    #[test]
    fn test_key_role_precedence() {
        let table = orders();
        assert_eq!(table.key_role("id"), KeyRole::Primary);
        assert_eq!(table.key_role("reference"), KeyRole::Unique);
        assert_eq!(table.key_role("customer_id"), KeyRole::Foreign);
        assert_eq!(table.key_role("placed_at"), KeyRole::Indexed);
        // Non-leading index columns carry no key designation
        assert_eq!(table.key_role("note"), KeyRole::None);
    }

    #[test]
    fn test_key_role_codes() {
        assert_eq!(KeyRole::Primary.to_string(), "PRI");
        assert_eq!(KeyRole::Indexed.code(), "MUL");
        assert_eq!(KeyRole::None.code(), "");
    }
}
