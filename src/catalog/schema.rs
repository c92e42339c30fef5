use crate::catalog::types::ColumnType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: ColumnType,
    pub nullable: bool,
    /// Whether the database assigns a value when the column is omitted
    /// (serial, identity, DEFAULT expression). Feeds the insert column-set
    /// rule: defaulted primary-key columns are always part of the written
    /// column set so they can serve as a conflict target.
    #[serde(default)]
    pub has_default: bool,
    /// Type modifier forwarded to the value encoder (e.g. varchar length,
    /// numeric precision). Opaque to the engine itself.
    #[serde(default)]
    pub type_modifier: Option<i32>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            nullable: false,
            has_default: false,
            type_modifier: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraint>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// True when `columns` (order-insensitive) is the primary key or a
    /// declared unique constraint.
    pub fn columns_are_unique(&self, columns: &[String]) -> bool {
        let matches = |declared: &[String]| {
            declared.len() == columns.len() && columns.iter().all(|c| declared.contains(c))
        };
        if self.has_primary_key() && matches(&self.primary_key) {
            return true;
        }
        self.unique_constraints.iter().any(|u| matches(&u.columns))
    }
}
