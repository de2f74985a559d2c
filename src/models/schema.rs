use serde::{Deserialize, Serialize};

use crate::sql::{qualified_table, quote_ident};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    /// Declared type as reported by `format_type`, e.g. `character varying(100)`.
    pub data_type: String,
    pub is_nullable: bool,
}

impl ColumnSchema {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: true,
        }
    }
}

/// A foreign-key constraint on an exported table.
///
/// `definition` is the clause returned by `pg_get_constraintdef` and is never
/// parsed, only replayed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForeignKeyConstraint {
    pub owning_table: String,
    pub constraint_name: String,
    pub definition: String,
}

impl ForeignKeyConstraint {
    pub fn new(owning_table: &str, constraint_name: &str, definition: &str) -> Self {
        Self {
            owning_table: owning_table.to_string(),
            constraint_name: constraint_name.to_string(),
            definition: definition.to_string(),
        }
    }

    pub fn drop_statement(&self) -> String {
        format!(
            "ALTER TABLE ONLY {} DROP CONSTRAINT IF EXISTS {};\n",
            qualified_table(&self.owning_table),
            quote_ident(&self.constraint_name)
        )
    }

    pub fn create_statement(&self) -> String {
        format!(
            "ALTER TABLE ONLY {} ADD CONSTRAINT {} {};\n",
            qualified_table(&self.owning_table),
            quote_ident(&self.constraint_name),
            self.definition
        )
    }
}
