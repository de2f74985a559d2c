use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::DumpError;
use crate::sql::{column_list, quote_ident};

use super::schema::{ColumnSchema, ForeignKeyConstraint};
use super::value::{render_literal, SqlValue};

/// Which column of a sampled table provides the ids other tables point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelector {
    Column(String),
    /// Zero-based position in catalog column order. Written `#n`.
    Position(usize),
}

impl Default for IdSelector {
    fn default() -> Self {
        IdSelector::Column("id".to_string())
    }
}

impl FromStr for IdSelector {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(pos) = s.strip_prefix('#') {
            return pos.parse::<usize>().map(IdSelector::Position).map_err(|_| {
                DumpError::Config(format!("invalid id column position: {:?}", s))
            });
        }
        if s.is_empty() {
            return Err(DumpError::Config("empty id column name".to_string()));
        }
        Ok(IdSelector::Column(s.to_string()))
    }
}

impl fmt::Display for IdSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdSelector::Column(name) => f.write_str(name),
            IdSelector::Position(pos) => write!(f, "#{}", pos),
        }
    }
}

impl IdSelector {
    pub fn resolve(&self, table: &str, columns: &[ColumnSchema]) -> Result<usize, DumpError> {
        let index = match self {
            IdSelector::Column(name) => columns.iter().position(|c| &c.name == name),
            IdSelector::Position(pos) => (*pos < columns.len()).then_some(*pos),
        };
        index.ok_or_else(|| {
            DumpError::Catalog(format!(
                "table \"{}\" has no id column {}; configure one with --id-columns {}=<column>",
                table, self, table
            ))
        })
    }
}

/// Rows of a full table allowed by one sampled table.
#[derive(Debug, Clone, PartialEq)]
pub struct Restriction {
    /// Referencing column in the restricted table.
    pub column: String,
    /// Declared type of the sampled table's id column.
    pub value_type: String,
    pub ids: Vec<SqlValue>,
}

impl Restriction {
    /// `"col" IN (v1, v2)`, or `FALSE` when no ids were captured.
    pub fn clause(&self) -> Result<String, DumpError> {
        if self.ids.is_empty() {
            return Ok("FALSE".to_string());
        }
        let values = self
            .ids
            .iter()
            .map(|id| render_literal(id, &self.value_type))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{} IN ({})", quote_ident(&self.column), values.join(", ")))
    }

    pub fn allows(&self, value: &SqlValue) -> bool {
        self.ids.contains(value)
    }
}

/// One exported table for the duration of a run.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub row_limit: Option<u64>,
    pub id_selector: IdSelector,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    captured_ids: Option<Vec<SqlValue>>,
    restrictions: BTreeMap<String, Restriction>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<ColumnSchema>, foreign_keys: Vec<ForeignKeyConstraint>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            row_limit: None,
            id_selector: IdSelector::default(),
            foreign_keys,
            captured_ids: None,
            restrictions: BTreeMap::new(),
        }
    }

    pub fn sampled(mut self, row_limit: u64, id_selector: IdSelector) -> Self {
        self.row_limit = Some(row_limit);
        self.id_selector = id_selector;
        self
    }

    pub fn is_sampled(&self) -> bool {
        self.row_limit.is_some()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Quoted, comma-joined column list in catalog order.
    pub fn column_list(&self) -> String {
        column_list(self.columns.iter().map(|c| c.name.as_str()))
    }

    pub fn id_index(&self) -> Result<usize, DumpError> {
        self.id_selector.resolve(&self.name, &self.columns)
    }

    pub fn id_column(&self) -> Result<&ColumnSchema, DumpError> {
        Ok(&self.columns[self.id_index()?])
    }

    /// `None` until the table has been sampled.
    pub fn captured_ids(&self) -> Option<&[SqlValue]> {
        self.captured_ids.as_deref()
    }

    pub fn set_captured_ids(&mut self, ids: Vec<SqlValue>) -> Result<(), DumpError> {
        if !self.is_sampled() {
            return Err(DumpError::Export(format!(
                "cannot capture ids for full table \"{}\"",
                self.name
            )));
        }
        self.captured_ids = Some(ids);
        Ok(())
    }

    pub fn add_restriction(&mut self, referenced: &str, restriction: Restriction) -> Result<(), DumpError> {
        if self.restrictions.contains_key(referenced) {
            return Err(DumpError::DuplicateRestriction {
                table: self.name.clone(),
                referenced: referenced.to_string(),
            });
        }
        self.restrictions.insert(referenced.to_string(), restriction);
        Ok(())
    }

    /// Restrictions keyed by sampled table name.
    pub fn restrictions(&self) -> &BTreeMap<String, Restriction> {
        &self.restrictions
    }
}
