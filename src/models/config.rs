use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::errors::DumpError;

use super::table::IdSelector;

pub const DEFAULT_ROW_LIMIT: u64 = 10_000;

/// Everything a dump run needs, already validated by [`DumpConfig::validate`].
#[derive(Debug, Clone)]
pub struct DumpConfig {
    pub source_db: String,
    pub target_db: Option<String>,
    pub row_limit: u64,
    pub sampled_tables: BTreeSet<String>,
    pub skipped_tables: BTreeSet<String>,
    pub id_columns: HashMap<String, IdSelector>,
    /// `None` writes the script to stdout.
    pub output: Option<PathBuf>,
    pub sync_schema: bool,
}

impl DumpConfig {
    pub fn new(source_db: &str) -> Self {
        Self {
            source_db: source_db.to_string(),
            target_db: None,
            row_limit: DEFAULT_ROW_LIMIT,
            sampled_tables: BTreeSet::new(),
            skipped_tables: BTreeSet::new(),
            id_columns: HashMap::new(),
            output: None,
            sync_schema: false,
        }
    }

    pub fn validate(&self) -> Result<(), DumpError> {
        if self.source_db.trim().is_empty() {
            return Err(DumpError::Config("SOURCE_DB is required".to_string()));
        }
        if self.sync_schema && self.target_db.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(DumpError::Config(
                "TARGET_DB is required unless schema sync is skipped".to_string(),
            ));
        }
        if self.row_limit == 0 {
            return Err(DumpError::Config("ROW_LIMIT must be a positive integer".to_string()));
        }
        if let Some(table) = self.sampled_tables.intersection(&self.skipped_tables).next() {
            return Err(DumpError::Config(format!(
                "table \"{}\" is both sampled and skipped",
                table
            )));
        }
        for table in self.id_columns.keys() {
            if !self.sampled_tables.contains(table) {
                log::warn!("id column configured for \"{}\", which is not sampled", table);
            }
        }
        Ok(())
    }

    /// Names no full-table listing may return: skipped and sampled tables.
    pub fn excluded_from_full(&self) -> BTreeSet<String> {
        self.skipped_tables.union(&self.sampled_tables).cloned().collect()
    }

    pub fn id_selector(&self, table: &str) -> IdSelector {
        self.id_columns.get(table).cloned().unwrap_or_default()
    }
}

/// Parse `table=column` / `table=#n` pairs.
pub fn parse_id_columns<S: AsRef<str>>(pairs: &[S]) -> Result<HashMap<String, IdSelector>, DumpError> {
    let mut selectors = HashMap::new();
    for pair in pairs {
        let pair = pair.as_ref().trim();
        if pair.is_empty() {
            continue;
        }
        let (table, selector) = pair.split_once('=').ok_or_else(|| {
            DumpError::Config(format!("expected table=column in id columns, got {:?}", pair))
        })?;
        let table = table.trim();
        if table.is_empty() {
            return Err(DumpError::Config(format!("missing table name in {:?}", pair)));
        }
        if selectors.insert(table.to_string(), selector.parse()?).is_some() {
            return Err(DumpError::Config(format!("id column for \"{}\" given twice", table)));
        }
    }
    Ok(selectors)
}

/// Split a comma list into a set of non-empty, trimmed names.
pub fn parse_table_list<S: AsRef<str>>(items: &[S]) -> BTreeSet<String> {
    items
        .iter()
        .flat_map(|item| item.as_ref().split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
