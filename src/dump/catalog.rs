use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::{
    db::DbClient,
    errors::DumpError,
    models::{
        schema::{ColumnSchema, ForeignKeyConstraint},
        table::Table,
    },
};

/// Table metadata for one run, queried once per table and cached.
pub struct Catalog<'a, C: ?Sized> {
    client: &'a C,
    columns: HashMap<String, Vec<ColumnSchema>>,
    foreign_keys: HashMap<String, Vec<ForeignKeyConstraint>>,
}

impl<'a, C: DbClient + ?Sized> Catalog<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            columns: HashMap::new(),
            foreign_keys: HashMap::new(),
        }
    }

    /// Base tables not in `excluded`, sorted by name.
    pub async fn list_tables(&self, excluded: &BTreeSet<String>) -> Result<BTreeSet<String>, DumpError> {
        let excluded: Vec<String> = excluded.iter().cloned().collect();
        let tables = self.client.list_tables(&excluded).await?;
        Ok(tables
            .into_iter()
            .filter(|t| !excluded.contains(t))
            .collect())
    }

    pub async fn columns_of(&mut self, table: &str) -> Result<&[ColumnSchema], DumpError> {
        if !self.columns.contains_key(table) {
            let schema = self.client.describe_table(table).await?;
            if schema.columns.is_empty() {
                return Err(DumpError::Catalog(format!(
                    "table \"{}\" has no columns or does not exist",
                    table
                )));
            }
            debug!("{}: {} columns", table, schema.columns.len());
            self.columns.insert(table.to_string(), schema.columns);
        }
        Ok(self.columns[table].as_slice())
    }

    pub async fn foreign_keys_of(&mut self, table: &str) -> Result<&[ForeignKeyConstraint], DumpError> {
        if !self.foreign_keys.contains_key(table) {
            let constraints = self.client.foreign_keys(table).await?;
            debug!("{}: {} foreign keys", table, constraints.len());
            self.foreign_keys.insert(table.to_string(), constraints);
        }
        Ok(self.foreign_keys[table].as_slice())
    }

    /// A full-dump `Table` built from cached metadata.
    pub async fn load_table(&mut self, name: &str) -> Result<Table, DumpError> {
        let columns = self.columns_of(name).await?.to_vec();
        let foreign_keys = self.foreign_keys_of(name).await?.to_vec();
        Ok(Table::new(name, columns, foreign_keys))
    }
}
