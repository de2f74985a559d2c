//! Dump orchestration.
//!
//! A run always follows the same order: drop every foreign key, dump the
//! sampled tables (capturing their ids), attach restrictions to the tables
//! that reference them, stream every full table, recreate every foreign key.
//! Full tables are never read before all sampled tables are done.

pub mod catalog;
pub mod constraints;
pub mod copy;
pub mod filter;
pub mod sampler;
pub mod script;

use log::info;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    db::{DbClient, RowReader},
    errors::DumpError,
    models::{config::DumpConfig, table::Table},
};

use catalog::Catalog;
use constraints::{drop_constraints, recreate_constraints};
use copy::copy_table;
use filter::apply_restrictions;
use sampler::sample_table;
use script::{preamble, EPILOGUE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpMode {
    Sampled,
    Full,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub mode: DumpMode,
    pub rows: u64,
    /// Sampled tables this table was restricted by.
    pub restricted_by: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DumpSummary {
    pub database: String,
    pub tables: Vec<TableSummary>,
    pub constraints: usize,
    pub restrictions: usize,
}

impl DumpSummary {
    pub fn table(&self, name: &str) -> Option<&TableSummary> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

pub struct Dumper<'a, C: ?Sized> {
    client: &'a C,
    config: &'a DumpConfig,
}

fn by_name<'t>(sampled: &'t [Table], full: &'t [Table]) -> Vec<&'t Table> {
    let mut tables: Vec<&Table> = sampled.iter().chain(full.iter()).collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));
    tables
}

impl<'a, C> Dumper<'a, C>
where
    C: DbClient + RowReader + ?Sized,
{
    pub fn new(client: &'a C, config: &'a DumpConfig) -> Self {
        Self { client, config }
    }

    /// Load metadata for every exported table: `(sampled, full)`, each sorted
    /// by name.
    pub async fn plan(&self) -> Result<(Vec<Table>, Vec<Table>), DumpError> {
        let mut catalog = Catalog::new(self.client);

        let mut sampled = Vec::new();
        for name in &self.config.sampled_tables {
            let table = catalog
                .load_table(name)
                .await?
                .sampled(self.config.row_limit, self.config.id_selector(name));
            table.id_index()?;
            sampled.push(table);
        }

        let full_names = catalog
            .list_tables(&self.config.excluded_from_full())
            .await?;
        let mut full = Vec::new();
        for name in &full_names {
            full.push(catalog.load_table(name).await?);
        }

        Ok((sampled, full))
    }

    /// Write the complete load script to `out`.
    pub async fn run<W>(&self, out: &mut W) -> Result<DumpSummary, DumpError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let database = self.client.current_database().await?;
        let (mut sampled, mut full) = self.plan().await?;
        info!(
            "exporting {} sampled and {} full tables from {}",
            sampled.len(),
            full.len(),
            database
        );

        let mut summary = DumpSummary {
            database: database.clone(),
            ..DumpSummary::default()
        };

        out.write_all(preamble(&database).as_bytes()).await?;
        summary.constraints = drop_constraints(&by_name(&sampled, &full), out).await?;

        for table in sampled.iter_mut() {
            let rows = sample_table(self.client, table, out).await?;
            summary.tables.push(TableSummary {
                name: table.name.clone(),
                mode: DumpMode::Sampled,
                rows: rows as u64,
                restricted_by: Vec::new(),
            });
        }

        summary.restrictions = apply_restrictions(&sampled, &mut full)?;

        for table in &full {
            let rows = copy_table(self.client, table, out).await?;
            summary.tables.push(TableSummary {
                name: table.name.clone(),
                mode: DumpMode::Full,
                rows,
                restricted_by: table.restrictions().keys().cloned().collect(),
            });
        }

        recreate_constraints(&by_name(&sampled, &full), out).await?;
        out.write_all(EPILOGUE.as_bytes()).await?;
        out.flush().await?;

        info!(
            "dump complete: {} tables, {} rows, {} foreign keys",
            summary.tables.len(),
            summary.total_rows(),
            summary.constraints
        );
        Ok(summary)
    }
}
