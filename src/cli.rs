use std::path::PathBuf;

use clap::Parser;

use crate::{
    errors::DumpError,
    models::config::{parse_id_columns, parse_table_list, DumpConfig, DEFAULT_ROW_LIMIT},
};

/// Export a referentially-consistent, size-bounded subset of a PostgreSQL
/// database as a replayable load script.
#[derive(Parser, Debug)]
#[command(name = "pgsubset", version, about)]
pub struct Cli {
    /// Source database URL
    #[arg(long, env = "SOURCE_DB")]
    pub source_db: Option<String>,

    /// Target database URL the schema is cloned into
    #[arg(long, env = "TARGET_DB")]
    pub target_db: Option<String>,

    /// Maximum rows exported from each sampled table
    #[arg(
        long,
        env = "ROW_LIMIT",
        default_value_t = DEFAULT_ROW_LIMIT,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub row_limit: u64,

    /// Tables dumped with a row limit (comma-separated)
    #[arg(long, env = "SAMPLED_TABLES", value_delimiter = ',')]
    pub sampled_tables: Vec<String>,

    /// Tables left out of the dump entirely (comma-separated)
    #[arg(long, env = "SKIPPED_TABLES", value_delimiter = ',')]
    pub skipped_tables: Vec<String>,

    /// Id column of sampled tables: table=column or table=#position
    #[arg(long, env = "ID_COLUMNS", value_delimiter = ',')]
    pub id_columns: Vec<String>,

    /// Write the script to this file instead of stdout
    #[arg(short, long, env = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Do not clone the source schema into the target first
    #[arg(long)]
    pub skip_schema_sync: bool,

    /// Print a JSON summary of the run to stderr
    #[arg(long)]
    pub json_summary: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<DumpConfig, DumpError> {
        let source_db = self
            .source_db
            .ok_or_else(|| DumpError::Config("SOURCE_DB is required".to_string()))?;

        let config = DumpConfig {
            source_db,
            target_db: self.target_db,
            row_limit: self.row_limit,
            sampled_tables: parse_table_list(&self.sampled_tables),
            skipped_tables: parse_table_list(&self.skipped_tables),
            id_columns: parse_id_columns(&self.id_columns)?,
            output: self.output,
            sync_schema: !self.skip_schema_sync,
        };
        config.validate()?;
        Ok(config)
    }
}
