use std::path::Path;

use db::postgres::PostgresClient;
use dump::{DumpSummary, Dumper};
use errors::DumpError;
use models::config::DumpConfig;
use schema_sync::{PgDumpCloner, SchemaCloner};
use tokio::io::{AsyncWrite, BufWriter};

pub mod cli;
pub mod db;
pub mod dump;
pub mod errors;
pub mod models;
pub mod schema_sync;
pub mod sql;

/// Output sink for the generated script.
pub type ScriptWriter = BufWriter<Box<dyn AsyncWrite + Unpin + Send>>;

/// Open `path` for writing, or stdout when `None`.
pub async fn open_output(path: Option<&Path>) -> Result<ScriptWriter, DumpError> {
    let sink: Box<dyn AsyncWrite + Unpin + Send> = match path {
        Some(path) => Box::new(tokio::fs::File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    };
    Ok(BufWriter::new(sink))
}

/// Clone the schema (unless disabled), then write the load script.
pub async fn run(config: &DumpConfig) -> Result<DumpSummary, DumpError> {
    config.validate()?;

    if config.sync_schema {
        let target = config
            .target_db
            .as_deref()
            .ok_or_else(|| DumpError::Config("TARGET_DB is required".to_string()))?;
        PgDumpCloner::new(&config.source_db, target)
            .clone_schema()
            .await?;
    }

    let client = PostgresClient::connect(&config.source_db).await?;
    let mut out = open_output(config.output.as_deref()).await?;
    Dumper::new(&client, config).run(&mut out).await
}
