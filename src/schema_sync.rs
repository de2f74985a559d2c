//! Copies the source schema (DDL only) into the target before data is loaded.

use std::process::{Command, Stdio};

use async_trait::async_trait;
use log::{debug, info};

use crate::errors::DumpError;

const PG_DUMP_ARGS: &[&str] = &[
    "--clean",
    "--create",
    "--no-owner",
    "--no-acl",
    "--format=p",
    "--schema-only",
];

#[async_trait]
pub trait SchemaCloner: Send + Sync {
    /// Make the target schema match the source schema.
    async fn clone_schema(&self) -> Result<(), DumpError>;
}

/// `pg_dump --schema-only <source> | psql -q <target>`, without a shell.
#[derive(Debug, Clone)]
pub struct PgDumpCloner {
    source: String,
    target: String,
    pg_dump: String,
    psql: String,
}

impl PgDumpCloner {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            pg_dump: "pg_dump".to_string(),
            psql: "psql".to_string(),
        }
    }

    /// Use other executables, e.g. a versioned `pg_dump`.
    pub fn with_binaries(mut self, pg_dump: &str, psql: &str) -> Self {
        self.pg_dump = pg_dump.to_string();
        self.psql = psql.to_string();
        self
    }

    fn pipe(&self) -> Result<(), DumpError> {
        debug!("{} {} <source> | {} -q <target>", self.pg_dump, PG_DUMP_ARGS.join(" "), self.psql);

        let mut dump = Command::new(&self.pg_dump)
            .args(PG_DUMP_ARGS)
            .arg(&self.source)
            .stdout(Stdio::piped())
            // An unread stderr pipe blocks pg_dump once it fills.
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DumpError::SchemaSync(format!("failed to start {}: {}", self.pg_dump, e)))?;

        let schema = dump
            .stdout
            .take()
            .ok_or_else(|| DumpError::SchemaSync(format!("{} stdout unavailable", self.pg_dump)))?;

        let restore = Command::new(&self.psql)
            .arg("-q")
            .arg(&self.target)
            .stdin(Stdio::from(schema))
            .stdout(Stdio::null())
            .output();

        let restore = match restore {
            Ok(output) => output,
            Err(e) => {
                let _ = dump.kill();
                let _ = dump.wait();
                return Err(DumpError::SchemaSync(format!(
                    "failed to start {}: {}",
                    self.psql, e
                )));
            }
        };

        let dumped = dump.wait()?;
        if !dumped.success() {
            return Err(DumpError::SchemaSync(format!(
                "{} exited with {}",
                self.pg_dump, dumped
            )));
        }
        if !restore.status.success() {
            return Err(DumpError::SchemaSync(format!(
                "{} exited with {}: {}",
                self.psql,
                restore.status,
                String::from_utf8_lossy(&restore.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaCloner for PgDumpCloner {
    async fn clone_schema(&self) -> Result<(), DumpError> {
        info!("cloning schema from source into target");
        let cloner = self.clone();
        tokio::task::spawn_blocking(move || cloner.pipe())
            .await
            .map_err(|e| DumpError::SchemaSync(e.to_string()))?
    }
}
