#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pgsubset::db::{DbClient, RowReader};
use pgsubset::dump::copy::CopyQuery;
use pgsubset::errors::DumpError;
use pgsubset::models::schema::{ColumnSchema, ForeignKeyConstraint, TableSchema};
use pgsubset::models::value::SqlValue;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub struct FakeTable {
    pub columns: Vec<ColumnSchema>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub rows: Vec<Vec<SqlValue>>,
}

/// In-memory source database.
pub struct FakeDb {
    pub name: String,
    pub tables: BTreeMap<String, FakeTable>,
    pub copy_statements: Mutex<Vec<String>>,
}

impl FakeDb {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: BTreeMap::new(),
            copy_statements: Mutex::new(Vec::new()),
        }
    }

    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)], rows: Vec<Vec<SqlValue>>) -> Self {
        self.tables.insert(
            name.to_string(),
            FakeTable {
                columns: columns
                    .iter()
                    .map(|(n, t)| ColumnSchema::new(n, t))
                    .collect(),
                foreign_keys: Vec::new(),
                rows,
            },
        );
        self
    }

    pub fn with_fk(mut self, table: &str, name: &str, definition: &str) -> Self {
        if let Some(t) = self.tables.get_mut(table) {
            t.foreign_keys
                .push(ForeignKeyConstraint::new(table, name, definition));
        }
        self
    }

    fn table(&self, name: &str) -> Result<&FakeTable, DumpError> {
        self.tables
            .get(name)
            .ok_or_else(|| DumpError::Catalog(format!("relation \"{}\" does not exist", name)))
    }

    pub fn statements(&self) -> Vec<String> {
        self.copy_statements.lock().unwrap().clone()
    }
}

/// Text-format `COPY` rendering of one value.
fn copy_text(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "\\N".to_string(),
        SqlValue::Text(s) => s
            .replace('\\', "\\\\")
            .replace('\t', "\\t")
            .replace('\n', "\\n"),
        other => other.to_string(),
    }
}

pub fn int_rows(rows: &[&[i64]]) -> Vec<Vec<SqlValue>> {
    rows.iter()
        .map(|r| r.iter().map(|v| SqlValue::Int(*v)).collect())
        .collect()
}

#[async_trait]
impl DbClient for FakeDb {
    async fn current_database(&self) -> Result<String, DumpError> {
        Ok(self.name.clone())
    }

    async fn list_tables(&self, excluded: &[String]) -> Result<Vec<String>, DumpError> {
        Ok(self
            .tables
            .keys()
            .filter(|name| !excluded.contains(name))
            .cloned()
            .collect())
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableSchema, DumpError> {
        Ok(TableSchema {
            table_name: table_name.to_string(),
            columns: self.table(table_name)?.columns.clone(),
        })
    }

    async fn foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeyConstraint>, DumpError> {
        Ok(self.table(table_name)?.foreign_keys.clone())
    }
}

#[async_trait]
impl RowReader for FakeDb {
    async fn fetch_rows(
        &self,
        table: &str,
        columns: &[ColumnSchema],
        limit: u64,
    ) -> Result<Vec<Vec<SqlValue>>, DumpError> {
        let source = self.table(table)?;
        let positions: Vec<usize> = columns
            .iter()
            .map(|c| source.columns.iter().position(|s| s.name == c.name).unwrap())
            .collect();

        Ok(source
            .rows
            .iter()
            .take(limit as usize)
            .map(|row| positions.iter().map(|p| row[*p].clone()).collect())
            .collect())
    }

    async fn copy_out(
        &self,
        query: &CopyQuery,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, DumpError> {
        self.copy_statements.lock().unwrap().push(query.to_sql()?);
        let source = self.table(&query.table)?;
        let position = |name: &str| source.columns.iter().position(|c| c.name == name).unwrap();

        let mut rows = 0;
        for row in &source.rows {
            let allowed = query
                .restrictions
                .iter()
                .all(|r| r.allows(&row[position(&r.column)]));
            if !allowed {
                continue;
            }
            let line = query
                .columns
                .iter()
                .map(|c| copy_text(&row[position(c)]))
                .collect::<Vec<_>>()
                .join("\t");
            sink.write_all(line.as_bytes()).await?;
            sink.write_all(b"\n").await?;
            rows += 1;
        }
        Ok(rows)
    }
}

/// Payload lines of the `COPY` block for `table` in a script.
pub fn copy_block(script: &str, table: &str) -> Vec<String> {
    let header = format!("COPY public.\"{}\" (", table);
    let mut lines = script.lines().skip_while(|l| !l.starts_with(&header));
    lines.next().expect("copy block present");
    lines
        .take_while(|l| *l != "\\.")
        .map(str::to_string)
        .collect()
}
