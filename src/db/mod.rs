use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::{
    dump::copy::CopyQuery,
    errors::DumpError,
    models::{
        schema::{ColumnSchema, ForeignKeyConstraint, TableSchema},
        value::SqlValue,
    },
};

pub mod postgres;

/// Catalog queries against the source database.
#[async_trait]
pub trait DbClient: Send + Sync {
    async fn current_database(&self) -> Result<String, DumpError>;
    /// Base tables of the exported schema, minus `excluded`.
    async fn list_tables(&self, excluded: &[String]) -> Result<Vec<String>, DumpError>;
    /// Columns in catalog order.
    async fn describe_table(&self, table_name: &str) -> Result<TableSchema, DumpError>;
    async fn foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeyConstraint>, DumpError>;
}

/// Row data reads against the source database.
#[async_trait]
pub trait RowReader: Send + Sync {
    /// At most `limit` rows, values in `columns` order.
    async fn fetch_rows(
        &self,
        table: &str,
        columns: &[ColumnSchema],
        limit: u64,
    ) -> Result<Vec<Vec<SqlValue>>, DumpError>;

    /// Stream the text-format `COPY` payload of `query` into `sink` and
    /// return the number of rows written.
    async fn copy_out(
        &self,
        query: &CopyQuery,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, DumpError>;
}
