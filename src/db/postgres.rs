use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use futures::TryStreamExt;
use log::debug;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    dump::copy::CopyQuery,
    errors::DumpError,
    models::{
        schema::{ColumnSchema, ForeignKeyConstraint, TableSchema},
        value::SqlValue,
    },
    sql::{qualified_table, quote_ident},
};

use super::{DbClient, RowReader};

const LIST_TABLES_SQL: &str = r#"
    SELECT table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_catalog = current_database()
      AND table_schema = 'public'
      AND table_type = 'BASE TABLE'
      AND NOT (table_name::text = ANY($1))
    ORDER BY table_name
"#;

const DESCRIBE_TABLE_SQL: &str = r#"
    SELECT a.attname::text AS column_name,
           format_type(a.atttypid, a.atttypmod) AS data_type,
           NOT a.attnotnull AS is_nullable
    FROM pg_catalog.pg_attribute a
    WHERE a.attrelid = $1::regclass
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT r.conname::text AS constraint_name,
           pg_catalog.pg_get_constraintdef(r.oid, true) AS definition
    FROM pg_catalog.pg_constraint r
    WHERE r.conrelid = $1::regclass
      AND r.contype = 'f'
    ORDER BY r.conname
"#;

pub struct PostgresClient {
    pub pool: PgPool,
}

impl PostgresClient {
    pub async fn connect(database_url: &str) -> Result<Self, DumpError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| DumpError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }
}

/// How a column is read back from a sample query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoder {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    Json,
    /// Selected as ISO-8601 text and parsed here; `infinity` stays text.
    Timestamp,
    TimestampTz,
    /// Selected as `::text`.
    Text,
}

impl Decoder {
    fn for_type(declared_type: &str) -> Self {
        let t = declared_type.trim().to_ascii_lowercase();
        match t.as_str() {
            "boolean" => Decoder::Bool,
            "smallint" => Decoder::I16,
            "integer" => Decoder::I32,
            "bigint" => Decoder::I64,
            "real" => Decoder::F32,
            "double precision" => Decoder::F64,
            "json" | "jsonb" => Decoder::Json,
            _ if t.ends_with("[]") => Decoder::Text,
            _ if t.starts_with("timestamp") && t.ends_with(" with time zone") => Decoder::TimestampTz,
            _ if t.starts_with("timestamp") => Decoder::Timestamp,
            _ => Decoder::Text,
        }
    }

    fn select_expr(self, column: &str) -> String {
        let quoted = quote_ident(column);
        match self {
            Decoder::Text => format!("{}::text AS {}", quoted, quoted),
            Decoder::Timestamp | Decoder::TimestampTz => {
                format!("to_json({})#>>'{{}}' AS {}", quoted, quoted)
            }
            _ => quoted,
        }
    }

    fn read(self, row: &PgRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        let value = match self {
            Decoder::Bool => row.try_get::<Option<bool>, _>(idx)?.map(SqlValue::Bool),
            Decoder::I16 => row
                .try_get::<Option<i16>, _>(idx)?
                .map(|v| SqlValue::Int(v.into())),
            Decoder::I32 => row
                .try_get::<Option<i32>, _>(idx)?
                .map(|v| SqlValue::Int(v.into())),
            Decoder::I64 => row.try_get::<Option<i64>, _>(idx)?.map(SqlValue::Int),
            Decoder::F32 => row
                .try_get::<Option<f32>, _>(idx)?
                .map(|v| SqlValue::Float(v.into())),
            Decoder::F64 => row.try_get::<Option<f64>, _>(idx)?.map(SqlValue::Float),
            Decoder::Json => row
                .try_get::<Option<serde_json::Value>, _>(idx)?
                .map(SqlValue::Json),
            Decoder::Timestamp | Decoder::TimestampTz => row
                .try_get::<Option<String>, _>(idx)?
                .map(|text| self.timestamp(text)),
            Decoder::Text => row.try_get::<Option<String>, _>(idx)?.map(SqlValue::Text),
        };
        Ok(value.unwrap_or(SqlValue::Null))
    }

    /// Values chrono cannot represent (`infinity`, BC dates) are kept as
    /// text, which the source accepts back as a quoted literal.
    fn timestamp(self, text: String) -> SqlValue {
        let parsed = match self {
            Decoder::TimestampTz => DateTime::parse_from_rfc3339(&text)
                .ok()
                .map(SqlValue::TimestampTz),
            _ => NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(SqlValue::Timestamp),
        };
        parsed.unwrap_or(SqlValue::Text(text))
    }
}

fn sample_sql(table: &str, columns: &[ColumnSchema]) -> String {
    let select = columns
        .iter()
        .map(|c| Decoder::for_type(&c.data_type).select_expr(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {} LIMIT $1", select, qualified_table(table))
}

fn count_rows(chunk: &[u8]) -> u64 {
    chunk.iter().filter(|b| **b == b'\n').count() as u64
}

#[async_trait]
impl DbClient for PostgresClient {
    async fn current_database(&self) -> Result<String, DumpError> {
        let name = sqlx::query_scalar::<_, String>("SELECT current_database()::text")
            .fetch_one(&self.pool)
            .await
            .map_err(DumpError::Sqlx)?;
        Ok(name)
    }

    async fn list_tables(&self, excluded: &[String]) -> Result<Vec<String>, DumpError> {
        let rows = sqlx::query(LIST_TABLES_SQL)
            .bind(excluded)
            .fetch_all(&self.pool)
            .await
            .map_err(DumpError::Sqlx)?;

        let tables = rows
            .iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tables)
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableSchema, DumpError> {
        let rows = sqlx::query(DESCRIBE_TABLE_SQL)
            .bind(qualified_table(table_name))
            .fetch_all(&self.pool)
            .await
            .map_err(DumpError::Sqlx)?;

        let columns = rows
            .iter()
            .map(|row| -> Result<ColumnSchema, sqlx::Error> {
                Ok(ColumnSchema {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    is_nullable: row.try_get("is_nullable")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TableSchema {
            table_name: table_name.to_string(),
            columns,
        })
    }

    async fn foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeyConstraint>, DumpError> {
        let rows = sqlx::query(FOREIGN_KEYS_SQL)
            .bind(qualified_table(table_name))
            .fetch_all(&self.pool)
            .await
            .map_err(DumpError::Sqlx)?;

        let constraints = rows
            .iter()
            .map(|row| -> Result<ForeignKeyConstraint, sqlx::Error> {
                Ok(ForeignKeyConstraint {
                    owning_table: table_name.to_string(),
                    constraint_name: row.try_get("constraint_name")?,
                    definition: row.try_get("definition")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(constraints)
    }
}

#[async_trait]
impl RowReader for PostgresClient {
    async fn fetch_rows(
        &self,
        table: &str,
        columns: &[ColumnSchema],
        limit: u64,
    ) -> Result<Vec<Vec<SqlValue>>, DumpError> {
        let limit = i64::try_from(limit)
            .map_err(|_| DumpError::Config(format!("row limit {} is too large", limit)))?;
        let sql = sample_sql(table, columns);
        debug!("{}", sql);

        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(DumpError::Sqlx)?;

        let decoders: Vec<Decoder> = columns
            .iter()
            .map(|c| Decoder::for_type(&c.data_type))
            .collect();

        let values = rows
            .iter()
            .map(|row| {
                decoders
                    .iter()
                    .enumerate()
                    .map(|(i, decoder)| decoder.read(row, i))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(values)
    }

    async fn copy_out(
        &self,
        query: &CopyQuery,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, DumpError> {
        let sql = query.to_sql()?;
        debug!("{}", sql);

        let mut conn = self.pool.acquire().await?;
        let mut stream = conn.copy_out_raw(&sql).await?;

        let mut rows = 0;
        while let Some(chunk) = stream.try_next().await? {
            rows += count_rows(&chunk);
            sink.write_all(&chunk).await?;
        }

        Ok(rows)
    }
}
