use log::{info, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    db::RowReader,
    errors::DumpError,
    models::{
        table::Table,
        value::{render_literal, SqlValue},
    },
    sql::qualified_table,
};

use super::script::data_header;

/// Rendered `INSERT` block of a sampled table and the ids it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    pub sql: String,
    pub ids: Vec<SqlValue>,
    pub rows: usize,
}

fn render_row(table: &Table, row: &[SqlValue]) -> Result<String, DumpError> {
    if row.len() != table.columns.len() {
        return Err(DumpError::Export(format!(
            "row of \"{}\" has {} values for {} columns",
            table.name,
            row.len(),
            table.columns.len()
        )));
    }
    let literals = row
        .iter()
        .zip(&table.columns)
        .map(|(value, column)| render_literal(value, &column.data_type))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", literals.join(",")))
}

/// Render `rows` as one multi-row `INSERT`, capturing the id of every row.
pub fn render_insert(table: &Table, rows: &[Vec<SqlValue>]) -> Result<SampleBlock, DumpError> {
    let id_index = table.id_index()?;
    let mut sql = data_header(&table.name);

    if rows.is_empty() {
        sql.push_str(&format!(
            "-- no rows sampled from {}\n\n",
            qualified_table(&table.name)
        ));
        return Ok(SampleBlock {
            sql,
            ids: Vec::new(),
            rows: 0,
        });
    }

    sql.push_str(&format!(
        "INSERT INTO {} ({}) VALUES\n",
        qualified_table(&table.name),
        table.column_list()
    ));

    let mut ids = Vec::with_capacity(rows.len());
    for (n, row) in rows.iter().enumerate() {
        sql.push_str(&render_row(table, row)?);
        sql.push_str(if n + 1 == rows.len() { ";\n" } else { ",\n" });
        ids.push(row[id_index].clone());
    }
    sql.push('\n');

    Ok(SampleBlock {
        sql,
        ids,
        rows: rows.len(),
    })
}

/// Read at most `row_limit` rows of `table`, write them as an `INSERT` and
/// record their ids on the table.
pub async fn sample_table<R, W>(reader: &R, table: &mut Table, out: &mut W) -> Result<usize, DumpError>
where
    R: RowReader + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let limit = table.row_limit.ok_or_else(|| {
        DumpError::Export(format!("table \"{}\" has no row limit", table.name))
    })?;
    table.id_index()?;

    let mut rows = reader.fetch_rows(&table.name, &table.columns, limit).await?;
    if rows.len() as u64 > limit {
        warn!(
            "{}: reader returned {} rows for limit {}, truncating",
            table.name,
            rows.len(),
            limit
        );
        rows.truncate(limit as usize);
    }

    let block = render_insert(table, &rows)?;
    out.write_all(block.sql.as_bytes()).await?;
    table.set_captured_ids(block.ids)?;

    info!("{}: sampled {} rows (limit {})", table.name, block.rows, limit);
    Ok(block.rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{schema::ColumnSchema, table::IdSelector};

    fn users(limit: u64) -> Table {
        Table::new(
            "users",
            vec![ColumnSchema::new("id", "integer"), ColumnSchema::new("name", "text")],
            Vec::new(),
        )
        .sampled(limit, IdSelector::default())
    }

    fn row(id: i64, name: &str) -> Vec<SqlValue> {
        vec![SqlValue::Int(id), SqlValue::Text(name.to_string())]
    }

    #[test]
    fn test_render_insert_captures_ids_in_order() {
        let block = render_insert(&users(2), &[row(1, "a"), row(2, "b")]).unwrap();

        assert_eq!(block.ids, vec![SqlValue::Int(1), SqlValue::Int(2)]);
        assert_eq!(block.rows, 2);
        assert!(block.sql.ends_with(
            "INSERT INTO public.\"users\" (\"id\",\"name\") VALUES\n(1,'a'),\n(2,'b');\n\n"
        ));
    }

    #[test]
    fn test_render_insert_single_row_terminates() {
        let block = render_insert(&users(1), &[row(7, "x")]).unwrap();
        assert!(block.sql.contains("VALUES\n(7,'x');\n"));
    }

    #[test]
    fn test_render_insert_nulls() {
        let rows = vec![vec![SqlValue::Int(1), SqlValue::Null]];
        let block = render_insert(&users(1), &rows).unwrap();
        assert!(block.sql.contains("(1,NULL);"));
    }

    #[test]
    fn test_render_insert_without_rows_is_a_comment() {
        let block = render_insert(&users(5), &[]).unwrap();
        assert!(block.ids.is_empty());
        assert!(!block.sql.contains("INSERT"));
        assert!(block.sql.contains("-- no rows sampled from public.\"users\""));
    }

    #[test]
    fn test_render_insert_uses_configured_id_column() {
        let table = Table::new(
            "events",
            vec![ColumnSchema::new("kind", "text"), ColumnSchema::new("event_uid", "uuid")],
            Vec::new(),
        )
        .sampled(1, IdSelector::Column("event_uid".to_string()));
        let rows = vec![vec![
            SqlValue::Text("click".to_string()),
            SqlValue::Text("9b2e".to_string()),
        ]];

        let block = render_insert(&table, &rows).unwrap();
        assert_eq!(block.ids, vec![SqlValue::Text("9b2e".to_string())]);
        assert!(block.sql.contains("('click','9b2e');"));
    }

    #[test]
    fn test_render_insert_rejects_short_rows() {
        let err = render_insert(&users(1), &[vec![SqlValue::Int(1)]]).unwrap_err();
        assert!(matches!(err, DumpError::Export(_)));
    }
}
