use log::info;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    db::RowReader,
    errors::DumpError,
    models::table::{Restriction, Table},
    sql::{column_list, qualified_table},
};

use super::script::data_header;

/// Terminator of a text-format `COPY` payload.
pub const END_OF_DATA: &str = "\\.\n";

/// What to stream for one full table.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyQuery {
    pub table: String,
    pub columns: Vec<String>,
    /// Ordered by sampled table name.
    pub restrictions: Vec<Restriction>,
}

impl CopyQuery {
    pub fn for_table(table: &Table) -> Self {
        Self {
            table: table.name.clone(),
            columns: table.column_names(),
            restrictions: table.restrictions().values().cloned().collect(),
        }
    }

    pub fn column_list(&self) -> String {
        column_list(self.columns.iter().map(String::as_str))
    }

    /// AND of every restriction clause, `None` when unrestricted.
    pub fn predicate(&self) -> Result<Option<String>, DumpError> {
        if self.restrictions.is_empty() {
            return Ok(None);
        }
        let clauses = self
            .restrictions
            .iter()
            .map(Restriction::clause)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(clauses.join(" AND ")))
    }

    pub fn select_sql(&self) -> Result<String, DumpError> {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.column_list(),
            qualified_table(&self.table)
        );
        if let Some(predicate) = self.predicate()? {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        Ok(sql)
    }

    /// Statement run against the source.
    pub fn to_sql(&self) -> Result<String, DumpError> {
        Ok(format!("COPY ({}) TO STDOUT", self.select_sql()?))
    }

    /// Statement written to the script ahead of the payload.
    pub fn header(&self) -> String {
        format!(
            "COPY {} ({}) FROM STDIN;\n",
            qualified_table(&self.table),
            self.column_list()
        )
    }
}

/// Write the complete `COPY` block of a full table and return its row count.
pub async fn copy_table<R, W>(reader: &R, table: &Table, out: &mut W) -> Result<u64, DumpError>
where
    R: RowReader + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let query = CopyQuery::for_table(table);
    // Render the predicate before anything is written for this table.
    query.to_sql()?;

    out.write_all(data_header(&table.name).as_bytes()).await?;
    out.write_all(query.header().as_bytes()).await?;
    let rows = reader.copy_out(&query, out).await?;
    out.write_all(END_OF_DATA.as_bytes()).await?;

    if query.restrictions.is_empty() {
        info!("{}: copied {} rows", table.name, rows);
    } else {
        info!(
            "{}: copied {} rows ({} restrictions)",
            table.name,
            rows,
            query.restrictions.len()
        );
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{schema::ColumnSchema, value::SqlValue};

    fn orders() -> Table {
        Table::new(
            "orders",
            vec![
                ColumnSchema::new("id", "integer"),
                ColumnSchema::new("user_id", "integer"),
                ColumnSchema::new("shop_id", "bigint"),
            ],
            Vec::new(),
        )
    }

    fn restriction(column: &str, ids: Vec<SqlValue>) -> Restriction {
        Restriction {
            column: column.to_string(),
            value_type: "integer".to_string(),
            ids,
        }
    }

    #[test]
    fn test_unrestricted_copy() {
        let query = CopyQuery::for_table(&orders());
        assert_eq!(query.predicate().unwrap(), None);
        assert_eq!(
            query.to_sql().unwrap(),
            "COPY (SELECT \"id\",\"user_id\",\"shop_id\" FROM public.\"orders\") TO STDOUT"
        );
        assert_eq!(
            query.header(),
            "COPY public.\"orders\" (\"id\",\"user_id\",\"shop_id\") FROM STDIN;\n"
        );
    }

    #[test]
    fn test_restrictions_are_anded_in_name_order() {
        let mut table = orders();
        table
            .add_restriction("users", restriction("user_id", vec![SqlValue::Int(1), SqlValue::Int(2)]))
            .unwrap();
        table
            .add_restriction("shops", restriction("shop_id", vec![SqlValue::Int(7)]))
            .unwrap();

        let query = CopyQuery::for_table(&table);
        assert_eq!(
            query.select_sql().unwrap(),
            "SELECT \"id\",\"user_id\",\"shop_id\" FROM public.\"orders\" \
             WHERE \"shop_id\" IN (7) AND \"user_id\" IN (1, 2)"
        );
    }

    #[test]
    fn test_empty_id_set_selects_nothing() {
        let mut table = orders();
        table.add_restriction("users", restriction("user_id", Vec::new())).unwrap();

        let query = CopyQuery::for_table(&table);
        assert!(query.select_sql().unwrap().ends_with(" WHERE FALSE"));
    }
}
