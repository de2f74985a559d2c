use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{errors::DumpError, models::table::Table};

/// Drop statements for one table, followed by a blank separator line.
pub fn drop_block(table: &Table) -> String {
    let mut block: String = table
        .foreign_keys
        .iter()
        .map(|fk| fk.drop_statement())
        .collect();
    block.push('\n');
    block
}

/// Recreate statements for one table, followed by a blank separator line.
pub fn create_block(table: &Table) -> String {
    let mut block: String = table
        .foreign_keys
        .iter()
        .map(|fk| fk.create_statement())
        .collect();
    block.push('\n');
    block
}

/// Write the drop block of every table. Returns the number of constraints.
pub async fn drop_constraints<W>(tables: &[&Table], out: &mut W) -> Result<usize, DumpError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut count = 0;
    for table in tables {
        out.write_all(drop_block(table).as_bytes()).await?;
        count += table.foreign_keys.len();
    }
    Ok(count)
}

/// Write the recreate block of every table. Returns the number of constraints.
pub async fn recreate_constraints<W>(tables: &[&Table], out: &mut W) -> Result<usize, DumpError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut count = 0;
    for table in tables {
        out.write_all(create_block(table).as_bytes()).await?;
        count += table.foreign_keys.len();
    }
    Ok(count)
}
