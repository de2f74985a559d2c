use log::{debug, warn};

use crate::{
    errors::DumpError,
    models::table::{Restriction, Table},
};

/// Column names a table would use to reference `sampled`: `<sampled>_id`,
/// then `<singular>_id` when the name ends in a plain `s`.
pub fn fk_column_candidates(sampled: &str) -> Vec<String> {
    let mut candidates = vec![format!("{}_id", sampled)];
    if let Some(singular) = sampled.strip_suffix('s') {
        if !singular.is_empty() && !singular.ends_with('s') {
            candidates.push(format!("{}_id", singular));
        }
    }
    candidates
}

/// Restrict every full table that references a sampled table to the rows
/// whose reference is among the sampled ids. Returns how many restrictions
/// were attached.
///
/// Every sampled table must already have been dumped.
pub fn apply_restrictions(sampled: &[Table], full: &mut [Table]) -> Result<usize, DumpError> {
    let mut attached = 0;

    for source in sampled {
        let ids = source.captured_ids().ok_or_else(|| {
            DumpError::Export(format!(
                "sampled table \"{}\" must be dumped before filtering",
                source.name
            ))
        })?;
        let value_type = source.id_column()?.data_type.clone();
        let candidates = fk_column_candidates(&source.name);

        for table in full.iter_mut() {
            let Some(column) = candidates.iter().find(|c| table.has_column(c)) else {
                continue;
            };
            if ids.is_empty() {
                warn!(
                    "{}: no rows sampled from {}, no rows will be exported",
                    table.name, source.name
                );
            }
            debug!(
                "{}.{} restricted to {} ids of {}",
                table.name,
                column,
                ids.len(),
                source.name
            );
            table.add_restriction(
                &source.name,
                Restriction {
                    column: column.clone(),
                    value_type: value_type.clone(),
                    ids: ids.to_vec(),
                },
            )?;
            attached += 1;
        }
    }

    Ok(attached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{schema::ColumnSchema, table::IdSelector, value::SqlValue};

    fn sampled(name: &str, ids: Vec<SqlValue>) -> Table {
        let mut table = Table::new(name, vec![ColumnSchema::new("id", "integer")], Vec::new())
            .sampled(2, IdSelector::default());
        table.set_captured_ids(ids).unwrap();
        table
    }

    fn full(name: &str, columns: &[&str]) -> Table {
        Table::new(
            name,
            columns.iter().map(|c| ColumnSchema::new(c, "integer")).collect(),
            Vec::new(),
        )
    }

    #[test]
    fn test_candidates() {
        assert_eq!(fk_column_candidates("users"), vec!["users_id", "user_id"]);
        assert_eq!(fk_column_candidates("account"), vec!["account_id"]);
        assert_eq!(fk_column_candidates("address"), vec!["address_id"]);
    }

    #[test]
    fn test_conventional_column_is_restricted() {
        let users = sampled("users", vec![SqlValue::Int(1), SqlValue::Int(2)]);
        let mut tables = vec![full("orders", &["id", "users_id"]), full("products", &["id"])];

        let attached = apply_restrictions(&[users], &mut tables).unwrap();

        assert_eq!(attached, 1);
        let restriction = &tables[0].restrictions()["users"];
        assert_eq!(restriction.column, "users_id");
        assert_eq!(restriction.ids, vec![SqlValue::Int(1), SqlValue::Int(2)]);
        assert!(tables[1].restrictions().is_empty());
    }

    #[test]
    fn test_singular_column_is_restricted() {
        let users = sampled("users", vec![SqlValue::Int(1), SqlValue::Int(2)]);
        let mut tables = vec![full("orders", &["id", "user_id"])];

        apply_restrictions(&[users], &mut tables).unwrap();

        assert_eq!(
            tables[0].restrictions()["users"].clause().unwrap(),
            "\"user_id\" IN (1, 2)"
        );
    }

    #[test]
    fn test_restrictions_accumulate_across_sampled_tables() {
        let users = sampled("users", vec![SqlValue::Int(1)]);
        let shops = sampled("shops", vec![SqlValue::Int(9)]);
        let mut tables = vec![full("orders", &["id", "user_id", "shop_id"])];

        let attached = apply_restrictions(&[users, shops], &mut tables).unwrap();

        assert_eq!(attached, 2);
        let keys: Vec<_> = tables[0].restrictions().keys().cloned().collect();
        assert_eq!(keys, vec!["shops", "users"]);
    }

    #[test]
    fn test_undumped_sampled_table_is_rejected() {
        let users = Table::new("users", vec![ColumnSchema::new("id", "integer")], Vec::new())
            .sampled(2, IdSelector::default());
        let mut tables = vec![full("orders", &["user_id"])];

        let err = apply_restrictions(&[users], &mut tables).unwrap_err();
        assert!(matches!(err, DumpError::Export(_)));
    }

    #[test]
    fn test_empty_sample_still_restricts() {
        let users = sampled("users", Vec::new());
        let mut tables = vec![full("orders", &["user_id"])];

        apply_restrictions(&[users], &mut tables).unwrap();

        assert_eq!(tables[0].restrictions()["users"].clause().unwrap(), "FALSE");
    }

    #[test]
    fn test_same_sampled_table_twice_is_duplicate() {
        let users = sampled("users", vec![SqlValue::Int(1)]);
        let mut tables = vec![full("orders", &["user_id"])];

        apply_restrictions(std::slice::from_ref(&users), &mut tables).unwrap();
        let err = apply_restrictions(&[users], &mut tables).unwrap_err();
        assert!(err.is_caller_error());
    }
}
