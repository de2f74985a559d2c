//! Identifier and literal quoting for generated SQL.
//!
//! Table and column names cannot be bound as parameters, so they are always
//! double-quoted here. Data values only go through [`quote_literal`] on paths
//! that produce script text (`INSERT` blocks and `COPY` predicates).

/// Schema every exported table lives in.
pub const SCHEMA: &str = "public";

/// Double-quote an identifier, doubling any embedded `"`.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schema-qualified, quoted table name: `public."orders"`.
pub fn qualified_table(name: &str) -> String {
    format!("{}.{}", SCHEMA, quote_ident(name))
}

/// Single-quote a string literal, doubling any embedded `'`.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Comma-joined quoted column list, in the order given.
pub fn column_list<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    columns
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("Order"), "\"Order\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_qualified_table() {
        assert_eq!(qualified_table("orders"), "public.\"orders\"");
    }

    #[test]
    fn test_quote_literal_doubles_quotes() {
        assert_eq!(quote_literal("a"), "'a'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_column_list_keeps_order() {
        assert_eq!(column_list(["id", "user_id", "select"]), "\"id\",\"user_id\",\"select\"");
    }
}
