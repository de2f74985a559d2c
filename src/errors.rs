use thiserror::Error;

/// Error type for every stage of a dump run.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Query failure reported by the driver.
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    /// Invalid or missing configuration, detected before connecting.
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Connection error: {0}")]
    Connection(String),
    /// Table, column or constraint metadata is missing or unusable.
    #[error("Catalog error: {0}")]
    Catalog(String),
    /// The same sampled table was attached twice to one full table.
    #[error("Table \"{table}\" is already restricted by sampled table \"{referenced}\"")]
    DuplicateRestriction { table: String, referenced: String },
    /// A value could not be rendered as a SQL literal.
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Export error: {0}")]
    Export(String),
    #[error("Schema sync error: {0}")]
    SchemaSync(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DumpError {
    /// Errors that come from how the run was set up rather than from the
    /// database or the output sink. Retrying will not help; the configuration
    /// has to change.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DumpError::Config(_) | DumpError::DuplicateRestriction { .. }
        )
    }
}

impl From<serde_json::Error> for DumpError {
    fn from(e: serde_json::Error) -> Self {
        DumpError::Encoding(e.to_string())
    }
}
