use thiserror::Error;

// ---------------------------------------------------------------------------
// QueryError – every failure the data layer can report
// ---------------------------------------------------------------------------

/// Errors raised by the loader and the query engine.
///
/// None of these are fatal to the server: `DataUnavailable` degrades to an
/// empty table, `MissingColumn` drops the affected output field.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The backing file is missing or could not be parsed.
    #[error("data source '{source_id}' unavailable: {reason}")]
    DataUnavailable { source_id: String, reason: String },

    /// A referenced column is not part of the table's schema.
    #[error("column not found: {0}")]
    MissingColumn(String),

    /// A row did not carry one value per column.
    #[error("row has {actual} values but the table has {expected} columns")]
    ArityMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, QueryError>;
