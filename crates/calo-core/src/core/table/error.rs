use thiserror::Error;

/// Data-shape errors raised while assembling or normalizing result tables.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Column '{name}' has {found} rows, but the table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column: '{0}'")]
    DuplicateColumn(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Ragged column '{name}' cannot be flattened: {reason}")]
    InvalidOffsets { name: String, reason: String },
}
