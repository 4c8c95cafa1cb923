use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// Positional access past the end of the scoped result set. Callers are
    /// expected to check `count()` first, so this is a contract violation.
    #[error("Index {index} out of range for {entity} scope of {count} rows")]
    IndexOutOfRange {
        entity: &'static str,
        index: usize,
        count: usize,
    },

    #[error("Entity not found: {entity_type} with key {key}")]
    NotFound { entity_type: &'static str, key: i64 },

    #[error("Upsert wrote no {0} row")]
    NothingWritten(&'static str),

    #[error("Validation rejected {0}")]
    ValidationFailed(&'static str),
}

impl LibraryError {
    /// Errors caused by misuse of the store rather than by storage.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, LibraryError::IndexOutOfRange { .. })
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
