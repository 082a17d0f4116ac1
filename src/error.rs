use thiserror::Error;

/// A field constraint was violated. Raised before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The backing store failed underneath us.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
    #[error("Store lock poisoned by a panicked writer")]
    LockPoisoned,
    #[error("Invalid sample data: {0}")]
    SampleData(#[from] chrono::ParseError),
}

/// Every failure a store operation can report. The three kinds stay apart so
/// the caller can answer each one differently.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Todo not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(StorageError::SqliteError(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
