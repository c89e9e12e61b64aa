use thiserror::Error;

/// Failures surfaced by [`crate::db::Store`]. Nothing here is retried internally.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file or engine could not be opened.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool: {0}")]
    Pool(#[from] deadpool_sqlite::PoolError),

    /// The blocking task running the statement panicked or was aborted.
    #[error("storage call aborted: {0}")]
    Interact(String),
}

impl From<deadpool_sqlite::InteractError> for StoreError {
    fn from(error: deadpool_sqlite::InteractError) -> Self {
        StoreError::Interact(error.to_string())
    }
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) | StoreError::Pool(_) => "storage_unavailable",
            StoreError::Sqlite(_) | StoreError::Interact(_) => "storage_error",
        }
    }
}
