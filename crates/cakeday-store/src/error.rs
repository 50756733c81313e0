use thiserror::Error;

/// All store-layer errors. The notification cycle only cares whether a read
/// failed; the admin CLI also distinguishes missing rows and duplicates.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite read or write failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A UNIQUE or FOREIGN KEY constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A thread panicked while holding the connection.
    #[error("Database connection lock poisoned")]
    LockPoisoned,

    /// The blocking-pool task running a query panicked or was cancelled.
    #[error("Store task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Turn constraint violations into [`StoreError::Conflict`]; everything else
/// stays a query failure.
pub(crate) fn conflict_or_query(e: rusqlite::Error, what: &str) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let reason = match f.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => "already exists",
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => "references a missing row",
                _ => "violates a constraint",
            };
            StoreError::Conflict(format!("{what} {reason}"))
        }
        other => StoreError::QueryFailed(other),
    }
}
