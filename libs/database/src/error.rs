use sea_orm::{ConnAcquireErr, DbErr, SqlErr};

/// Store failure, classified by what a caller can do about it.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// A row would have broken a UNIQUE constraint
    #[error("Unique constraint violated")]
    UniqueViolation,

    /// No pooled connection became available in time
    #[error("Timed out acquiring a database connection")]
    Timeout,

    /// Connection could not be established after retries
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Anything else reported by SeaORM
    #[error("PostgreSQL error: {0}")]
    Postgres(DbErr),
}

impl DatabaseError {
    /// Sort a SeaORM error into the variants above.
    pub fn classify(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return DatabaseError::UniqueViolation;
        }

        match err {
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => DatabaseError::Timeout,
            other => DatabaseError::Postgres(other),
        }
    }

    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatabaseError::Timeout | DatabaseError::ConnectionFailed(_)
        )
    }
}

impl From<DbErr> for DatabaseError {
    fn from(err: DbErr) -> Self {
        DatabaseError::classify(err)
    }
}

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
