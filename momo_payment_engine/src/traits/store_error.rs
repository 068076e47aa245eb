use thiserror::Error;

/// Failures of the backing store itself, as opposed to business-rule rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store was busy or unreachable within the configured timeouts. The caller may retry.
    #[error("The store is temporarily unavailable: {0}")]
    Transient(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

// SQLITE_BUSY, SQLITE_LOCKED and their extended codes
const BUSY_OR_LOCKED: [&str; 6] = ["5", "6", "261", "262", "517", "773"];

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => {
                Self::Transient(e.to_string())
            },
            sqlx::Error::Database(db) if db.code().is_some_and(|c| BUSY_OR_LOCKED.contains(&c.as_ref())) => {
                Self::Transient(e.to_string())
            },
            _ => Self::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pool_timeouts_are_retriable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retriable());
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_retriable());
        assert!(matches!(err, StoreError::Database(_)));
    }
}
