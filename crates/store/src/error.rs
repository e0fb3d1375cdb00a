//! Store error model: business rejections vs infrastructure failures.

use swagstock_core::DomainError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Every failure a store operation can report.
///
/// `Rejected` carries an expected business outcome (stock too low, empty
/// motive, category still in use); nothing was written. Every other variant is
/// an infrastructure failure and has already been logged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("data file i/o error in {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("database connection is closed")]
    Closed,

    #[error("corrupt value in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

impl StoreError {
    /// `true` for expected business outcomes, `false` for infrastructure failures.
    pub fn is_business(&self) -> bool {
        matches!(self, StoreError::Rejected(_))
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            StoreError::Rejected(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn corrupt(table: &'static str, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        tracing::error!(table, %detail, "corrupt value in data file");
        StoreError::Corrupt { table, detail }
    }
}

/// Translate an engine error, turning constraint violations into business
/// rejections so callers get an actionable message instead of raw engine text.
pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    use sqlx::error::ErrorKind;

    match err {
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::ForeignKeyViolation => StoreError::Rejected(DomainError::integrity(format!(
                "{operation}: a referenced row is missing or still has dependents"
            ))),
            ErrorKind::UniqueViolation => StoreError::Rejected(DomainError::conflict(format!(
                "{operation}: {}",
                db_err.message()
            ))),
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                StoreError::Rejected(DomainError::validation(format!(
                    "{operation}: {}",
                    db_err.message()
                )))
            }
            _ => {
                tracing::error!(operation, error = %db_err, "database error");
                StoreError::Database {
                    operation,
                    source: sqlx::Error::Database(db_err),
                }
            }
        },
        sqlx::Error::PoolClosed => {
            tracing::error!(operation, "database connection is closed");
            StoreError::Closed
        }
        other => {
            tracing::error!(operation, error = %other, "database error");
            StoreError::Database {
                operation,
                source: other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_business_outcomes() {
        let err = StoreError::from(DomainError::insufficient_stock(10, 50));
        assert!(err.is_business());
        assert_eq!(err.domain(), Some(&DomainError::insufficient_stock(10, 50)));
    }

    #[test]
    fn closed_pool_is_infrastructure() {
        let err = map_sqlx_error("get_item", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Closed));
        assert!(!err.is_business());
    }
}
