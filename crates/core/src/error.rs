//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// stock rules, integrity pre-flight checks). Infrastructure concerns (disk,
/// database engine) belong to the store and backup crates, which wrap this type
/// so callers can never mistake "stock too low" for "disk full".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing or malformed business input (empty motive, zero quantity, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An exit or transfer asked for more than the row holds.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { available: i64, requested: i64 },

    /// The targeted row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Blocked by existing dependents (e.g. items still referencing a category).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The operation would duplicate something that must be unique.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn insufficient_stock(available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            available,
            requested,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
