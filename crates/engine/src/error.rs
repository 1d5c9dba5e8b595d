//! The module contains the errors the ledger engine can surface.
//!
//! `Conflict` is internal: it marks a failed optimistic revision check and is
//! converted into a retry by the commit loop. Callers only ever see
//! `ConflictExceeded`, raised when the retry budget runs out.

use sea_orm::DbErr;
use thiserror::Error;

/// Ledger engine errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("not allowed: {0}")]
    Unauthorized(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("write conflict retries exhausted: {0}")]
    ConflictExceeded(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Database(DbErr),
}

impl From<DbErr> for LedgerError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
                Self::StoreUnavailable(err.to_string())
            }
            other => Self::Database(other),
        }
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::InvalidArgument(a), Self::InvalidArgument(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::ConflictExceeded(a), Self::ConflictExceeded(b)) => a == b,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
