use thiserror::Error;

use super::BoxFuture;
use crate::error::DomainError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
    #[error("stored record is malformed: {0}")]
    Corrupt(String),
}

impl From<DbError> for DomainError {
    fn from(err: DbError) -> Self {
        DomainError::Storage(err.to_string())
    }
}

/// Liveness probe for whichever backend holds the board data.
pub trait DbAdapter: Send + Sync {
    fn backend(&self) -> &'static str;
    fn health_check(&self) -> BoxFuture<'_, Result<(), DbError>>;
}
