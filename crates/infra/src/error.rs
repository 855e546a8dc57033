use thiserror::Error;

use larder_auth::AccessError;
use larder_core::DomainError;
use larder_inventory::{AggregationError, UsageError};

/// Failure of a kitchen service operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    /// An in-memory store lock was poisoned by a panicking writer.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Message safe to return to the caller.
    ///
    /// Missing records and refusals share one message so callers cannot discover
    /// ids they have no access to.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Access(e) => e.public_message().to_string(),
            ServiceError::Domain(DomainError::NotFound(_)) => "access denied".to_string(),
            ServiceError::Domain(e) => e.to_string(),
            ServiceError::Aggregation(_) => "inventory data is inconsistent".to_string(),
            ServiceError::Usage(e) => e.to_string(),
            ServiceError::Storage(_) => "service unavailable".to_string(),
        }
    }

    pub fn is_denial(&self) -> bool {
        match self {
            ServiceError::Access(e) => e.is_denial(),
            ServiceError::Domain(DomainError::NotFound(_)) => true,
            _ => false,
        }
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        ServiceError::Storage(format!("{what} lock poisoned"))
    }
}
