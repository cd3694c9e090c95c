//! Core error types

use paygate_store::StoreError;
use thiserror::Error;

/// Errors produced by the orchestration layer.
///
/// The HTTP surface maps these onto status codes: `Validation`,
/// `Dependency` and `Precondition` become 400, `NotFound` 404, the rest
/// 500. Channel processing failures never reach this enum; they decline
/// the transaction instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Dependency(String),

    #[error("{0}")]
    Precondition(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("plugin registry error: {0}")]
    Registry(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for orchestration operations
pub type CoreResult<T> = Result<T, CoreError>;
