//! Daemon error types.

use syndicate_domain::DomainError;
use syndicate_exec::ExecError;
use syndicate_store::StoreError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid request payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A deposit is already running
    #[error("A deposit is already in progress")]
    DepositInProgress,

    /// A partial deposit holds intermediate funds; retry it first
    #[error("A partial deposit holds {held_intermediate} intermediate base units, retry it first")]
    PartialPending { held_intermediate: u64 },

    /// No partial deposit to retry
    #[error("No partial deposit to retry")]
    NothingToRetry,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
