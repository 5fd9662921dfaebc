//! Execution layer error types.

use thiserror::Error;

/// Errors that can occur while converting assets.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Routing service returned a non-success status or an unusable body
    #[error("Routing service error (HTTP {status}): {body}")]
    RoutingService {
        /// HTTP status (0 when the request never completed)
        status: u16,
        /// Raw response body or transport error
        body: String,
    },

    /// Transaction bytes could not be parsed or signed
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    /// Routing service explicitly refused to execute
    #[error("Execution rejected: {body}")]
    ExecutionRejected {
        /// Raw execute response or transport error
        body: String,
    },

    /// Direct broadcast failed on every attempt
    #[error("Broadcast failed after {attempts} attempts: {last_error}")]
    Broadcast {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last_error: String,
    },

    /// Submitted but not confirmed within the wait window
    #[error("Transaction {signature} submitted but not confirmed")]
    ConfirmationTimeout {
        /// Transaction signature
        signature: String,
    },

    /// Chain reported an execution error for the transaction
    #[error("Transaction {signature} failed on chain: {reason}")]
    TransactionFailed {
        /// Transaction signature
        signature: String,
        /// Chain-reported error
        reason: String,
    },

    /// Routing request id was already sent to the execute endpoint
    #[error("Request already executed: {0}")]
    AlreadyExecuted(String),

    /// Execution journal error
    #[error("Execution journal error: {0}")]
    Journal(String),

    /// Chain RPC error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Operation cancelled before it started
    #[error("Cancelled")]
    Cancelled,

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] syndicate_store::StoreError),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] syndicate_domain::DomainError),
}

impl ExecError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::RoutingService { .. } => "routing_service",
            Self::MalformedTransaction(_) => "malformed_transaction",
            Self::ExecutionRejected { .. } => "execution_rejected",
            Self::Broadcast { .. } => "broadcast",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::AlreadyExecuted(_) => "already_executed",
            Self::Journal(_) => "journal",
            Self::Rpc(_) => "rpc",
            Self::Cancelled => "cancelled",
            Self::Store(_) => "store",
            Self::Domain(_) => "domain",
        }
    }

    /// Create a routing service error
    pub fn routing(status: u16, body: impl Into<String>) -> Self {
        Self::RoutingService {
            status,
            body: body.into(),
        }
    }
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
