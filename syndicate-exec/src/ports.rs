//! Execution layer port definitions.
//!
//! Ports define the interfaces for external services: the swap-routing
//! service (order/execute or quote/swap shapes) and the chain RPC node.
//! Adapters implement these ports for Jupiter, Solana RPC and stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use syndicate_domain::Mint;

use crate::error::ExecError;

// =============================================================================
// Order Port (order + execute shape)
// =============================================================================

/// Port for a routing service that prices, builds and executes swaps.
///
/// Implementations:
/// - `StubRouting` - For testing
/// - `JupiterUltraClient` - Jupiter Ultra API
#[async_trait]
pub trait OrderPort: Send + Sync {
    /// Request a priced order with an unsigned transaction for `taker`.
    ///
    /// # Errors
    ///
    /// `ExecError::RoutingService` on non-success status or when the
    /// response lacks a usable transaction.
    async fn request_order(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        taker: &str,
    ) -> Result<Order, ExecError>;

    /// Hand a signed transaction back to the service for execution.
    ///
    /// Returns the reply whatever its HTTP status; only transport failures
    /// are errors.
    async fn execute(
        &self,
        signed_transaction_b64: &str,
        request_id: &str,
    ) -> Result<ExecuteReply, ExecError>;
}

/// Priced order with an unsigned transaction. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Input mint
    pub input_mint: Mint,
    /// Output mint
    pub output_mint: Mint,
    /// Input amount (base units)
    pub in_amount: u64,
    /// Quoted output amount (base units)
    pub out_amount: u64,
    /// Unsigned transaction wire bytes
    pub transaction: Vec<u8>,
    /// Routing request id, required by the execute endpoint
    pub request_id: String,
}

/// Raw reply from the execute endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteReply {
    /// HTTP status code
    pub http_status: u16,
    /// Transaction signature, if the service reported one
    pub signature: Option<String>,
    /// Service status string (e.g. "Success", "Failed")
    pub status: Option<String>,
    /// Actual output amount, if reported
    pub total_output_amount: Option<u64>,
    /// Service error message, if any
    pub error: Option<String>,
    /// Raw response body
    pub raw_body: String,
}

/// Classified execute reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Service submitted the transaction and reported its signature
    ServiceConfirmed {
        /// Transaction signature
        signature: String,
        /// Actual output amount, if reported
        total_output: Option<u64>,
    },
    /// Service explicitly refused (failure status or non-success HTTP)
    ServiceRejected {
        /// Raw response body
        body: String,
    },
    /// Neither a signature nor an explicit failure
    Ambiguous {
        /// Raw response body
        body: String,
    },
}

/// Execute status string meaning the service gave up on the transaction
pub const EXECUTE_STATUS_FAILED: &str = "Failed";

impl ExecuteOutcome {
    /// Classify an execute reply.
    ///
    /// An explicit failure status wins over a reported signature.
    pub fn classify(reply: &ExecuteReply) -> Self {
        if !(200..300).contains(&reply.http_status) {
            return Self::ServiceRejected {
                body: reply.raw_body.clone(),
            };
        }
        if reply.status.as_deref() == Some(EXECUTE_STATUS_FAILED) {
            return Self::ServiceRejected {
                body: reply.raw_body.clone(),
            };
        }
        match reply.signature.as_deref().map(str::trim) {
            Some(sig) if !sig.is_empty() => Self::ServiceConfirmed {
                signature: sig.to_string(),
                total_output: reply.total_output_amount,
            },
            _ => Self::Ambiguous {
                body: reply.raw_body.clone(),
            },
        }
    }
}

// =============================================================================
// Quote Port (quote + swap shape)
// =============================================================================

/// Port for a routing service that quotes and builds swaps but does not
/// execute them.
///
/// Implementations:
/// - `StubQuoteRouting` - For testing
/// - `JupiterQuoteClient` - Jupiter v6 quote/swap API
#[async_trait]
pub trait QuotePort: Send + Sync {
    /// Price a conversion.
    async fn get_quote(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ExecError>;

    /// Build the unsigned swap transaction for a quote.
    async fn build_swap_transaction(&self, quote: &Quote, taker: &str)
        -> Result<Vec<u8>, ExecError>;
}

/// Priced estimate. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Input mint
    pub input_mint: Mint,
    /// Output mint
    pub output_mint: Mint,
    /// Input amount (base units)
    pub in_amount: u64,
    /// Quoted output amount (base units)
    pub out_amount: u64,
    /// Slippage tolerance in basis points
    pub slippage_bps: u16,
    /// Quote document exactly as returned, echoed to the swap endpoint
    pub raw: serde_json::Value,
}

// =============================================================================
// Chain Port
// =============================================================================

/// Port for the chain RPC node.
///
/// Implementations:
/// - `StubChain` - For testing
/// - `SolanaRpcClient` - Solana JSON-RPC
#[async_trait]
pub trait ChainPort: Send + Sync {
    /// Native balance of `address` in base units (lamports).
    async fn get_balance(&self, address: &str) -> Result<u64, ExecError>;

    /// Broadcast a signed transaction; returns its signature.
    async fn send_transaction(
        &self,
        transaction: &[u8],
        options: &SendOptions,
    ) -> Result<String, ExecError>;

    /// Current status of a signature, `None` if the node has not seen it.
    async fn signature_status(&self, signature: &str)
        -> Result<Option<SignatureStatus>, ExecError>;
}

/// Commitment level, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the connected node
    Processed,
    /// Voted on by a supermajority
    Confirmed,
    /// Rooted
    Finalized,
}

impl Commitment {
    /// RPC wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

/// Options for `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// Skip the node's simulation step
    pub skip_preflight: bool,
    /// Commitment used for preflight simulation
    pub preflight_commitment: Commitment,
    /// Node-side rebroadcast attempts
    pub max_retries: Option<u32>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: Commitment::Confirmed,
            max_retries: Some(3),
        }
    }
}

/// Status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// Slot the transaction landed in
    pub slot: u64,
    /// Commitment reached, if any
    pub confirmation: Option<Commitment>,
    /// Chain-reported execution error
    pub err: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
