//! Agent Syndicate Execution Layer
//!
//! Swap execution and settlement: order → sign → submit → confirm → record.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator → Order/Quote Port → Signer → Submission Engine → Settlement → Ledger
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits for the routing service and chain RPC
//! - **Signer**: Treasury keypair and transaction signing
//! - **Submission Engine**: Execute, fall back to broadcast, confirm
//! - **Execution Journal**: At-most-once use of routing request ids
//! - **Settlement**: Trade records and treasury balances
//! - **Orchestrator**: Two-leg conversions with partial-failure handling
//! - **Stub**: Test implementations for development
//!
//! # Example
//!
//! ```rust,ignore
//! use syndicate_exec::*;
//! use syndicate_store::MemoryStore;
//! use std::sync::Arc;
//!
//! let chain = Arc::new(StubChain::new(0));
//! let keypair = Arc::new(Keypair::from_seed(&[1u8; 32])?);
//! let store = Arc::new(MemoryStore::new(keypair.pubkey_base58()));
//!
//! let engine = SubmissionEngine::new(chain.clone(), Arc::new(ExecutionJournal::new()), EngineConfig::default());
//! let settlement = SettlementRecorder::new(store, chain, keypair.pubkey_base58());
//! let orchestrator = SwapOrchestrator::new(
//!     Venue::Ultra(Arc::new(StubRouting::new())),
//!     keypair,
//!     engine,
//!     settlement,
//!     OrchestratorConfig::default(),
//! );
//!
//! let outcome = orchestrator.deposit(1_000_000_000, 896, &CancellationToken::new()).await?;
//! ```

#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod journal;
pub mod orchestrator;
pub mod ports;
pub mod settlement;
pub mod signer;
pub mod stub;

// Re-exports for convenience
pub use engine::{EngineConfig, Submission, SubmissionEngine, SubmissionPath};
pub use error::{ExecError, ExecResult};
pub use journal::{ExecutionEntry, ExecutionJournal, ExecutionState};
pub use orchestrator::{
    LegOutcome, OrchestratorConfig, SwapOrchestrator, TradeContext, TwoLegOutcome, Venue,
    SEED_DEPOSIT_THESIS,
};
pub use ports::{
    ChainPort, Commitment, ExecuteOutcome, ExecuteReply, Order, OrderPort, Quote, QuotePort,
    SendOptions, SignatureStatus,
};
pub use settlement::{SettlementRecorder, TreasuryDelta};
pub use signer::{decode_transaction, sign_transaction, transaction_id, Keypair, SignedTransaction};
pub use stub::{ConfirmMode, ExecuteMode, StubChain, StubQuoteRouting, StubRouting};
pub use tokio_util::sync::CancellationToken;
