//! Agent Syndicate Daemon Library
//!
//! HTTP front end for the syndicate treasury: ledger reads, thesis
//! evaluation and the SOL → USDC → piggyUSDC seed deposit.
//!
//! # Architecture
//!
//! ```text
//! HTTP → API Server → Swap Orchestrator → Routing Service / Chain RPC
//!             ↓               ↓
//!        Ledger Store ← Settlement Recorder
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use syndicated::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     Daemon::from_config(config)?.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;

// Re-exports for convenience
pub use api::{create_router, ApiState, DepositSettings, API_PREFIX};
pub use config::{ApiConfig, Config, ExecutionConfig, RoutingConfig, RoutingMode, SecretKey};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
