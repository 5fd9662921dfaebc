//! Agent Syndicate Connectors
//!
//! Adapters for the swap-routing service (Jupiter) and the chain RPC node
//! (Solana RPC). Each validates responses at the boundary and maps its
//! own error type onto the execution layer's ports.

#![warn(clippy::all)]

// Public modules
pub mod amount;
pub mod jupiter_quote;
pub mod jupiter_ultra;
pub mod solana_rpc;

// Re-exports
pub use jupiter_quote::{JupiterQuoteClient, DEFAULT_QUOTE_URL};
pub use jupiter_ultra::{JupiterError, JupiterUltraClient, DEFAULT_ULTRA_URL};
pub use solana_rpc::{RpcError, SolanaRpcClient};
