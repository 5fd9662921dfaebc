//! Agent Syndicate Storage Layer
//!
//! Durable ledger of treasury balances, members, theses and trades.
//!
//! # Architecture
//!
//! - **`LedgerStore` trait**: load plus exclusive mutate (port)
//! - **`JsonFileStore`**: single JSON document on disk, atomic replace
//! - **`MemoryStore`**: in-memory implementation for testing
//!
//! # Usage
//!
//! ```rust
//! use syndicate_store::{LedgerStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new("WalletPubkey");
//!     store.add_member(896, "treasurer").await.unwrap();
//!
//!     let ledger = store.load().await.unwrap();
//!     println!("Members: {}", ledger.members.len());
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod file;
mod memory;
mod repository;

// Re-exports
pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use repository::LedgerStore;
