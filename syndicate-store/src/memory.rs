//! In-memory ledger store
//!
//! Used for testing and development without touching disk.

use crate::error::StoreError;
use crate::repository::LedgerStore;
use async_trait::async_trait;
use syndicate_domain::Ledger;
use tokio::sync::RwLock;

/// In-memory store for testing
pub struct MemoryStore {
    ledger: RwLock<Ledger>,
}

impl MemoryStore {
    /// Create a store holding a fresh default ledger
    pub fn new(wallet: impl Into<String>) -> Self {
        Self::with_ledger(Ledger::default_with_wallet(wallet))
    }

    /// Create a store holding `ledger`
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: RwLock::new(ledger),
        }
    }

    /// Number of recorded trades
    pub async fn trade_count(&self) -> usize {
        self.ledger.read().await.trades.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("")
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load(&self) -> Result<Ledger, StoreError> {
        Ok(self.ledger.read().await.clone())
    }

    async fn mutate<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = self.ledger.write().await;
        // Work on a copy so a failing closure leaves no partial change
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        *guard = draft;
        Ok(out)
    }
}
