//! JSON file-backed ledger store
//!
//! The whole ledger lives in one pretty-printed JSON document. Every
//! operation takes a process-wide async mutex; writes go to a sibling temp
//! file which is then renamed over the original.

use crate::error::StoreError;
use crate::repository::LedgerStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use syndicate_domain::Ledger;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Ledger store persisted as a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
    default_wallet: String,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store for `path`
    ///
    /// The file is created lazily with a default ledger for `default_wallet`
    /// on first access.
    pub fn new(path: impl Into<PathBuf>, default_wallet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_wallet: default_wallet.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read the ledger, creating the default document if the file is absent.
    /// Caller must hold the lock.
    async fn read_or_init(&self) -> Result<Ledger, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Deserialization(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let ledger = Ledger::default_with_wallet(self.default_wallet.clone());
                self.write_atomic(&ledger).await?;
                info!(path = %self.path.display(), "Initialized new ledger");
                Ok(ledger)
            },
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    /// Replace the ledger file. Caller must hold the lock.
    async fn write_atomic(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(ledger)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &body).await.map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        debug!(path = %self.path.display(), bytes = body.len(), "Ledger saved");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for JsonFileStore {
    async fn load(&self) -> Result<Ledger, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_or_init().await
    }

    async fn mutate<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let mut ledger = self.read_or_init().await?;
        let out = f(&mut ledger)?;
        self.write_atomic(&ledger).await?;
        Ok(out)
    }
}
