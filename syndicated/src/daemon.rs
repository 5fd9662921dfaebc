//! Daemon: main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Ledger store (JSON document)
//! - Swap orchestrator (routing venue, signer, submission engine, settlement)
//! - API server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Initialize components
//! 3. Open (or create) the ledger
//! 4. Start API server
//! 5. Graceful shutdown on SIGINT; in-flight deposits are cancelled

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use syndicate_connectors::{JupiterQuoteClient, JupiterUltraClient, SolanaRpcClient};
use syndicate_exec::{
    CancellationToken, ChainPort, EngineConfig, ExecutionJournal, Keypair, OrchestratorConfig,
    SettlementRecorder, SubmissionEngine, SwapOrchestrator, Venue,
};
use syndicate_store::{JsonFileStore, LedgerStore};

use crate::api::{create_router, ApiState, DepositSettings};
use crate::config::{Config, RoutingMode};
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Daemon
// =============================================================================

/// The syndicate daemon.
pub struct Daemon<C: ChainPort + 'static, S: LedgerStore + 'static> {
    /// Configuration
    config: Config,
    /// Shared API state
    state: Arc<ApiState<C, S>>,
}

impl Daemon<SolanaRpcClient, JsonFileStore> {
    /// Build production components from configuration.
    pub fn from_config(config: Config) -> DaemonResult<Self> {
        let keypair = Arc::new(Keypair::from_json(config.secret_key.expose())?);
        let chain = Arc::new(SolanaRpcClient::new(config.rpc_url.clone()));
        let store = Arc::new(JsonFileStore::new(
            config.ledger_path.clone(),
            keypair.pubkey_base58(),
        ));

        let routing = &config.routing;
        let venue = match routing.mode {
            RoutingMode::Ultra => {
                let api_key = routing.api_key.clone().ok_or_else(|| {
                    DaemonError::Config("JUPITER_API_KEY is required in ultra routing mode".to_string())
                })?;
                Venue::Ultra(Arc::new(JupiterUltraClient::with_base_url(
                    routing.ultra_url.clone(),
                    api_key,
                )))
            },
            RoutingMode::Quote => {
                let mut client = JupiterQuoteClient::new(routing.quote_url.clone());
                if let Some(key) = routing.api_key.clone() {
                    client = client.with_api_key(key);
                }
                Venue::QuoteSwap {
                    quotes: Arc::new(client),
                    slippage_bps: routing.slippage_bps,
                }
            },
        };

        Ok(Self::new(config, venue, keypair, chain, store))
    }
}

impl<C: ChainPort + 'static, S: LedgerStore + 'static> Daemon<C, S> {
    /// Create a new daemon with provided components.
    pub fn new(
        config: Config,
        venue: Venue,
        keypair: Arc<Keypair>,
        chain: Arc<C>,
        store: Arc<S>,
    ) -> Self {
        let wallet = keypair.pubkey_base58();
        let engine = SubmissionEngine::new(
            chain.clone(),
            Arc::new(ExecutionJournal::new()),
            EngineConfig {
                confirm_timeout: config.execution.confirm_timeout,
                ..EngineConfig::default()
            },
        );
        let settlement = SettlementRecorder::new(store.clone(), chain, wallet);
        let orchestrator = SwapOrchestrator::new(
            venue,
            keypair,
            engine,
            settlement,
            OrchestratorConfig {
                leg_pause: config.execution.leg_pause,
            },
        );

        let state = Arc::new(ApiState {
            store,
            orchestrator: Arc::new(orchestrator),
            deposit: DepositSettings {
                lamports: config.execution.deposit_lamports,
                agent_id: config.execution.agent_id,
            },
            deposit_lock: Mutex::new(None),
            shutdown: CancellationToken::new(),
        });

        Self { config, state }
    }

    /// Shared API state.
    pub fn state(&self) -> Arc<ApiState<C, S>> {
        self.state.clone()
    }

    /// Token cancelled when the daemon shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// HTTP router over the shared state.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Run the daemon on the configured address.
    ///
    /// This method blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> DaemonResult<()> {
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        let shutdown = self.shutdown_token();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
            }
            shutdown.cancel();
        });

        self.serve(listener).await
    }

    /// Serve the API on `listener` until the shutdown token is cancelled.
    pub async fn serve(self, listener: TcpListener) -> DaemonResult<()> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| DaemonError::Server(format!("Failed to get local address: {}", e)))?;

        // Creates the ledger document on first start
        let ledger = self.state.store.load().await?;
        info!(
            version = env!("CARGO_PKG_VERSION"),
            %local_addr,
            routing_mode = %self.config.routing.mode,
            wallet = %ledger.treasury.wallet,
            members = ledger.members.len(),
            trades = ledger.trades.len(),
            "Syndicate daemon started"
        );

        let shutdown = self.shutdown_token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        info!("Syndicate daemon stopped");
        Ok(())
    }
}
