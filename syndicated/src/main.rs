//! Agent Syndicate Daemon
//!
//! # Usage
//!
//! ```bash
//! SOLANA_RPC_URL=https://api.mainnet-beta.solana.com \
//! SOLANA_PRIVATE_KEY="[...]" JUPITER_API_KEY=... cargo run -p syndicated
//! ```
//!
//! # Environment Variables
//!
//! - `SOLANA_RPC_URL`, `SOLANA_PRIVATE_KEY`: required
//! - `JUPITER_API_KEY`: required in ultra mode
//! - `PORT` (default: 3000), `SYNDICATE_API_HOST` (default: 0.0.0.0)
//! - `SYNDICATE_LEDGER_PATH` (default: syndicate_ledger.json)
//! - `SYNDICATE_ROUTING_MODE`: ultra (default) or quote
//! - `SYNDICATE_DEPOSIT_LAMPORTS`, `SYNDICATE_SLIPPAGE_BPS`,
//!   `SYNDICATE_CONFIRM_TIMEOUT_SECS`, `SYNDICATE_LEG_PAUSE_MS`,
//!   `SYNDICATE_AGENT_ID`

use syndicated::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("syndicated=info".parse()?))
        .init();

    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api_host = %config.api.host,
        api_port = config.api.port,
        routing_mode = %config.routing.mode,
        ledger = %config.ledger_path.display(),
        "Agent Syndicate daemon"
    );

    let daemon = Daemon::from_config(config)?;
    daemon.run().await?;

    Ok(())
}
