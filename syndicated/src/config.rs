//! Daemon configuration.
//!
//! Loads configuration from environment variables (and `.env`) once at
//! startup. Required values fail fast with a named error.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use syndicate_connectors::{DEFAULT_QUOTE_URL, DEFAULT_ULTRA_URL};
use syndicate_domain::AgentId;
use zeroize::Zeroizing;

use crate::error::{DaemonError, DaemonResult};

/// One SOL in lamports
const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Agent credited with the seed deposit by default
const DEFAULT_AGENT_ID: AgentId = 896;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,
    /// Ledger document location
    pub ledger_path: PathBuf,
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,
    /// Treasury keypair as a JSON byte array
    pub secret_key: SecretKey,
    /// Routing service configuration
    pub routing: RoutingConfig,
    /// Deposit and execution tuning
    pub execution: ExecutionConfig,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Routing service configuration.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Which service shape to use
    pub mode: RoutingMode,
    /// Order/execute base URL
    pub ultra_url: String,
    /// Quote/swap base URL
    pub quote_url: String,
    /// API key (required in ultra mode)
    pub api_key: Option<String>,
    /// Slippage tolerance for quote mode
    pub slippage_bps: u16,
}

/// Deposit and execution tuning.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Native amount converted by one deposit (lamports)
    pub deposit_lamports: u64,
    /// Agent credited with deposit trades
    pub agent_id: AgentId,
    /// Confirmation wait bound
    pub confirm_timeout: Duration,
    /// Pause between conversion legs
    pub leg_pause: Duration,
}

/// Routing service shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    /// Order + execute
    Ultra,
    /// Quote + swap build, always broadcast
    Quote,
}

impl FromStr for RoutingMode {
    type Err = DaemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ultra" => Ok(Self::Ultra),
            "quote" => Ok(Self::Quote),
            other => Err(DaemonError::Config(format!(
                "Invalid SYNDICATE_ROUTING_MODE: {}. Expected: ultra, quote",
                other
            ))),
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Ultra => write!(f, "ultra"),
            RoutingMode::Quote => write!(f, "quote"),
        }
    }
}

/// Secret key material, wiped on drop and never printed.
#[derive(Clone)]
pub struct SecretKey(Zeroizing<String>);

impl SecretKey {
    /// Wrap raw key text.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Zeroizing::new(raw.into()))
    }

    /// Raw key text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> DaemonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| DaemonError::Config(format!("{} is required", key)))
        };

        let rpc_url = required("SOLANA_RPC_URL")?;
        let secret_key = SecretKey::new(required("SOLANA_PRIVATE_KEY")?);

        let mode = match get("SYNDICATE_ROUTING_MODE") {
            Some(raw) => raw.parse()?,
            None => RoutingMode::Ultra,
        };
        let api_key = get("JUPITER_API_KEY");
        if mode == RoutingMode::Ultra && api_key.is_none() {
            return Err(DaemonError::Config(
                "JUPITER_API_KEY is required in ultra routing mode".to_string(),
            ));
        }

        let routing = RoutingConfig {
            mode,
            ultra_url: get("JUPITER_ULTRA_URL").unwrap_or_else(|| DEFAULT_ULTRA_URL.to_string()),
            quote_url: get("JUPITER_QUOTE_URL").unwrap_or_else(|| DEFAULT_QUOTE_URL.to_string()),
            api_key,
            slippage_bps: parse_or(&get, "SYNDICATE_SLIPPAGE_BPS", 50)?,
        };

        let api = ApiConfig {
            host: get("SYNDICATE_API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 3000)?,
        };

        let execution = ExecutionConfig {
            deposit_lamports: parse_or(&get, "SYNDICATE_DEPOSIT_LAMPORTS", LAMPORTS_PER_SOL)?,
            agent_id: parse_or(&get, "SYNDICATE_AGENT_ID", DEFAULT_AGENT_ID)?,
            confirm_timeout: Duration::from_secs(parse_or(
                &get,
                "SYNDICATE_CONFIRM_TIMEOUT_SECS",
                90,
            )?),
            leg_pause: Duration::from_millis(parse_or(&get, "SYNDICATE_LEG_PAUSE_MS", 3000)?),
        };
        if execution.deposit_lamports == 0 {
            return Err(DaemonError::Config(
                "SYNDICATE_DEPOSIT_LAMPORTS must be positive".to_string(),
            ));
        }

        Ok(Self {
            api,
            ledger_path: get("SYNDICATE_LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("syndicate_ledger.json")),
            rpc_url,
            secret_key,
            routing,
            execution,
        })
    }

    /// Create test configuration: loopback port 0, no pauses.
    pub fn test(ledger_path: impl Into<PathBuf>, secret_key: SecretKey) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            ledger_path: ledger_path.into(),
            rpc_url: "http://127.0.0.1:8899".to_string(),
            secret_key,
            routing: RoutingConfig {
                mode: RoutingMode::Ultra,
                ultra_url: DEFAULT_ULTRA_URL.to_string(),
                quote_url: DEFAULT_QUOTE_URL.to_string(),
                api_key: None,
                slippage_bps: 50,
            },
            execution: ExecutionConfig {
                deposit_lamports: LAMPORTS_PER_SOL,
                agent_id: DEFAULT_AGENT_ID,
                confirm_timeout: Duration::from_secs(5),
                leg_pause: Duration::ZERO,
            },
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> DaemonResult<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
        None => Ok(default),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("SOLANA_RPC_URL", "http://rpc.local"),
        ("SOLANA_PRIVATE_KEY", "[1,2,3]"),
        ("JUPITER_API_KEY", "key"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(MINIMAL)).unwrap();

        assert_eq!(config.api.port, 3000);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.ledger_path, PathBuf::from("syndicate_ledger.json"));
        assert_eq!(config.routing.mode, RoutingMode::Ultra);
        assert_eq!(config.routing.ultra_url, DEFAULT_ULTRA_URL);
        assert_eq!(config.routing.slippage_bps, 50);
        assert_eq!(config.execution.deposit_lamports, 1_000_000_000);
        assert_eq!(config.execution.agent_id, 896);
        assert_eq!(config.execution.confirm_timeout, Duration::from_secs(90));
        assert_eq!(config.execution.leg_pause, Duration::from_millis(3000));
    }

    #[test]
    fn test_missing_required_values_are_named() {
        let err = Config::from_lookup(lookup(&[("SOLANA_PRIVATE_KEY", "[1]")])).unwrap_err();
        assert!(err.to_string().contains("SOLANA_RPC_URL"));

        let err = Config::from_lookup(lookup(&[("SOLANA_RPC_URL", "http://rpc")])).unwrap_err();
        assert!(err.to_string().contains("SOLANA_PRIVATE_KEY"));
    }

    #[test]
    fn test_api_key_only_required_in_ultra_mode() {
        let base = [
            ("SOLANA_RPC_URL", "http://rpc.local"),
            ("SOLANA_PRIVATE_KEY", "[1,2,3]"),
        ];
        let err = Config::from_lookup(lookup(&base)).unwrap_err();
        assert!(err.to_string().contains("JUPITER_API_KEY"));

        let mut quote = base.to_vec();
        quote.push(("SYNDICATE_ROUTING_MODE", "QUOTE"));
        let config = Config::from_lookup(lookup(&quote)).unwrap();
        assert_eq!(config.routing.mode, RoutingMode::Quote);
        assert!(config.routing.api_key.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(DaemonError::Config(msg)) if msg.contains("PORT")
        ));

        let mut pairs = MINIMAL.to_vec();
        pairs.push(("SYNDICATE_ROUTING_MODE", "lightspeed"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = MINIMAL.to_vec();
        pairs.push(("SYNDICATE_DEPOSIT_LAMPORTS", "0"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_secret_key_is_redacted() {
        let config = Config::from_lookup(lookup(MINIMAL)).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("[1,2,3]"));
        assert_eq!(config.secret_key.expose(), "[1,2,3]");
    }
}
