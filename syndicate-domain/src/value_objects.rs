//! Value Objects for the Agent Syndicate domain
//!
//! Immutable, validated primitives: mint addresses, asset descriptors and
//! the small enums shared by theses and evaluations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Mint must be a base58 encoded 32-byte address
    #[error("Invalid mint: {0}")]
    InvalidMint(String),

    /// Direction must be long or short
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    /// Conviction must be low, medium or high
    #[error("Invalid conviction: {0}")]
    InvalidConviction(String),

    /// Amount cannot be represented
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Thesis proposal is missing required data
    #[error("Invalid thesis: {0}")]
    InvalidThesis(String),
}

// =============================================================================
// Mint
// =============================================================================

/// Native SOL (wrapped) mint address
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// USDC mint address
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// piggyUSDC mint address
pub const PIGGY_USDC_MINT: &str = "F35yYmTR6PqkbTx449P1eGhB57mRhWAdYs93eCo2dMZR";

/// Token mint address (base58, 32 bytes when decoded)
///
/// # Invariants
/// - Decodes to exactly 32 bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mint(String);

impl Mint {
    /// Create a new Mint with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidMint` if the address is not valid base58
    /// or does not decode to 32 bytes
    pub fn new(address: impl Into<String>) -> Result<Self, DomainError> {
        let address = address.into();
        let bytes = bs58::decode(&address)
            .into_vec()
            .map_err(|e| DomainError::InvalidMint(format!("{address}: {e}")))?;
        if bytes.len() != 32 {
            return Err(DomainError::InvalidMint(format!(
                "{address}: decodes to {} bytes, expected 32",
                bytes.len()
            )));
        }
        Ok(Self(address))
    }

    /// Base58 address
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Mint {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Mint> for String {
    fn from(mint: Mint) -> Self {
        mint.0
    }
}

impl fmt::Display for Mint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Asset
// =============================================================================

/// A token the treasury can hold: symbol, mint and base-unit precision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Display symbol (e.g. "SOL")
    pub symbol: String,
    /// Mint address
    pub mint: Mint,
    /// Number of decimals in one UI unit
    pub decimals: u32,
}

impl Asset {
    fn known(symbol: &str, mint: &'static str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            // Constants above are valid 32-byte addresses
            mint: Mint(mint.to_string()),
            decimals,
        }
    }

    /// Native SOL (9 decimals)
    pub fn sol() -> Self {
        Self::known("SOL", SOL_MINT, 9)
    }

    /// USDC (6 decimals)
    pub fn usdc() -> Self {
        Self::known("USDC", USDC_MINT, 6)
    }

    /// piggyUSDC (6 decimals)
    pub fn piggy_usdc() -> Self {
        Self::known("piggyUSDC", PIGGY_USDC_MINT, 6)
    }

    /// Convert raw base units into a UI decimal amount
    pub fn to_ui(&self, raw: u64) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(raw), self.decimals).normalize()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Two-step conversion path: source → intermediate → target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoLegPlan {
    /// Asset spent by the first leg
    pub source: Asset,
    /// Asset received by the first leg and spent by the second
    pub intermediate: Asset,
    /// Asset received by the second leg
    pub target: Asset,
}

impl TwoLegPlan {
    /// SOL → USDC → piggyUSDC
    pub fn sol_to_piggy() -> Self {
        Self {
            source: Asset::sol(),
            intermediate: Asset::usdc(),
            target: Asset::piggy_usdc(),
        }
    }
}

impl Default for TwoLegPlan {
    fn default() -> Self {
        Self::sol_to_piggy()
    }
}

// =============================================================================
// Thesis enums
// =============================================================================

/// Thesis direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Expect the token to rise
    Long,
    /// Expect the token to fall
    Short,
}

impl FromStr for Direction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            other => Err(DomainError::InvalidDirection(other.to_string())),
        }
    }
}

/// How strongly the proposing agent believes in a thesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conviction {
    /// Low conviction
    Low,
    /// Medium conviction
    Medium,
    /// High conviction
    High,
}

impl FromStr for Conviction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DomainError::InvalidConviction(other.to_string())),
        }
    }
}

/// Thesis lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThesisStatus {
    /// Recorded, not yet acted upon
    Pending,
    /// Position open
    Active,
    /// Position closed, PnL known
    Closed,
}

/// Outcome class of a thesis evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Score >= 70
    Low,
    /// Score >= 45
    Medium,
    /// Approved or not, score below 45
    High,
    /// Token or asset class not allowed
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mint_validation() {
        assert!(Mint::new(SOL_MINT).is_ok());
        assert!(Mint::new(USDC_MINT).is_ok());
        assert!(Mint::new(PIGGY_USDC_MINT).is_ok());
        assert!(Mint::new("not-base58-0OIl").is_err());
        assert!(Mint::new("abc").is_err());
    }

    #[test]
    fn test_mint_serde_rejects_invalid() {
        let ok: Result<Mint, _> = serde_json::from_str(&format!("\"{USDC_MINT}\""));
        assert!(ok.is_ok());
        let bad: Result<Mint, _> = serde_json::from_str("\"xyz\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_asset_to_ui() {
        assert_eq!(Asset::sol().to_ui(1_000_000_000), dec!(1));
        assert_eq!(Asset::usdc().to_ui(150_250_000), dec!(150.25));
        assert_eq!(Asset::piggy_usdc().to_ui(0), dec!(0));
    }

    #[test]
    fn test_direction_and_conviction_parse() {
        assert_eq!("LONG".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!(" short ".parse::<Direction>().unwrap(), Direction::Short);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!("High".parse::<Conviction>().unwrap(), Conviction::High);
        assert!("extreme".parse::<Conviction>().is_err());
    }

    #[test]
    fn test_default_plan() {
        let plan = TwoLegPlan::default();
        assert_eq!(plan.source.mint.as_str(), SOL_MINT);
        assert_eq!(plan.intermediate.mint.as_str(), USDC_MINT);
        assert_eq!(plan.target.mint.as_str(), PIGGY_USDC_MINT);
    }
}
