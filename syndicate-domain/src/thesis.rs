//! Thesis scoring and comment parsing
//!
//! Pure functions: no I/O, no clock. A proposal is scored against the
//! syndicate's risk parameters and either approved or rejected.

use crate::value_objects::RiskLevel;
use serde::{Deserialize, Serialize};

// =============================================================================
// Risk parameters
// =============================================================================

/// Asset class a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Dollar-pegged tokens
    Stablecoins,
    /// Liquid staking tokens
    Lst,
    /// Established large-cap tokens
    Bluechips,
}

impl AssetClass {
    /// Lower-case class label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stablecoins => "stablecoins",
            Self::Lst => "lst",
            Self::Bluechips => "bluechips",
        }
    }

    fn score_bonus(&self) -> i32 {
        match self {
            Self::Stablecoins => 20,
            Self::Lst => 15,
            Self::Bluechips => 5,
        }
    }
}

/// Asset classes the syndicate may trade
pub const ALLOWED_ASSET_CLASSES: [AssetClass; 3] =
    [AssetClass::Stablecoins, AssetClass::Lst, AssetClass::Bluechips];

/// Minimum score for approval
pub const APPROVAL_THRESHOLD: u8 = 40;

const DATA_KEYWORDS: [&str; 9] = [
    "apy",
    "apr",
    "tvl",
    "volume",
    "historical",
    "backtest",
    "sharpe",
    "correlation",
    "hedge",
];

const RISK_KEYWORDS: [&str; 5] = ["yolo", "moon", "100x", "ape", "degen"];

/// Classify a token symbol (case-sensitive)
pub fn classify_token(token: &str) -> Option<AssetClass> {
    match token {
        "USDC" | "USDT" | "piggyUSDC" => Some(AssetClass::Stablecoins),
        "JitoSOL" | "mSOL" | "bSOL" => Some(AssetClass::Lst),
        "SOL" | "JUP" | "RAY" | "PYTH" | "JTO" | "BONK" | "WIF" => Some(AssetClass::Bluechips),
        _ => None,
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Raw thesis proposal as submitted by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThesisProposal {
    pub token: String,
    pub direction: String,
    pub timeframe: String,
    pub conviction: String,
    pub reasoning: String,
}

/// Result of scoring a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThesisEvaluation {
    pub approved: bool,
    /// 0..=100
    pub score: u8,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
}

impl ThesisEvaluation {
    fn rejected(reason: String) -> Self {
        Self {
            approved: false,
            score: 0,
            risk_level: RiskLevel::Rejected,
            reasons: vec![reason],
        }
    }
}

/// Score a thesis proposal
///
/// Unknown tokens and disallowed asset classes are rejected outright with a
/// score of 0. Everything else starts at 50 and is adjusted by asset class,
/// timeframe, conviction, reasoning length and keyword hits, then clamped
/// to `[0, 100]`. Approved iff the score reaches [`APPROVAL_THRESHOLD`].
pub fn evaluate_thesis(proposal: &ThesisProposal) -> ThesisEvaluation {
    let Some(class) = classify_token(&proposal.token) else {
        return ThesisEvaluation::rejected(format!(
            "Token \"{}\" not in approved list",
            proposal.token
        ));
    };
    if !ALLOWED_ASSET_CLASSES.contains(&class) {
        return ThesisEvaluation::rejected(format!(
            "Asset type \"{}\" not allowed",
            class.as_str()
        ));
    }

    let mut reasons = vec![format!("Asset type: {}", class.as_str())];
    let mut score: i32 = 50 + class.score_bonus();

    let timeframe = proposal.timeframe.as_str();
    if timeframe.contains("week") {
        score += 10;
    }
    if timeframe.contains("3d") {
        score += 5;
    }
    if timeframe.contains("24h") {
        score -= 5;
    }

    // Exact match; callers normalize case
    match proposal.conviction.as_str() {
        "high" => score += 10,
        "medium" => score += 5,
        _ => {}
    }

    // Measured in UTF-16 code units, the unit forum clients count in
    let reasoning_len = proposal.reasoning.encode_utf16().count();
    if reasoning_len > 200 {
        score += 10;
        reasons.push("Detailed reasoning".to_string());
    }
    if reasoning_len < 50 {
        score -= 15;
        reasons.push("Reasoning too brief".to_string());
    }

    let lower = proposal.reasoning.to_lowercase();
    let data_hits: Vec<&str> = DATA_KEYWORDS
        .iter()
        .copied()
        .filter(|k| lower.contains(k))
        .collect();
    if data_hits.len() >= 2 {
        score += 10;
        reasons.push(format!("Data-driven ({})", data_hits.join(", ")));
    }

    let risk_hits: Vec<&str> = RISK_KEYWORDS
        .iter()
        .copied()
        .filter(|k| lower.contains(k))
        .collect();
    if !risk_hits.is_empty() {
        score -= 20;
        reasons.push(format!("Risk flags: {}", risk_hits.join(", ")));
    }

    let score = score.clamp(0, 100) as u8;
    let risk_level = if score >= 70 {
        RiskLevel::Low
    } else if score >= 45 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    ThesisEvaluation {
        approved: score >= APPROVAL_THRESHOLD,
        score,
        risk_level,
        reasons,
    }
}

// =============================================================================
// Comment parsing
// =============================================================================

/// Extract a proposal from a free-text forum comment
///
/// Recognized labels (case-insensitive): `Token:`, `Direction:`,
/// `Timeframe:`, `Conviction:`, `Reasoning:`. Returns `None` without a token.
/// Reasoning spans everything after its label, including newlines.
pub fn parse_thesis_from_comment(body: &str) -> Option<ThesisProposal> {
    let lower = body.to_ascii_lowercase();

    let token = label_value(body, &lower, "token:", take_word)?;
    let direction = label_value(body, &lower, "direction:", take_word)
        .unwrap_or_else(|| "long".to_string());
    let timeframe = label_value(body, &lower, "timeframe:", take_line)
        .unwrap_or_else(|| "3d".to_string());
    let conviction = label_value(body, &lower, "conviction:", take_word)
        .map(|c| c.to_lowercase())
        .unwrap_or_else(|| "medium".to_string());
    let reasoning = label_value(body, &lower, "reasoning:", take_rest).unwrap_or_default();

    Some(ThesisProposal {
        token,
        direction,
        timeframe,
        conviction,
        reasoning,
    })
}

/// First non-empty value following `label`
///
/// `lower` is the ASCII-lowercased `body`, so byte offsets line up.
fn label_value(
    body: &str,
    lower: &str,
    label: &str,
    take: fn(&str) -> &str,
) -> Option<String> {
    let mut from = 0;
    while let Some(pos) = lower[from..].find(label) {
        let start = from + pos + label.len();
        let value = take(body[start..].trim_start()).trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
        from = start;
    }
    None
}

fn take_word(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    &s[..end]
}

fn take_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

fn take_rest(s: &str) -> &str {
    s
}
