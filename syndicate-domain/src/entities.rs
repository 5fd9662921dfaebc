//! Ledger entities for the Agent Syndicate
//!
//! The ledger is a single JSON document (camelCase keys) holding the
//! treasury snapshot, members, theses and executed trades.

use crate::value_objects::{Conviction, Direction, Mint, ThesisStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agent identifier (forum agent id)
pub type AgentId = u64;

/// Default syndicate name for a freshly initialized ledger
pub const DEFAULT_SYNDICATE_NAME: &str = "The Agent Syndicate";

/// Seed description recorded in a fresh treasury
pub const DEFAULT_TREASURY_SEED: &str = "1 SOL";

// =============================================================================
// Ledger
// =============================================================================

/// Root ledger document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub syndicate: String,
    pub treasury: Treasury,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub theses: Vec<Thesis>,
    #[serde(default)]
    pub trades: Vec<Trade>,
}

impl Ledger {
    /// Fresh ledger for a treasury wallet: seeded with 1 SOL, no history
    pub fn default_with_wallet(wallet: impl Into<String>) -> Self {
        Self {
            syndicate: DEFAULT_SYNDICATE_NAME.to_string(),
            treasury: Treasury {
                seed: DEFAULT_TREASURY_SEED.to_string(),
                wallet: wallet.into(),
                native_balance: Decimal::ONE,
                intermediate_balance: Decimal::ZERO,
                target_balance: Decimal::ZERO,
            },
            members: Vec::new(),
            theses: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Find a member by agent id
    pub fn member(&self, agent_id: AgentId) -> Option<&Member> {
        self.members.iter().find(|m| m.agent_id == agent_id)
    }

    /// Members sorted by total PnL, best first
    pub fn leaderboard(&self) -> Vec<Member> {
        let mut members = self.members.clone();
        members.sort_by(|a, b| b.total_pnl_percent.cmp(&a.total_pnl_percent));
        members
    }
}

// =============================================================================
// Treasury
// =============================================================================

/// Treasury balances in UI units
///
/// Field names on disk stay compatible with existing ledger files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treasury {
    pub seed: String,
    pub wallet: String,
    /// Native SOL balance
    #[serde(rename = "currentBalanceSol")]
    pub native_balance: Decimal,
    /// Intermediate stable (USDC) balance
    #[serde(rename = "currentBalanceUsdc")]
    pub intermediate_balance: Decimal,
    /// Target stable (piggyUSDC) balance
    #[serde(rename = "piggyUsdcBalance")]
    pub target_balance: Decimal,
}

// =============================================================================
// Member
// =============================================================================

/// A syndicate participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub theses_count: u32,
    pub win_count: u32,
    pub loss_count: u32,
    pub total_pnl_percent: Decimal,
    pub voting_power: u32,
    pub profit_share: Decimal,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    /// New member with one vote and no history
    pub fn new(agent_id: AgentId, agent_name: impl Into<String>) -> Self {
        Self {
            agent_id,
            agent_name: agent_name.into(),
            theses_count: 0,
            win_count: 0,
            loss_count: 0,
            total_pnl_percent: Decimal::ZERO,
            voting_power: 1,
            profit_share: Decimal::ZERO,
            joined_at: Utc::now(),
        }
    }
}

// =============================================================================
// Thesis
// =============================================================================

/// An investment thesis proposed by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thesis {
    pub id: String,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub token: String,
    pub direction: Direction,
    pub timeframe: String,
    pub conviction: Conviction,
    pub reasoning: String,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub pnl_percent: Option<Decimal>,
    pub status: ThesisStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub tx_signature: Option<String>,
}

impl Thesis {
    /// New pending thesis with a time-ordered id
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_id: AgentId,
        agent_name: impl Into<String>,
        token: impl Into<String>,
        direction: Direction,
        timeframe: impl Into<String>,
        conviction: Conviction,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("thesis-{}", Uuid::now_v7()),
            agent_id,
            agent_name: agent_name.into(),
            token: token.into(),
            direction,
            timeframe: timeframe.into(),
            conviction,
            reasoning: reasoning.into(),
            entry_price: None,
            exit_price: None,
            pnl_percent: None,
            status: ThesisStatus::Pending,
            created_at: Utc::now(),
            closed_at: None,
            tx_signature: None,
        }
    }
}

// =============================================================================
// Trade
// =============================================================================

/// Immutable record of one confirmed conversion leg
///
/// Amounts are raw base units of the respective mints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub thesis_id: String,
    pub agent_id: AgentId,
    pub input_mint: Mint,
    pub output_mint: Mint,
    pub amount_in: u64,
    pub amount_out: u64,
    pub tx_signature: String,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Trade id of the form `trade-<operation>-<uuid v7>`
    pub fn new_id(operation: &str) -> String {
        format!("trade-{operation}-{}", Uuid::now_v7())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{SOL_MINT, USDC_MINT};
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_ledger() {
        let ledger = Ledger::default_with_wallet("wallet");
        assert_eq!(ledger.syndicate, "The Agent Syndicate");
        assert_eq!(ledger.treasury.seed, "1 SOL");
        assert_eq!(ledger.treasury.native_balance, dec!(1));
        assert!(ledger.members.is_empty());
        assert!(ledger.trades.is_empty());
    }

    #[test]
    fn test_treasury_serializes_with_ledger_keys() {
        let ledger = Ledger::default_with_wallet("wallet");
        let json = serde_json::to_value(&ledger).unwrap();
        let treasury = &json["treasury"];
        assert!(treasury.get("currentBalanceSol").is_some());
        assert!(treasury.get("currentBalanceUsdc").is_some());
        assert!(treasury.get("piggyUsdcBalance").is_some());
    }

    #[test]
    fn test_ledger_reads_numeric_balances() {
        let raw = r#"{
            "syndicate": "The Agent Syndicate",
            "treasury": {
                "seed": "1 SOL",
                "wallet": "",
                "currentBalanceSol": 1.0,
                "currentBalanceUsdc": 0,
                "piggyUsdcBalance": 148.5
            },
            "members": [],
            "theses": [],
            "trades": []
        }"#;
        let ledger: Ledger = serde_json::from_str(raw).unwrap();
        assert_eq!(ledger.treasury.target_balance, dec!(148.5));
    }

    #[test]
    fn test_leaderboard_sorted_by_pnl() {
        let mut ledger = Ledger::default_with_wallet("w");
        let mut a = Member::new(1, "a");
        a.total_pnl_percent = dec!(2.5);
        let mut b = Member::new(2, "b");
        b.total_pnl_percent = dec!(10);
        let mut c = Member::new(3, "c");
        c.total_pnl_percent = dec!(-4);
        ledger.members = vec![a, b, c];

        let ids: Vec<_> = ledger.leaderboard().iter().map(|m| m.agent_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_trade_ids_unique() {
        let a = Trade::new_id("deposit-sol-usdc");
        let b = Trade::new_id("deposit-sol-usdc");
        assert!(a.starts_with("trade-deposit-sol-usdc-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_trade_round_trip_keys() {
        let trade = Trade {
            id: Trade::new_id("x"),
            thesis_id: "seed-deposit".into(),
            agent_id: 896,
            input_mint: Mint::new(SOL_MINT).unwrap(),
            output_mint: Mint::new(USDC_MINT).unwrap(),
            amount_in: 1_000_000_000,
            amount_out: 150_000_000,
            tx_signature: "sig".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["thesisId"], "seed-deposit");
        assert_eq!(json["amountIn"], 1_000_000_000u64);
        let back: Trade = serde_json::from_value(json).unwrap();
        assert_eq!(back, trade);
    }
}
