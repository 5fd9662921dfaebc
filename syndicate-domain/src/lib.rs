//! Agent Syndicate Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains ledger entities, asset value objects and thesis scoring.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod thesis;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{AgentId, Ledger, Member, Thesis, Trade, Treasury};
pub use thesis::{
    classify_token, evaluate_thesis, parse_thesis_from_comment, AssetClass, ThesisEvaluation,
    ThesisProposal,
};
pub use value_objects::{
    Asset, Conviction, Direction, DomainError, Mint, RiskLevel, ThesisStatus, TwoLegPlan,
    PIGGY_USDC_MINT, SOL_MINT, USDC_MINT,
};
