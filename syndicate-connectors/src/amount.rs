//! Token amounts as they appear on the wire.
//!
//! Routing APIs send base-unit amounts as decimal strings; some fields are
//! plain JSON numbers. Both are accepted.

use serde::Deserialize;

/// A base-unit amount encoded as a string or a number
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireAmount {
    /// `"150000000"`
    Text(String),
    /// `150000000`
    Number(u64),
}

impl WireAmount {
    /// Parse into base units.
    pub fn to_u64(&self) -> Option<u64> {
        match self {
            Self::Text(s) => s.trim().parse().ok(),
            Self::Number(n) => Some(*n),
        }
    }
}
