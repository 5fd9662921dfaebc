//! Ledger store trait (Port)
//!
//! The ledger is one document. Implementations expose only `load` and an
//! exclusive `mutate`; every higher-level operation is built on those two,
//! so all writes serialize through the implementation's lock.

use crate::error::StoreError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use syndicate_domain::{AgentId, Ledger, Member, Thesis, Trade};
use tracing::debug;

/// Durable ledger storage
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current ledger snapshot
    async fn load(&self) -> Result<Ledger, StoreError>;

    /// Apply `f` to the ledger under exclusive access and persist the result
    ///
    /// If `f` fails nothing is written.
    async fn mutate<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static;

    /// Register a member; returns the existing one if already present
    async fn add_member(&self, agent_id: AgentId, agent_name: &str) -> Result<Member, StoreError> {
        let name = agent_name.to_string();
        self.mutate(move |ledger| {
            if let Some(existing) = ledger.member(agent_id) {
                return Ok(existing.clone());
            }
            let member = Member::new(agent_id, name);
            ledger.members.push(member.clone());
            debug!(agent_id, "Member added");
            Ok(member)
        })
        .await
    }

    /// Append a thesis and bump its author's theses count
    async fn add_thesis(&self, thesis: Thesis) -> Result<(), StoreError> {
        self.mutate(move |ledger| {
            if ledger.theses.iter().any(|t| t.id == thesis.id) {
                return Err(StoreError::duplicate("thesis", thesis.id));
            }
            if let Some(member) = ledger.members.iter_mut().find(|m| m.agent_id == thesis.agent_id)
            {
                member.theses_count += 1;
            }
            debug!(thesis_id = %thesis.id, token = %thesis.token, "Thesis added");
            ledger.theses.push(thesis);
            Ok(())
        })
        .await
    }

    /// Append a trade record
    ///
    /// # Errors
    /// Returns `StoreError::Duplicate` if a trade with the same id exists
    async fn add_trade(&self, trade: Trade) -> Result<(), StoreError> {
        self.mutate(move |ledger| {
            if ledger.trades.iter().any(|t| t.id == trade.id) {
                return Err(StoreError::duplicate("trade", trade.id));
            }
            debug!(trade_id = %trade.id, signature = %trade.tx_signature, "Trade added");
            ledger.trades.push(trade);
            Ok(())
        })
        .await
    }

    /// Overwrite all three treasury balances in one write
    async fn update_treasury(
        &self,
        native: Decimal,
        intermediate: Decimal,
        target: Decimal,
    ) -> Result<(), StoreError> {
        self.mutate(move |ledger| {
            ledger.treasury.native_balance = native;
            ledger.treasury.intermediate_balance = intermediate;
            ledger.treasury.target_balance = target;
            debug!(%native, %intermediate, %target, "Treasury updated");
            Ok(())
        })
        .await
    }

    /// Members sorted by total PnL, best first
    async fn leaderboard(&self) -> Result<Vec<Member>, StoreError> {
        Ok(self.load().await?.leaderboard())
    }
}
