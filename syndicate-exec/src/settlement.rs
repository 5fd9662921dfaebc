//! Settlement recorder: writes confirmed legs and treasury balances to the
//! ledger.
//!
//! Trades are appended one per confirmed leg. Treasury balances change in a
//! single ledger mutation once every leg of a conversion is known.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use syndicate_domain::{Asset, Treasury, Trade, SOL_MINT};
use syndicate_store::LedgerStore;

use crate::error::ExecResult;
use crate::ports::ChainPort;

/// Balance changes produced by a conversion, in UI units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreasuryDelta {
    /// Native asset spent; used only when the wallet balance lookup fails
    pub native_spent: Decimal,
    /// Change in intermediate-stable holdings
    pub intermediate: Decimal,
    /// Change in target-stable holdings
    pub target: Decimal,
}

impl TreasuryDelta {
    /// Delta for a completed two-leg conversion.
    ///
    /// `first` is (in, out) of leg 1, `second` of leg 2, in base units.
    pub fn two_leg(
        source: &Asset,
        intermediate: &Asset,
        target: &Asset,
        first: (u64, u64),
        second: (u64, u64),
    ) -> Self {
        Self {
            native_spent: native_spent(source, first.0),
            intermediate: intermediate.to_ui(first.1) - intermediate.to_ui(second.0),
            target: target.to_ui(second.1),
        }
    }
}

fn native_spent(source: &Asset, amount: u64) -> Decimal {
    if source.mint.as_str() == SOL_MINT {
        source.to_ui(amount)
    } else {
        Decimal::ZERO
    }
}

/// Records confirmed legs and treasury updates.
pub struct SettlementRecorder<S: LedgerStore, C: ChainPort> {
    store: Arc<S>,
    chain: Arc<C>,
    wallet: String,
}

impl<S: LedgerStore, C: ChainPort> SettlementRecorder<S, C> {
    /// Create a recorder for the treasury `wallet`.
    pub fn new(store: Arc<S>, chain: Arc<C>, wallet: impl Into<String>) -> Self {
        Self {
            store,
            chain,
            wallet: wallet.into(),
        }
    }

    /// Append one confirmed leg.
    pub async fn record_leg(&self, trade: Trade) -> ExecResult<()> {
        let (id, signature) = (trade.id.clone(), trade.tx_signature.clone());
        self.store.add_trade(trade).await?;
        info!(trade_id = %id, %signature, "Trade recorded");
        Ok(())
    }

    /// Overwrite all three treasury balances.
    pub async fn update_treasury(
        &self,
        native: Decimal,
        intermediate: Decimal,
        target: Decimal,
    ) -> ExecResult<()> {
        self.store.update_treasury(native, intermediate, target).await?;
        Ok(())
    }

    /// Apply a conversion's delta in one ledger mutation.
    ///
    /// The native balance comes from the chain; if that lookup fails it is
    /// the previous native balance minus `delta.native_spent`.
    pub async fn settle(&self, delta: TreasuryDelta) -> ExecResult<Treasury> {
        let native = match self.chain.get_balance(&self.wallet).await {
            Ok(lamports) => Some(Asset::sol().to_ui(lamports)),
            Err(e) => {
                warn!(wallet = %self.wallet, error = %e, "Balance lookup failed, deriving native balance");
                None
            },
        };

        let treasury = self
            .store
            .mutate(move |ledger| {
                let t = &mut ledger.treasury;
                let previous = t.native_balance;
                t.native_balance = native
                    .unwrap_or_else(|| (previous - delta.native_spent).max(Decimal::ZERO));
                t.intermediate_balance += delta.intermediate;
                t.target_balance += delta.target;
                Ok(t.clone())
            })
            .await?;

        info!(
            native = %treasury.native_balance,
            intermediate = %treasury.intermediate_balance,
            target = %treasury.target_balance,
            "Treasury settled"
        );
        Ok(treasury)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubChain;
    use rust_decimal_macros::dec;
    use syndicate_store::MemoryStore;

    fn recorder(chain: StubChain) -> (SettlementRecorder<MemoryStore, StubChain>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new("wallet"));
        let recorder = SettlementRecorder::new(store.clone(), Arc::new(chain), "wallet");
        (recorder, store)
    }

    #[test]
    fn test_two_leg_delta() {
        let delta = TreasuryDelta::two_leg(
            &Asset::sol(),
            &Asset::usdc(),
            &Asset::piggy_usdc(),
            (1_000_000_000, 150_000_000),
            (150_000_000, 149_500_000),
        );
        assert_eq!(delta.native_spent, dec!(1));
        assert_eq!(delta.intermediate, dec!(0));
        assert_eq!(delta.target, dec!(149.5));
    }

    #[tokio::test]
    async fn test_settle_uses_chain_balance() {
        let (recorder, store) = recorder(StubChain::new(20_000_000));
        let treasury = recorder
            .settle(TreasuryDelta {
                native_spent: dec!(1),
                intermediate: dec!(0),
                target: dec!(149.5),
            })
            .await
            .unwrap();

        assert_eq!(treasury.native_balance, dec!(0.02));
        assert_eq!(treasury.target_balance, dec!(149.5));
        assert_eq!(store.load().await.unwrap().treasury, treasury);
    }

    #[tokio::test]
    async fn test_settle_falls_back_when_lookup_fails() {
        let chain = StubChain::new(0);
        chain.set_balance_fails(true);
        let (recorder, _store) = recorder(chain);

        let treasury = recorder
            .settle(TreasuryDelta {
                native_spent: dec!(0.4),
                intermediate: dec!(10),
                target: dec!(0),
            })
            .await
            .unwrap();

        // Default ledger starts at 1 SOL
        assert_eq!(treasury.native_balance, dec!(0.6));
        assert_eq!(treasury.intermediate_balance, dec!(10));
    }

    #[tokio::test]
    async fn test_update_treasury_overwrites() {
        let (recorder, store) = recorder(StubChain::new(0));
        recorder.update_treasury(dec!(0), dec!(0), dec!(148.25)).await.unwrap();
        assert_eq!(store.load().await.unwrap().treasury.target_balance, dec!(148.25));
    }
}
