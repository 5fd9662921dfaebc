//! Swap orchestrator: sequences order → sign → submit → settle.
//!
//! A two-leg conversion (source → intermediate → target) never loses the
//! intermediate asset: once leg 1 is confirmed its trade is recorded, and a
//! leg-2 failure is reported as a partial outcome rather than an error.
//!
//! # Flow
//!
//! ```text
//! convert(source → intermediate) → record leg 1
//!     → pause
//!     → convert(intermediate → target) → record leg 2 → settle treasury
//! ```

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use syndicate_domain::{AgentId, Asset, Mint, Trade, Treasury, TwoLegPlan};
use syndicate_store::LedgerStore;

use crate::engine::{SubmissionEngine, SubmissionPath};
use crate::error::{ExecError, ExecResult};
use crate::ports::{ChainPort, OrderPort, QuotePort};
use crate::settlement::{SettlementRecorder, TreasuryDelta};
use crate::signer::{sign_transaction, Keypair};

/// Thesis reference for the seed deposit
pub const SEED_DEPOSIT_THESIS: &str = "seed-deposit";

// =============================================================================
// Types
// =============================================================================

/// Routing service shape in use
#[derive(Clone)]
pub enum Venue {
    /// Order + execute (service may submit the transaction itself)
    Ultra(Arc<dyn OrderPort>),
    /// Quote + swap build (we always broadcast)
    QuoteSwap {
        /// Quote/swap client
        quotes: Arc<dyn QuotePort>,
        /// Slippage tolerance for quotes
        slippage_bps: u16,
    },
}

/// Attribution for recorded trades
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeContext {
    /// Thesis the trades belong to
    pub thesis_id: String,
    /// Acting agent
    pub agent_id: AgentId,
    /// Operation name used in trade ids (e.g. "deposit")
    pub operation: String,
}

impl TradeContext {
    /// Context for the treasury seed deposit
    pub fn seed_deposit(agent_id: AgentId) -> Self {
        Self {
            thesis_id: SEED_DEPOSIT_THESIS.to_string(),
            agent_id,
            operation: "deposit".to_string(),
        }
    }
}

/// One confirmed conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegOutcome {
    pub signature: String,
    pub input_mint: Mint,
    pub output_mint: Mint,
    pub in_amount: u64,
    pub out_amount: u64,
    pub via: SubmissionPath,
}

/// Result of a two-leg conversion
#[derive(Debug)]
pub enum TwoLegOutcome {
    /// Both legs confirmed and treasury settled
    Completed {
        first: LegOutcome,
        second: LegOutcome,
        treasury: Treasury,
    },
    /// Leg 1 confirmed and recorded; leg 2 did not complete.
    /// The intermediate asset is held in the wallet.
    Partial {
        first: LegOutcome,
        /// Intermediate amount held (base units)
        held_intermediate: u64,
        error: ExecError,
    },
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between leg 1 and leg 2
    pub leg_pause: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            leg_pause: Duration::from_secs(3),
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs conversions end to end.
pub struct SwapOrchestrator<C: ChainPort, S: LedgerStore> {
    venue: Venue,
    keypair: Arc<Keypair>,
    engine: SubmissionEngine<C>,
    settlement: SettlementRecorder<S, C>,
    config: OrchestratorConfig,
}

impl<C: ChainPort, S: LedgerStore> SwapOrchestrator<C, S> {
    /// Create a new orchestrator.
    pub fn new(
        venue: Venue,
        keypair: Arc<Keypair>,
        engine: SubmissionEngine<C>,
        settlement: SettlementRecorder<S, C>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            venue,
            keypair,
            engine,
            settlement,
            config,
        }
    }

    /// Treasury wallet address
    pub fn wallet(&self) -> String {
        self.keypair.pubkey_base58()
    }

    /// Convert `amount` of `input` into `output` and wait for confirmation.
    ///
    /// The output amount is the service-reported amount when available,
    /// otherwise the quoted amount. Nothing is recorded.
    ///
    /// # Errors
    ///
    /// Any routing, signing or submission error, plus
    /// `ConfirmationTimeout` if the transaction was submitted but not seen
    /// confirmed in time.
    pub async fn convert(
        &self,
        input: &Asset,
        output: &Asset,
        amount: u64,
        cancel: &CancellationToken,
    ) -> ExecResult<LegOutcome> {
        let taker = self.keypair.pubkey_base58();
        info!(%input, %output, amount, "Requesting conversion");

        let (submission, in_amount, quoted_out) = match &self.venue {
            Venue::Ultra(orders) => {
                let order = orders.request_order(&input.mint, &output.mint, amount, &taker).await?;
                let signed = sign_transaction(&order.transaction, &self.keypair)?;
                let sub = self
                    .engine
                    .submit_and_confirm(orders.as_ref(), &signed, &order.request_id, cancel)
                    .await?;
                (sub, order.in_amount, order.out_amount)
            },
            Venue::QuoteSwap {
                quotes,
                slippage_bps,
            } => {
                let quote = quotes.get_quote(&input.mint, &output.mint, amount, *slippage_bps).await?;
                let unsigned = quotes.build_swap_transaction(&quote, &taker).await?;
                let signed = sign_transaction(&unsigned, &self.keypair)?;
                let sub = self.engine.broadcast_and_confirm(&signed, cancel).await?;
                (sub, quote.in_amount, quote.out_amount)
            },
        };

        if !submission.confirmed {
            return Err(ExecError::ConfirmationTimeout {
                signature: submission.signature,
            });
        }

        let out_amount = submission.reported_output.unwrap_or(quoted_out);
        info!(
            signature = %submission.signature,
            via = ?submission.via,
            in_amount,
            out_amount,
            "Leg confirmed"
        );
        Ok(LegOutcome {
            signature: submission.signature,
            input_mint: input.mint.clone(),
            output_mint: output.mint.clone(),
            in_amount,
            out_amount,
            via: submission.via,
        })
    }

    /// Convert source → intermediate → target.
    ///
    /// # Errors
    ///
    /// A leg-1 failure aborts with no ledger change. A leg-2 failure is
    /// returned as `TwoLegOutcome::Partial`, not an error.
    pub async fn convert_two_leg(
        &self,
        plan: &TwoLegPlan,
        amount: u64,
        context: &TradeContext,
        cancel: &CancellationToken,
    ) -> ExecResult<TwoLegOutcome> {
        let first = self
            .convert(&plan.source, &plan.intermediate, amount, cancel)
            .await
            .map_err(|e| {
                error!(error = %e, kind = e.kind(), "First leg failed, nothing recorded");
                e
            })?;
        self.settlement
            .record_leg(trade_for(context, &plan.source, &plan.intermediate, &first))
            .await?;

        if !self.pause_between_legs(cancel).await {
            warn!(signature = %first.signature, "Cancelled between legs, intermediate held");
            return Ok(TwoLegOutcome::Partial {
                held_intermediate: first.out_amount,
                first,
                error: ExecError::Cancelled,
            });
        }

        let second = match self
            .convert(&plan.intermediate, &plan.target, first.out_amount, cancel)
            .await
        {
            Ok(second) => second,
            Err(error) => {
                error!(
                    first_signature = %first.signature,
                    held_intermediate = first.out_amount,
                    intermediate = %plan.intermediate,
                    error = %error,
                    kind = error.kind(),
                    "Second leg failed, intermediate asset held"
                );
                return Ok(TwoLegOutcome::Partial {
                    held_intermediate: first.out_amount,
                    first,
                    error,
                });
            },
        };
        self.settlement
            .record_leg(trade_for(context, &plan.intermediate, &plan.target, &second))
            .await?;

        let delta = TreasuryDelta::two_leg(
            &plan.source,
            &plan.intermediate,
            &plan.target,
            (first.in_amount, first.out_amount),
            (second.in_amount, second.out_amount),
        );
        let treasury = self.settlement.settle(delta).await?;

        Ok(TwoLegOutcome::Completed {
            first,
            second,
            treasury,
        })
    }

    /// Re-attempt leg 2 after a `Partial` outcome.
    ///
    /// `first` is the leg-1 outcome returned with the partial result; its
    /// output is the held intermediate amount. Leg 1 is already in the
    /// ledger, so only leg 2 is recorded, but the treasury settles both
    /// legs because a partial run leaves it untouched.
    ///
    /// # Errors
    ///
    /// `Config` if `first` did not produce the plan's intermediate asset,
    /// otherwise any `convert` error. A failed retry changes nothing and
    /// can be attempted again.
    pub async fn retry_second_leg(
        &self,
        plan: &TwoLegPlan,
        first: &LegOutcome,
        context: &TradeContext,
        cancel: &CancellationToken,
    ) -> ExecResult<(LegOutcome, Treasury)> {
        if first.input_mint != plan.source.mint || first.output_mint != plan.intermediate.mint {
            return Err(ExecError::Config(format!(
                "leg {} converted {} → {}, plan expects {} → {}",
                first.signature, first.input_mint, first.output_mint, plan.source, plan.intermediate
            )));
        }

        info!(
            first_signature = %first.signature,
            held_amount = first.out_amount,
            intermediate = %plan.intermediate,
            "Retrying second leg"
        );
        let second = self
            .convert(&plan.intermediate, &plan.target, first.out_amount, cancel)
            .await?;
        self.settlement
            .record_leg(trade_for(context, &plan.intermediate, &plan.target, &second))
            .await?;

        let delta = TreasuryDelta::two_leg(
            &plan.source,
            &plan.intermediate,
            &plan.target,
            (first.in_amount, first.out_amount),
            (second.in_amount, second.out_amount),
        );
        let treasury = self.settlement.settle(delta).await?;
        Ok((second, treasury))
    }

    /// Seed deposit: SOL → USDC → piggyUSDC attributed to `agent_id`.
    pub async fn deposit(
        &self,
        amount: u64,
        agent_id: AgentId,
        cancel: &CancellationToken,
    ) -> ExecResult<TwoLegOutcome> {
        self.convert_two_leg(
            &TwoLegPlan::sol_to_piggy(),
            amount,
            &TradeContext::seed_deposit(agent_id),
            cancel,
        )
        .await
    }

    /// Returns false if cancelled during the pause.
    async fn pause_between_legs(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        if self.config.leg_pause.is_zero() {
            return true;
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.leg_pause) => true,
        }
    }
}

fn trade_for(context: &TradeContext, input: &Asset, output: &Asset, leg: &LegOutcome) -> Trade {
    let operation = format!("{}-{}-{}", context.operation, input.symbol, output.symbol).to_lowercase();
    Trade {
        id: Trade::new_id(&operation),
        thesis_id: context.thesis_id.clone(),
        agent_id: context.agent_id,
        input_mint: leg.input_mint.clone(),
        output_mint: leg.output_mint.clone(),
        amount_in: leg.in_amount,
        amount_out: leg.out_amount,
        tx_signature: leg.signature.clone(),
        timestamp: chrono::Utc::now(),
    }
}

// =============================================================================
// Tests
// =============================================================================
