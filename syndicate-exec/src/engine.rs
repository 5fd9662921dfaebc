//! Submission & confirmation engine.
//!
//! Hands a signed transaction to the routing service's execute endpoint,
//! falls back to broadcasting it directly when the service's reply is
//! ambiguous, and waits for chain confirmation.
//!
//! # Flow
//!
//! ```text
//! execute ─┬─ ServiceConfirmed ──────────────┬─→ wait for confirmation
//!          ├─ ServiceRejected → error        │
//!          └─ Ambiguous → direct broadcast ──┘
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExecError, ExecResult};
use crate::journal::{ExecutionJournal, ExecutionState};
use crate::ports::{ChainPort, Commitment, ExecuteOutcome, OrderPort, SendOptions};
use crate::signer::SignedTransaction;

// =============================================================================
// Types
// =============================================================================

/// How the transaction reached the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionPath {
    /// Routing service executed it and reported the signature
    Service,
    /// We broadcast it to the RPC node ourselves
    DirectBroadcast,
}

/// Result of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Transaction signature
    pub signature: String,
    /// Submission path taken
    pub via: SubmissionPath,
    /// Whether the target commitment was observed
    pub confirmed: bool,
    /// Output amount reported by the service, if any
    pub reported_output: Option<u64>,
}

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Commitment that counts as confirmed
    pub commitment: Commitment,
    /// Delay between status polls
    pub poll_interval: Duration,
    /// Give up waiting for confirmation after this long
    pub confirm_timeout: Duration,
    /// Direct broadcast attempts
    pub broadcast_attempts: u32,
    /// Base delay between broadcast attempts (multiplied by attempt number)
    pub broadcast_backoff: Duration,
    /// Options passed to `sendTransaction`
    pub send_options: SendOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            poll_interval: Duration::from_millis(500),
            confirm_timeout: Duration::from_secs(90),
            broadcast_attempts: 3,
            broadcast_backoff: Duration::from_millis(500),
            send_options: SendOptions::default(),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Submits signed transactions and waits for confirmation.
pub struct SubmissionEngine<C: ChainPort> {
    chain: Arc<C>,
    journal: Arc<ExecutionJournal>,
    config: EngineConfig,
}

impl<C: ChainPort> SubmissionEngine<C> {
    /// Create a new engine.
    pub fn new(chain: Arc<C>, journal: Arc<ExecutionJournal>, config: EngineConfig) -> Self {
        Self {
            chain,
            journal,
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute through the routing service, falling back to direct
    /// broadcast on an ambiguous reply, then wait for confirmation.
    ///
    /// A request id is executed at most once per process.
    ///
    /// # Errors
    ///
    /// - `AlreadyExecuted` if `request_id` was used before
    /// - `ExecutionRejected` on an explicit refusal or transport failure
    /// - `Broadcast` if every fallback broadcast attempt failed
    /// - `TransactionFailed` if the chain reports an execution error
    pub async fn submit_and_confirm(
        &self,
        venue: &dyn OrderPort,
        signed: &SignedTransaction,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> ExecResult<Submission> {
        self.journal.begin(request_id)?;

        let result = self.execute_via_service(venue, signed, request_id, cancel).await;

        let state = match &result {
            Ok(sub) if sub.confirmed => ExecutionState::Confirmed {
                signature: sub.signature.clone(),
            },
            Ok(sub) => ExecutionState::Unconfirmed {
                signature: sub.signature.clone(),
            },
            Err(e) => ExecutionState::Failed {
                reason: e.to_string(),
            },
        };
        self.journal.complete(request_id, state)?;
        result
    }

    async fn execute_via_service(
        &self,
        venue: &dyn OrderPort,
        signed: &SignedTransaction,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> ExecResult<Submission> {
        let encoded = BASE64.encode(&signed.bytes);

        let reply = venue.execute(&encoded, request_id).await.map_err(|e| {
            warn!(%request_id, error = %e, "Execute request failed");
            ExecError::ExecutionRejected {
                body: e.to_string(),
            }
        })?;

        match ExecuteOutcome::classify(&reply) {
            ExecuteOutcome::ServiceConfirmed {
                signature,
                total_output,
            } => {
                info!(%request_id, %signature, "Routing service executed transaction");
                let confirmed = self.wait_for_confirmation(&signature, cancel).await?;
                Ok(Submission {
                    signature,
                    via: SubmissionPath::Service,
                    confirmed,
                    reported_output: total_output,
                })
            },
            ExecuteOutcome::ServiceRejected { body } => {
                warn!(%request_id, http_status = reply.http_status, %body, "Routing service rejected execution");
                Err(ExecError::ExecutionRejected { body })
            },
            ExecuteOutcome::Ambiguous { body } => {
                warn!(
                    %request_id,
                    http_status = reply.http_status,
                    %body,
                    "Execute reply carried no signature, broadcasting directly"
                );
                let signature = self.broadcast(&signed.bytes).await?;
                let confirmed = self.wait_for_confirmation(&signature, cancel).await?;
                Ok(Submission {
                    signature,
                    via: SubmissionPath::DirectBroadcast,
                    confirmed,
                    reported_output: None,
                })
            },
        }
    }

    /// Broadcast directly and wait for confirmation.
    ///
    /// Used with routing services that have no execute endpoint.
    pub async fn broadcast_and_confirm(
        &self,
        signed: &SignedTransaction,
        cancel: &CancellationToken,
    ) -> ExecResult<Submission> {
        let signature = self.broadcast(&signed.bytes).await?;
        let confirmed = self.wait_for_confirmation(&signature, cancel).await?;
        Ok(Submission {
            signature,
            via: SubmissionPath::DirectBroadcast,
            confirmed,
            reported_output: None,
        })
    }

    /// Send the same signed bytes up to `broadcast_attempts` times.
    async fn broadcast(&self, bytes: &[u8]) -> ExecResult<String> {
        let attempts = self.config.broadcast_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self
                .chain
                .send_transaction(bytes, &self.config.send_options)
                .await
            {
                Ok(signature) => {
                    info!(%signature, attempt, "Transaction broadcast");
                    return Ok(signature);
                },
                Err(e) => {
                    warn!(attempt, max_attempts = attempts, error = %e, "Broadcast attempt failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.config.broadcast_backoff * attempt).await;
                    }
                },
            }
        }

        Err(ExecError::Broadcast {
            attempts,
            last_error,
        })
    }

    /// Poll the signature until it reaches the configured commitment.
    ///
    /// Returns `Ok(false)` on timeout or cancellation ("submitted but not
    /// confirmed"). Transient RPC errors are logged and polling continues.
    ///
    /// # Errors
    ///
    /// `ExecError::TransactionFailed` if the chain reports an error.
    pub async fn wait_for_confirmation(
        &self,
        signature: &str,
        cancel: &CancellationToken,
    ) -> ExecResult<bool> {
        let deadline = tokio::time::Instant::now() + self.config.confirm_timeout;

        loop {
            match self.chain.signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(reason) = status.err {
                        warn!(%signature, %reason, "Transaction failed on chain");
                        return Err(ExecError::TransactionFailed {
                            signature: signature.to_string(),
                            reason,
                        });
                    }
                    if status.confirmation >= Some(self.config.commitment) {
                        info!(%signature, slot = status.slot, "Transaction confirmed");
                        return Ok(true);
                    }
                    debug!(%signature, confirmation = ?status.confirmation, "Awaiting commitment");
                },
                Ok(None) => debug!(%signature, "Signature not yet visible"),
                Err(e) => warn!(%signature, error = %e, "Status poll failed, retrying"),
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                warn!(%signature, timeout_secs = self.config.confirm_timeout.as_secs(), "Confirmation timed out");
                return Ok(false);
            }
            let pause = self.config.poll_interval.min(deadline - now);

            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(%signature, "Confirmation wait cancelled");
                    return Ok(false);
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{sign_transaction, Keypair};
    use crate::stub::{unsigned_transaction, ConfirmMode, ExecuteMode, StubChain, StubRouting};

    fn fast_config() -> EngineConfig {
        EngineConfig {
            poll_interval: Duration::from_millis(5),
            confirm_timeout: Duration::from_millis(100),
            broadcast_backoff: Duration::from_millis(1),
            ..EngineConfig::default()
        }
    }

    fn setup(chain: StubChain) -> (SubmissionEngine<StubChain>, Arc<StubChain>, SignedTransaction) {
        let kp = Keypair::from_seed(&[3u8; 32]).unwrap();
        let signed = sign_transaction(&unsigned_transaction(&kp.pubkey(), 1), &kp).unwrap();
        let chain = Arc::new(chain);
        let engine = SubmissionEngine::new(
            chain.clone(),
            Arc::new(ExecutionJournal::new()),
            fast_config(),
        );
        (engine, chain, signed)
    }

    #[tokio::test]
    async fn test_service_signature_skips_broadcast() {
        let (engine, chain, signed) = setup(StubChain::new(0));
        let routing = StubRouting::new();

        let sub = engine
            .submit_and_confirm(&routing, &signed, "req-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sub.via, SubmissionPath::Service);
        assert_eq!(sub.signature, signed.signature);
        assert!(sub.confirmed);
        assert_eq!(chain.broadcast_count(), 0);
        assert_eq!(routing.execute_count(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_reply_broadcasts_same_bytes() {
        let (engine, chain, signed) = setup(StubChain::new(0));
        let routing = StubRouting::new();
        routing.set_execute_mode(ExecuteMode::Ambiguous);

        let sub = engine
            .submit_and_confirm(&routing, &signed, "req-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sub.via, SubmissionPath::DirectBroadcast);
        assert!(sub.confirmed);
        assert_eq!(sub.reported_output, None);
        assert_eq!(chain.broadcasts(), vec![signed.bytes.clone()]);
        assert_eq!(sub.signature, signed.signature);
    }

    #[tokio::test]
    async fn test_failed_status_is_rejected_without_broadcast() {
        let (engine, chain, signed) = setup(StubChain::new(0));
        let routing = StubRouting::new();
        routing.set_execute_mode(ExecuteMode::Failed);

        let err = engine
            .submit_and_confirm(&routing, &signed, "req-1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::ExecutionRejected { .. }));
        assert_eq!(chain.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_is_rejected() {
        let (engine, chain, signed) = setup(StubChain::new(0));
        let routing = StubRouting::new();
        routing.set_execute_mode(ExecuteMode::TransportError);

        let err = engine
            .submit_and_confirm(&routing, &signed, "req-1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::ExecutionRejected { .. }));
        assert_eq!(chain.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_request_id_executed_once() {
        let (engine, _chain, signed) = setup(StubChain::new(0));
        let routing = StubRouting::new();
        let cancel = CancellationToken::new();

        engine.submit_and_confirm(&routing, &signed, "req-1", &cancel).await.unwrap();
        let err = engine
            .submit_and_confirm(&routing, &signed, "req-1", &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::AlreadyExecuted(_)));
        assert_eq!(routing.execute_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_retries_then_succeeds() {
        let chain = StubChain::new(0);
        chain.fail_next_sends(2);
        let (engine, chain, signed) = setup(chain);

        let sub = engine
            .broadcast_and_confirm(&signed, &CancellationToken::new())
            .await
            .unwrap();

        assert!(sub.confirmed);
        assert_eq!(chain.send_attempts(), 3);
        assert_eq!(chain.broadcast_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_gives_up_after_three_attempts() {
        let chain = StubChain::new(0);
        chain.fail_next_sends(5);
        let (engine, chain, signed) = setup(chain);

        let err = engine
            .broadcast_and_confirm(&signed, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Broadcast { attempts: 3, .. }));
        assert_eq!(chain.send_attempts(), 3);
    }

    #[tokio::test]
    async fn test_unconfirmed_on_timeout() {
        let chain = StubChain::new(0);
        chain.set_confirm_mode(ConfirmMode::Never);
        let (engine, _chain, signed) = setup(chain);

        let sub = engine
            .broadcast_and_confirm(&signed, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!sub.confirmed);
    }

    #[tokio::test]
    async fn test_unconfirmed_on_cancel() {
        let chain = StubChain::new(0);
        chain.set_confirm_mode(ConfirmMode::Never);
        let kp = Keypair::from_seed(&[3u8; 32]).unwrap();
        let signed = sign_transaction(&unsigned_transaction(&kp.pubkey(), 1), &kp).unwrap();
        let engine = SubmissionEngine::new(
            Arc::new(chain),
            Arc::new(ExecutionJournal::new()),
            EngineConfig {
                poll_interval: Duration::from_millis(5),
                confirm_timeout: Duration::from_secs(3600),
                ..EngineConfig::default()
            },
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let sub = engine.broadcast_and_confirm(&signed, &cancel).await.unwrap();
        assert!(!sub.confirmed);
    }

    #[tokio::test]
    async fn test_chain_error_is_transaction_failed() {
        let chain = StubChain::new(0);
        chain.set_confirm_mode(ConfirmMode::Fail("InstructionError".to_string()));
        let (engine, _chain, signed) = setup(chain);

        let err = engine
            .broadcast_and_confirm(&signed, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::TransactionFailed { reason, .. } if reason == "InstructionError"));
    }

    #[tokio::test]
    async fn test_transient_poll_errors_are_retried() {
        let chain = StubChain::new(0);
        chain.fail_next_status_polls(3);
        let (engine, chain, signed) = setup(chain);

        let sub = engine
            .broadcast_and_confirm(&signed, &CancellationToken::new())
            .await
            .unwrap();
        assert!(sub.confirmed);
        assert!(chain.status_polls() >= 4);
    }
}
