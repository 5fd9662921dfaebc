//! Stub implementations for testing.
//!
//! These implementations simulate the routing service and chain RPC
//! without making real network calls. Unsigned transactions they hand out
//! are real wire-format v0 transactions, so signing and broadcast paths
//! run unmodified.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::CompiledInstruction;
use solana_sdk::message::{v0, MessageHeader, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use syndicate_domain::Mint;

use crate::error::ExecError;
use crate::ports::{
    ChainPort, Commitment, ExecuteReply, Order, OrderPort, Quote, QuotePort, SendOptions,
    SignatureStatus,
};
use crate::signer::transaction_id;

/// Build an unsigned v0 transaction with `payer` as its only signer.
///
/// `nonce` seeds the blockhash so distinct calls yield distinct
/// transactions.
pub fn unsigned_transaction(payer: &Pubkey, nonce: u64) -> Vec<u8> {
    let mut blockhash = [0u8; 32];
    blockhash[..8].copy_from_slice(&nonce.to_le_bytes());

    let tx = VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::V0(v0::Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys: vec![*payer, Pubkey::new_from_array([0x06; 32])],
            recent_blockhash: Hash::new_from_array(blockhash),
            instructions: vec![CompiledInstruction {
                program_id_index: 1,
                accounts: vec![0],
                data: nonce.to_le_bytes().to_vec(),
            }],
            address_table_lookups: Vec::new(),
        }),
    };
    // Fixed small shape, always encodable
    bincode::serialize(&tx).unwrap_or_default()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn convert(rates: &HashMap<(String, String), (u64, u64)>, input: &Mint, output: &Mint, amount: u64) -> u64 {
    let (num, den) = rates
        .get(&(input.to_string(), output.to_string()))
        .copied()
        .unwrap_or((1, 1));
    (u128::from(amount) * u128::from(num) / u128::from(den.max(1))) as u64
}

fn taker_key(taker: &str) -> Result<Pubkey, ExecError> {
    Pubkey::from_str(taker)
        .map_err(|_| ExecError::routing(400, format!("{{\"error\":\"invalid taker {taker}\"}}")))
}

// =============================================================================
// Stub Routing (order + execute)
// =============================================================================

/// How `StubRouting::execute` replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteMode {
    /// 200 with the transaction's signature and output amount
    Signature,
    /// 200 without a signature
    Ambiguous,
    /// 200 with status "Failed"
    Failed,
    /// Request never completes
    TransportError,
}

#[derive(Default)]
struct RoutingState {
    execute_mode: Option<ExecuteMode>,
    rates: HashMap<(String, String), (u64, u64)>,
    failing_outputs: Vec<String>,
    orders: HashMap<String, u64>,
    order_count: u64,
    execute_count: u64,
}

/// Stub order/execute routing service.
///
/// Quotes at 1:1 unless a rate is configured.
#[derive(Default)]
pub struct StubRouting {
    state: Mutex<RoutingState>,
}

impl StubRouting {
    /// Create a stub that executes successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote `input → output` at `numerator / denominator`.
    pub fn set_rate(&self, input: &Mint, output: &Mint, numerator: u64, denominator: u64) {
        lock(&self.state)
            .rates
            .insert((input.to_string(), output.to_string()), (numerator, denominator));
    }

    /// Answer every order into `output` with HTTP 500.
    pub fn fail_orders_to(&self, output: &Mint) {
        lock(&self.state).failing_outputs.push(output.to_string());
    }

    /// Serve orders into every output again.
    pub fn clear_order_failures(&self) {
        lock(&self.state).failing_outputs.clear();
    }

    /// Configure the execute reply.
    pub fn set_execute_mode(&self, mode: ExecuteMode) {
        lock(&self.state).execute_mode = Some(mode);
    }

    /// Orders served (including failures).
    pub fn order_count(&self) -> u64 {
        lock(&self.state).order_count
    }

    /// Execute calls received.
    pub fn execute_count(&self) -> u64 {
        lock(&self.state).execute_count
    }
}

#[async_trait]
impl OrderPort for StubRouting {
    async fn request_order(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        taker: &str,
    ) -> Result<Order, ExecError> {
        let payer = taker_key(taker)?;
        let mut state = lock(&self.state);
        state.order_count += 1;

        if state.failing_outputs.iter().any(|m| m == output.as_str()) {
            return Err(ExecError::routing(500, "{\"error\":\"stub routing failure\"}"));
        }

        let out_amount = convert(&state.rates, input, output, amount);
        let request_id = format!("stub-request-{}", state.order_count);
        state.orders.insert(request_id.clone(), out_amount);

        Ok(Order {
            input_mint: input.clone(),
            output_mint: output.clone(),
            in_amount: amount,
            out_amount,
            transaction: unsigned_transaction(&payer, state.order_count),
            request_id,
        })
    }

    async fn execute(
        &self,
        signed_transaction_b64: &str,
        request_id: &str,
    ) -> Result<ExecuteReply, ExecError> {
        let mut state = lock(&self.state);
        state.execute_count += 1;

        let signature = BASE64
            .decode(signed_transaction_b64)
            .ok()
            .and_then(|bytes| transaction_id(&bytes).ok());
        let total_output_amount = state.orders.get(request_id).copied();

        match state.execute_mode.unwrap_or(ExecuteMode::Signature) {
            ExecuteMode::Signature => Ok(ExecuteReply {
                http_status: 200,
                raw_body: format!(
                    "{{\"status\":\"Success\",\"signature\":\"{}\"}}",
                    signature.clone().unwrap_or_default()
                ),
                signature,
                status: Some("Success".to_string()),
                total_output_amount,
                error: None,
            }),
            ExecuteMode::Ambiguous => Ok(ExecuteReply {
                http_status: 200,
                raw_body: "{\"status\":\"Success\"}".to_string(),
                status: Some("Success".to_string()),
                ..ExecuteReply::default()
            }),
            ExecuteMode::Failed => Ok(ExecuteReply {
                http_status: 200,
                raw_body: "{\"status\":\"Failed\",\"error\":\"slippage exceeded\"}".to_string(),
                signature,
                status: Some("Failed".to_string()),
                error: Some("slippage exceeded".to_string()),
                ..ExecuteReply::default()
            }),
            ExecuteMode::TransportError => {
                Err(ExecError::routing(0, "stub connection reset"))
            },
        }
    }
}

// =============================================================================
// Stub Quote Routing (quote + swap)
// =============================================================================

#[derive(Default)]
struct QuoteState {
    rates: HashMap<(String, String), (u64, u64)>,
    failing_outputs: Vec<String>,
    quote_count: u64,
    swap_count: u64,
}

/// Stub quote/swap routing service.
#[derive(Default)]
pub struct StubQuoteRouting {
    state: Mutex<QuoteState>,
}

impl StubQuoteRouting {
    /// Create a stub quoting 1:1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote `input → output` at `numerator / denominator`.
    pub fn set_rate(&self, input: &Mint, output: &Mint, numerator: u64, denominator: u64) {
        lock(&self.state)
            .rates
            .insert((input.to_string(), output.to_string()), (numerator, denominator));
    }

    /// Answer every quote into `output` with HTTP 500.
    pub fn fail_quotes_to(&self, output: &Mint) {
        lock(&self.state).failing_outputs.push(output.to_string());
    }

    /// Quotes served (including failures).
    pub fn quote_count(&self) -> u64 {
        lock(&self.state).quote_count
    }

    /// Swap transactions built.
    pub fn swap_count(&self) -> u64 {
        lock(&self.state).swap_count
    }
}

#[async_trait]
impl QuotePort for StubQuoteRouting {
    async fn get_quote(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ExecError> {
        let mut state = lock(&self.state);
        state.quote_count += 1;
        if state.failing_outputs.iter().any(|m| m == output.as_str()) {
            return Err(ExecError::routing(500, "{\"error\":\"stub quote failure\"}"));
        }

        let out_amount = convert(&state.rates, input, output, amount);
        Ok(Quote {
            input_mint: input.clone(),
            output_mint: output.clone(),
            in_amount: amount,
            out_amount,
            slippage_bps,
            raw: serde_json::json!({
                "inputMint": input.as_str(),
                "outputMint": output.as_str(),
                "inAmount": amount.to_string(),
                "outAmount": out_amount.to_string(),
                "slippageBps": slippage_bps,
                "routePlan": [],
            }),
        })
    }

    async fn build_swap_transaction(&self, _quote: &Quote, taker: &str) -> Result<Vec<u8>, ExecError> {
        let payer = taker_key(taker)?;
        let mut state = lock(&self.state);
        state.swap_count += 1;
        Ok(unsigned_transaction(&payer, 1_000 + state.swap_count))
    }
}

// =============================================================================
// Stub Chain
// =============================================================================

/// How `StubChain` answers status polls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmMode {
    /// Every signature is confirmed
    Confirm,
    /// No signature is ever seen
    Never,
    /// Every signature failed with this error
    Fail(String),
}

struct ChainState {
    balance: u64,
    balance_fails: bool,
    confirm_mode: ConfirmMode,
    send_failures: u32,
    status_failures: u32,
    sent: Vec<Vec<u8>>,
    send_attempts: u32,
    status_polls: u32,
}

/// Stub chain RPC node.
pub struct StubChain {
    state: Mutex<ChainState>,
}

impl StubChain {
    /// Create a stub with a native balance (lamports) that confirms everything.
    pub fn new(balance: u64) -> Self {
        Self {
            state: Mutex::new(ChainState {
                balance,
                balance_fails: false,
                confirm_mode: ConfirmMode::Confirm,
                send_failures: 0,
                status_failures: 0,
                sent: Vec::new(),
                send_attempts: 0,
                status_polls: 0,
            }),
        }
    }

    /// Set the native balance.
    pub fn set_balance(&self, balance: u64) {
        lock(&self.state).balance = balance;
    }

    /// Make balance lookups fail.
    pub fn set_balance_fails(&self, fails: bool) {
        lock(&self.state).balance_fails = fails;
    }

    /// Configure status poll answers.
    pub fn set_confirm_mode(&self, mode: ConfirmMode) {
        lock(&self.state).confirm_mode = mode;
    }

    /// Fail the next `n` broadcasts.
    pub fn fail_next_sends(&self, n: u32) {
        lock(&self.state).send_failures = n;
    }

    /// Fail the next `n` status polls.
    pub fn fail_next_status_polls(&self, n: u32) {
        lock(&self.state).status_failures = n;
    }

    /// Bytes of every accepted broadcast, in order.
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent.clone()
    }

    /// Accepted broadcasts.
    pub fn broadcast_count(&self) -> usize {
        lock(&self.state).sent.len()
    }

    /// Broadcast attempts (including failures).
    pub fn send_attempts(&self) -> u32 {
        lock(&self.state).send_attempts
    }

    /// Status polls received.
    pub fn status_polls(&self) -> u32 {
        lock(&self.state).status_polls
    }
}

#[async_trait]
impl ChainPort for StubChain {
    async fn get_balance(&self, _address: &str) -> Result<u64, ExecError> {
        let state = lock(&self.state);
        if state.balance_fails {
            return Err(ExecError::Rpc("stub balance failure".to_string()));
        }
        Ok(state.balance)
    }

    async fn send_transaction(
        &self,
        transaction: &[u8],
        _options: &SendOptions,
    ) -> Result<String, ExecError> {
        let mut state = lock(&self.state);
        state.send_attempts += 1;
        if state.send_failures > 0 {
            state.send_failures -= 1;
            return Err(ExecError::Rpc("stub send failure".to_string()));
        }

        let signature = transaction_id(transaction)?;
        state.sent.push(transaction.to_vec());
        Ok(signature)
    }

    async fn signature_status(
        &self,
        _signature: &str,
    ) -> Result<Option<SignatureStatus>, ExecError> {
        let mut state = lock(&self.state);
        state.status_polls += 1;
        if state.status_failures > 0 {
            state.status_failures -= 1;
            return Err(ExecError::Rpc("stub status failure".to_string()));
        }

        Ok(match &state.confirm_mode {
            ConfirmMode::Confirm => Some(SignatureStatus {
                slot: 1,
                confirmation: Some(Commitment::Confirmed),
                err: None,
            }),
            ConfirmMode::Never => None,
            ConfirmMode::Fail(reason) => Some(SignatureStatus {
                slot: 1,
                confirmation: Some(Commitment::Processed),
                err: Some(reason.clone()),
            }),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
