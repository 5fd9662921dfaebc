//! Solana RPC adapter
//!
//! Wraps the nonblocking `RpcClient` behind `ChainPort`: balance lookups,
//! raw transaction broadcast and signature status polling.

use async_trait::async_trait;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use syndicate_exec::{
    decode_transaction, ChainPort, Commitment, ExecError, SendOptions, SignatureStatus,
};

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the RPC adapter.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Transport, HTTP or JSON-RPC failure reported by the client
    #[error("RPC request failed: {0}")]
    Client(String),

    /// Address is not a base58 public key
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Signature is not a base58 ed25519 signature
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Bytes are not a wire-format transaction
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        RpcError::Client(err.to_string())
    }
}

impl From<RpcError> for ExecError {
    fn from(err: RpcError) -> Self {
        ExecError::Rpc(err.to_string())
    }
}

fn commitment_level(commitment: Commitment) -> CommitmentLevel {
    match commitment {
        Commitment::Processed => CommitmentLevel::Processed,
        Commitment::Confirmed => CommitmentLevel::Confirmed,
        Commitment::Finalized => CommitmentLevel::Finalized,
    }
}

// =============================================================================
// Client
// =============================================================================

/// Solana RPC client.
pub struct SolanaRpcClient {
    client: RpcClient,
}

impl SolanaRpcClient {
    /// Create a client for the node at `url`.
    pub fn new(url: String) -> Self {
        Self {
            client: RpcClient::new_with_timeout_and_commitment(
                url,
                Duration::from_secs(REQUEST_TIMEOUT_SECS),
                CommitmentConfig::confirmed(),
            ),
        }
    }

    /// Balance in lamports.
    pub async fn balance(&self, address: &str) -> Result<u64, RpcError> {
        let pubkey = Pubkey::from_str(address)
            .map_err(|e| RpcError::InvalidAddress(format!("{address}: {e}")))?;
        let balance = self
            .client
            .get_balance_with_commitment(&pubkey, CommitmentConfig::confirmed())
            .await?
            .value;
        debug!(address, balance, "Fetched balance");
        Ok(balance)
    }

    /// Broadcast a signed transaction.
    pub async fn send(&self, transaction: &[u8], options: &SendOptions) -> Result<String, RpcError> {
        let tx = decode_transaction(transaction)
            .map_err(|e| RpcError::InvalidTransaction(e.to_string()))?;
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(commitment_level(options.preflight_commitment)),
            max_retries: options.max_retries.map(|n| n as usize),
            ..RpcSendTransactionConfig::default()
        };
        let signature = self.client.send_transaction_with_config(&tx, config).await?;
        debug!(%signature, "Transaction broadcast");
        Ok(signature.to_string())
    }

    /// Status of one signature, searching full history.
    pub async fn status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
        let parsed = Signature::from_str(signature)
            .map_err(|e| RpcError::InvalidSignature(format!("{signature}: {e}")))?;
        let statuses = self
            .client
            .get_signature_statuses_with_history(&[parsed])
            .await?
            .value;

        Ok(statuses.into_iter().next().flatten().map(|status| {
            let confirmation = if status.satisfies_commitment(CommitmentConfig::finalized()) {
                Commitment::Finalized
            } else if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                Commitment::Confirmed
            } else {
                Commitment::Processed
            };
            SignatureStatus {
                slot: status.slot,
                confirmation: Some(confirmation),
                err: status.err.map(|e| e.to_string()),
            }
        }))
    }
}

#[async_trait]
impl ChainPort for SolanaRpcClient {
    async fn get_balance(&self, address: &str) -> Result<u64, ExecError> {
        Ok(self.balance(address).await?)
    }

    async fn send_transaction(
        &self,
        transaction: &[u8],
        options: &SendOptions,
    ) -> Result<String, ExecError> {
        Ok(self.send(transaction, options).await?)
    }

    async fn signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, ExecError> {
        Ok(self.status(signature).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::routing::post;
    use axum::{Json, Router};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde_json::{json, Value};
    use syndicate_exec::stub::unsigned_transaction;
    use syndicate_exec::{sign_transaction, transaction_id, Keypair};

    fn sig(n: u8) -> String {
        Signature::from([n; 64]).to_string()
    }

    fn wallet() -> String {
        Pubkey::new_from_array([1u8; 32]).to_string()
    }

    fn rpc_error(id: Value, code: i64, message: &str) -> Json<Value> {
        Json(json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}}))
    }

    /// Minimal RPC node: answers by method name.
    async fn node(Json(req): Json<Value>) -> Json<Value> {
        let id = req["id"].clone();
        let result = match req["method"].as_str().unwrap_or("") {
            "getVersion" => json!({"solana-core": "2.2.0", "feature-set": 1}),
            "getBalance" => {
                if req["params"][1]["commitment"] != "confirmed" {
                    return rpc_error(id, -32602, "bad commitment");
                }
                json!({"context": {"slot": 1}, "value": 20_000_000u64})
            },
            "sendTransaction" => {
                let config = &req["params"][1];
                if config["encoding"] != "base64"
                    || config["skipPreflight"] != false
                    || config["preflightCommitment"] != "confirmed"
                    || config["maxRetries"] != 3
                {
                    return rpc_error(id, -32602, "bad config");
                }
                let bytes = BASE64
                    .decode(req["params"][0].as_str().unwrap_or(""))
                    .unwrap_or_default();
                match transaction_id(&bytes) {
                    Ok(signature) => json!(signature),
                    Err(_) => return rpc_error(id, -32602, "bad transaction"),
                }
            },
            "getSignatureStatuses" => {
                if req["params"][1]["searchTransactionHistory"] != true {
                    return rpc_error(id, -32602, "no history");
                }
                let requested = req["params"][0][0].as_str().unwrap_or("").to_string();
                if requested == sig(1) {
                    json!({"context": {"slot": 1}, "value": [null]})
                } else if requested == sig(2) {
                    let err = json!({"InstructionError": [0, {"Custom": 1}]});
                    json!({"context": {"slot": 1}, "value": [{
                        "slot": 7, "confirmations": 0, "confirmationStatus": "processed",
                        "status": {"Err": err}, "err": err
                    }]})
                } else {
                    json!({"context": {"slot": 1}, "value": [{
                        "slot": 9, "confirmations": null, "confirmationStatus": "finalized",
                        "status": {"Ok": null}, "err": null
                    }]})
                }
            },
            _ => return rpc_error(id, -32601, "Method not found"),
        };
        Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
    }

    async fn client() -> SolanaRpcClient {
        SolanaRpcClient::new(serve(Router::new().route("/", post(node))).await)
    }

    fn signed_transaction() -> (Vec<u8>, String) {
        let kp = Keypair::from_seed(&[4u8; 32]).unwrap();
        let signed = sign_transaction(&unsigned_transaction(&kp.pubkey(), 1), &kp).unwrap();
        (signed.bytes, signed.signature)
    }

    #[tokio::test]
    async fn test_get_balance() {
        let rpc = client().await;
        assert_eq!(rpc.get_balance(&wallet()).await.unwrap(), 20_000_000);

        let err = rpc.get_balance("not-a-key").await.unwrap_err();
        assert!(matches!(err, ExecError::Rpc(msg) if msg.contains("Invalid address")));
    }

    #[tokio::test]
    async fn test_send_transaction_config() {
        let rpc = client().await;
        let (bytes, expected) = signed_transaction();
        let sig = rpc
            .send_transaction(&bytes, &SendOptions::default())
            .await
            .unwrap();
        assert_eq!(sig, expected);

        let no_retries = SendOptions {
            max_retries: None,
            ..SendOptions::default()
        };
        let err = rpc.send_transaction(&bytes, &no_retries).await.unwrap_err();
        assert!(matches!(err, ExecError::Rpc(msg) if msg.contains("bad config")));
    }

    #[tokio::test]
    async fn test_send_rejects_garbage_before_network() {
        let rpc = client().await;
        let err = rpc
            .send_transaction(&[1, 2, 3], &SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Rpc(msg) if msg.contains("Invalid transaction")));
    }

    #[tokio::test]
    async fn test_signature_statuses() {
        let rpc = client().await;

        assert_eq!(rpc.signature_status(&sig(1)).await.unwrap(), None);

        let done = rpc.signature_status(&sig(3)).await.unwrap().unwrap();
        assert_eq!(done.slot, 9);
        assert_eq!(done.confirmation, Some(Commitment::Finalized));
        assert_eq!(done.err, None);

        let failed = rpc.signature_status(&sig(2)).await.unwrap().unwrap();
        assert_eq!(failed.confirmation, Some(Commitment::Processed));
        assert!(failed.err.unwrap().contains("Instruction 0"));

        assert!(rpc.signature_status("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_http_error_is_rpc_error() {
        let app = Router::new().route(
            "/",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let rpc = SolanaRpcClient::new(serve(app).await);
        let err = rpc.get_balance(&wallet()).await.unwrap_err();
        assert!(matches!(err, ExecError::Rpc(msg) if msg.contains("503")));
    }
}
