//! Jupiter Ultra API client (order + execute)
//!
//! - `GET /order` prices a swap and returns an unsigned transaction
//! - `POST /execute` submits the signed transaction on our behalf
//!
//! # Authentication
//!
//! Every request carries the `x-api-key` header.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use syndicate_domain::Mint;
use syndicate_exec::{ExecError, ExecuteReply, Order, OrderPort};

use crate::amount::WireAmount;

// =============================================================================
// Constants
// =============================================================================

/// Jupiter Ultra API base URL
pub const DEFAULT_ULTRA_URL: &str = "https://api.jup.ag/ultra/v1";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the Jupiter clients.
#[derive(Debug, Clone, Error)]
pub enum JupiterError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// API returned a non-success status
    #[error("Jupiter API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// Response did not have the expected shape
    #[error("Unexpected response ({reason}): {body}")]
    InvalidResponse { reason: String, body: String },

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl From<JupiterError> for ExecError {
    fn from(err: JupiterError) -> Self {
        match err {
            JupiterError::Api { status, body } => ExecError::routing(status, body),
            JupiterError::InvalidResponse { reason, body } => {
                ExecError::routing(200, format!("{reason}: {body}"))
            },
            other => ExecError::routing(0, other.to_string()),
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// `GET /order` response (fields we use)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    in_amount: Option<WireAmount>,
    out_amount: Option<WireAmount>,
    transaction: Option<String>,
    request_id: Option<String>,
    error_message: Option<String>,
}

/// `POST /execute` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    signed_transaction: &'a str,
    request_id: &'a str,
}

/// `POST /execute` response (fields we use)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteResponse {
    signature: Option<String>,
    status: Option<String>,
    total_output_amount: Option<WireAmount>,
    error: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// Jupiter Ultra API client.
pub struct JupiterUltraClient {
    /// HTTP client
    client: Client,
    /// Base URL (no trailing slash)
    base_url: String,
    /// API key
    api_key: String,
}

impl JupiterUltraClient {
    /// Create a client for the public Ultra endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(DEFAULT_ULTRA_URL.to_string(), api_key)
    }

    /// Create a client for a custom endpoint.
    pub fn with_base_url(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Request a priced order.
    ///
    /// # Endpoint
    ///
    /// `GET /order?inputMint&outputMint&amount&taker`
    pub async fn order(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        taker: &str,
    ) -> Result<Order, JupiterError> {
        let url = format!("{}/order", self.base_url);
        let amount_param = amount.to_string();

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client
                .get(&url)
                .header("x-api-key", &self.api_key)
                .query(&[
                    ("inputMint", input.as_str()),
                    ("outputMint", output.as_str()),
                    ("amount", amount_param.as_str()),
                    ("taker", taker),
                ])
                .send(),
        )
        .await
        .map_err(|_| JupiterError::Timeout)?
        .map_err(|e| JupiterError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| JupiterError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(JupiterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_order(input, output, &body)
    }

    /// Submit a signed transaction for execution.
    ///
    /// Non-success statuses are returned as a reply, not an error.
    ///
    /// # Endpoint
    ///
    /// `POST /execute`
    pub async fn execute_signed(
        &self,
        signed_transaction_b64: &str,
        request_id: &str,
    ) -> Result<ExecuteReply, JupiterError> {
        let url = format!("{}/execute", self.base_url);
        let request = ExecuteRequest {
            signed_transaction: signed_transaction_b64,
            request_id,
        };

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .json(&request)
                .send(),
        )
        .await
        .map_err(|_| JupiterError::Timeout)?
        .map_err(|e| JupiterError::RequestFailed(e.to_string()))?;

        let http_status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| JupiterError::RequestFailed(e.to_string()))?;

        // Unparseable bodies classify by status alone
        let parsed: ExecuteResponse = serde_json::from_str(&body).unwrap_or_default();
        debug!(http_status, status = ?parsed.status, "Execute reply");

        Ok(ExecuteReply {
            http_status,
            signature: parsed.signature.filter(|s| !s.is_empty()),
            status: parsed.status,
            total_output_amount: parsed.total_output_amount.as_ref().and_then(WireAmount::to_u64),
            error: parsed.error,
            raw_body: body,
        })
    }
}

fn invalid(reason: impl Into<String>, body: &str) -> JupiterError {
    JupiterError::InvalidResponse {
        reason: reason.into(),
        body: body.to_string(),
    }
}

/// Validate an order body.
fn parse_order(input: &Mint, output: &Mint, body: &str) -> Result<Order, JupiterError> {
    let parsed: OrderResponse =
        serde_json::from_str(body).map_err(|e| invalid(format!("invalid JSON: {e}"), body))?;

    let transaction = match parsed.transaction.as_deref().filter(|t| !t.is_empty()) {
        Some(tx) => BASE64
            .decode(tx)
            .map_err(|e| invalid(format!("transaction is not base64: {e}"), body))?,
        None => {
            let reason = parsed
                .error_message
                .unwrap_or_else(|| "order has no transaction".to_string());
            return Err(invalid(reason, body));
        },
    };

    let in_amount = parsed
        .in_amount
        .as_ref()
        .and_then(WireAmount::to_u64)
        .ok_or_else(|| invalid("missing or non-numeric inAmount", body))?;
    let out_amount = parsed
        .out_amount
        .as_ref()
        .and_then(WireAmount::to_u64)
        .ok_or_else(|| invalid("missing or non-numeric outAmount", body))?;
    let request_id = parsed
        .request_id
        .filter(|r| !r.is_empty())
        .ok_or_else(|| invalid("missing requestId", body))?;

    Ok(Order {
        input_mint: input.clone(),
        output_mint: output.clone(),
        in_amount,
        out_amount,
        transaction,
        request_id,
    })
}

#[async_trait]
impl OrderPort for JupiterUltraClient {
    async fn request_order(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        taker: &str,
    ) -> Result<Order, ExecError> {
        Ok(self.order(input, output, amount, taker).await?)
    }

    async fn execute(
        &self,
        signed_transaction_b64: &str,
        request_id: &str,
    ) -> Result<ExecuteReply, ExecError> {
        Ok(self.execute_signed(signed_transaction_b64, request_id).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
