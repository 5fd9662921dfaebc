//! Jupiter quote/swap API client (v6 shape)
//!
//! - `GET /quote` prices a swap
//! - `POST /swap` builds the unsigned transaction for a quote
//!
//! The quote document is echoed back to `/swap` verbatim, so it is kept as
//! raw JSON alongside the parsed amounts.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use syndicate_domain::Mint;
use syndicate_exec::{ExecError, Quote, QuotePort};

use crate::amount::WireAmount;
use crate::jupiter_ultra::JupiterError;

/// Jupiter v6 quote API base URL
pub const DEFAULT_QUOTE_URL: &str = "https://quote-api.jup.ag/v6";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteAmounts {
    in_amount: Option<WireAmount>,
    out_amount: Option<WireAmount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    quote_response: &'a serde_json::Value,
    user_public_key: &'a str,
    wrap_and_unwrap_sol: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: Option<String>,
}

/// Jupiter quote/swap client.
pub struct JupiterQuoteClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl JupiterQuoteClient {
    /// Create a client for `base_url`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Send `x-api-key` with every request.
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, JupiterError> {
        let request = match &self.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        };

        let response = timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), request.send())
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
        Ok(body)
    }

    /// Price a swap.
    ///
    /// # Endpoint
    ///
    /// `GET /quote?inputMint&outputMint&amount&slippageBps`
    pub async fn quote(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, JupiterError> {
        let amount_param = amount.to_string();
        let slippage_param = slippage_bps.to_string();
        let request = self.client.get(format!("{}/quote", self.base_url)).query(&[
            ("inputMint", input.as_str()),
            ("outputMint", output.as_str()),
            ("amount", amount_param.as_str()),
            ("slippageBps", slippage_param.as_str()),
        ]);

        let body = self.send(request).await?;
        parse_quote(input, output, slippage_bps, &body)
    }

    /// Build the unsigned swap transaction for `quote`.
    ///
    /// # Endpoint
    ///
    /// `POST /swap`
    pub async fn swap_transaction(&self, quote: &Quote, taker: &str) -> Result<Vec<u8>, JupiterError> {
        let request = self
            .client
            .post(format!("{}/swap", self.base_url))
            .json(&SwapRequest {
                quote_response: &quote.raw,
                user_public_key: taker,
                wrap_and_unwrap_sol: true,
            });

        let body = self.send(request).await?;
        let parsed: SwapResponse = serde_json::from_str(&body).map_err(|e| JupiterError::InvalidResponse {
            reason: format!("invalid JSON: {e}"),
            body: body.clone(),
        })?;

        let encoded = parsed.swap_transaction.filter(|t| !t.is_empty()).ok_or_else(|| {
            JupiterError::InvalidResponse {
                reason: "missing swapTransaction".to_string(),
                body: body.clone(),
            }
        })?;
        BASE64.decode(encoded).map_err(|e| JupiterError::InvalidResponse {
            reason: format!("swapTransaction is not base64: {e}"),
            body,
        })
    }
}

fn parse_quote(input: &Mint, output: &Mint, slippage_bps: u16, body: &str) -> Result<Quote, JupiterError> {
    let invalid = |reason: String| JupiterError::InvalidResponse {
        reason,
        body: body.to_string(),
    };

    let raw: serde_json::Value =
        serde_json::from_str(body).map_err(|e| invalid(format!("invalid JSON: {e}")))?;
    let amounts: QuoteAmounts =
        serde_json::from_value(raw.clone()).map_err(|e| invalid(format!("unexpected shape: {e}")))?;

    let in_amount = amounts
        .in_amount
        .as_ref()
        .and_then(WireAmount::to_u64)
        .ok_or_else(|| invalid("missing or non-numeric inAmount".to_string()))?;
    let out_amount = amounts
        .out_amount
        .as_ref()
        .and_then(WireAmount::to_u64)
        .ok_or_else(|| invalid("missing or non-numeric outAmount".to_string()))?;

    Ok(Quote {
        input_mint: input.clone(),
        output_mint: output.clone(),
        in_amount,
        out_amount,
        slippage_bps,
        raw,
    })
}

#[async_trait]
impl QuotePort for JupiterQuoteClient {
    async fn get_quote(
        &self,
        input: &Mint,
        output: &Mint,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ExecError> {
        Ok(self.quote(input, output, amount, slippage_bps).await?)
    }

    async fn build_swap_transaction(&self, quote: &Quote, taker: &str) -> Result<Vec<u8>, ExecError> {
        Ok(self.swap_transaction(quote, taker).await?)
    }
}
