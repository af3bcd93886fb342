//! Solana JSON-RPC account reader.

use std::future::Future;
use std::time::Duration;

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use super::config::ClientConfig;
use super::error::ClientError;
use super::fetch::AccountFetcher;

/// A fetched account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    /// Slot the node answered at.
    pub slot: u64,

    /// Program that owns the account.
    pub owner: Pubkey,

    /// Balance in lamports.
    pub lamports: u64,

    /// Raw account bytes.
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcContext {
    slot: u64,
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    context: RpcContext,
    value: Option<RpcAccount>,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    data: (String, String),
    owner: String,
    lamports: u64,
}

/// JSON-RPC client for account reads.
#[derive(Debug, Clone)]
pub struct RpcClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl RpcClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self { config, http })
    }

    /// Creates a client for the given endpoint with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_url(rpc_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(ClientConfig::new(rpc_url))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches an account with `getAccountInfo`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccountNotFound` if the account does not exist,
    /// `ClientError::Rpc` for an error object, and transport errors once
    /// retries are exhausted.
    pub async fn get_account(&self, address: &Pubkey) -> Result<AccountData, ClientError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "getAccountInfo",
            params: json!([
                address.to_string(),
                { "encoding": "base64", "commitment": self.config.commitment.as_str() }
            ]),
        };

        let body = self.post_with_retry(&request).await?;
        let account = parse_account_info(&body, address)?;
        debug!(
            %address,
            slot = account.slot,
            len = account.data.len(),
            "fetched account"
        );
        Ok(account)
    }

    /// Posts a JSON-RPC request, retrying timeouts, transport failures and
    /// 429 responses up to `max_retries` times.
    async fn post_with_retry(&self, request: &RpcRequest) -> Result<String, ClientError> {
        let mut retry_count = 0;

        loop {
            let result = self.post_once(request).await;
            match result {
                Err(e) if e.is_retryable() && retry_count < self.config.max_retries => {
                    retry_count += 1;
                    let wait = match &e {
                        ClientError::RateLimited {
                            retry_after: Some(secs),
                        } => Duration::from_secs(*secs),
                        _ => Duration::from_millis(100u64 << retry_count.min(10)),
                    };
                    warn!(
                        method = request.method,
                        attempt = retry_count,
                        error = %e,
                        "rpc request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                other => return other,
            }
        }
    }

    async fn post_once(&self, request: &RpcRequest) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(&self.config.rpc_url)
            .json(request)
            .send()
            .await?;
        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(ClientError::RateLimited { retry_after });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Rpc {
                code: i64::from(status.as_u16()),
                message: body,
            });
        }
        Ok(body)
    }
}

impl AccountFetcher for RpcClient {
    fn get_account_data(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<Vec<u8>, ClientError>> + Send {
        let address = *address;
        async move { self.get_account(&address).await.map(|a| a.data) }
    }
}

/// Parses a `getAccountInfo` response body.
fn parse_account_info(body: &str, address: &Pubkey) -> Result<AccountData, ClientError> {
    let response: RpcResponse<AccountInfoResult> =
        serde_json::from_str(body).map_err(|e| ClientError::Deserialization(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ClientError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| ClientError::Deserialization("missing result".to_string()))?;
    let account = result
        .value
        .ok_or_else(|| ClientError::AccountNotFound(address.to_string()))?;

    let (encoded, encoding) = account.data;
    if encoding != "base64" {
        return Err(ClientError::Deserialization(format!(
            "unexpected encoding {}",
            encoding
        )));
    }
    let data = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    let owner = crate::codec::parse_pubkey(&account.owner)?;

    Ok(AccountData {
        slot: result.context.slot,
        owner,
        lamports: account.lamports,
        data,
    })
}
