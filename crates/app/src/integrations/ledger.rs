//! Ledger gateway client.
//!
//! The ledger is reached through an HTTP gateway that owns the contract
//! signer. Submissions from one process are serialised so the signer's nonce
//! sequence is never contended locally.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::identities::models::WalletAddress;

/// Connection settings for the ledger gateway.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Gateway base URL, e.g. `"https://ledger.internal"`.
    pub gateway_url: String,

    /// Bearer credential presented to the gateway.
    pub api_key: String,

    /// Per-request timeout; block confirmation can take tens of seconds.
    pub timeout: Duration,
}

/// Optional geographic attributes recorded with an attendance mint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MintLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// A credential to mint for `wallet`.
#[derive(Debug, Clone, PartialEq)]
pub struct MintRequest {
    pub wallet: WalletAddress,
    pub content_hash: String,
    pub location: Option<MintLocation>,
}

/// Result of a confirmed mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx_ref: String,
    pub token_id: String,
}

/// On-ledger state of a content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LedgerStatus {
    pub exists: bool,
    pub revoked: bool,
}

/// Errors returned by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No gateway was configured for this process.
    #[error("ledger is not configured")]
    Unconfigured,

    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-2xx status.
    #[error("ledger gateway rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The gateway answered 2xx with an unusable body.
    #[error("unexpected response from ledger gateway: {0}")]
    UnexpectedResponse(String),
}

/// Mint, revoke and query ledger-anchored credentials.
#[automock]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Mint a credential token bound to `request.content_hash`.
    async fn mint(&self, request: MintRequest) -> Result<MintReceipt, LedgerError>;

    /// Revoke the credential anchored at `content_hash`, returning the transaction reference.
    async fn revoke(&self, content_hash: String) -> Result<String, LedgerError>;

    /// Whether a credential exists for `content_hash` and whether it was revoked.
    async fn is_valid(&self, content_hash: String) -> Result<LedgerStatus, LedgerError>;
}

/// Ledger used when no gateway is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredLedger;

#[async_trait]
impl Ledger for UnconfiguredLedger {
    async fn mint(&self, _request: MintRequest) -> Result<MintReceipt, LedgerError> {
        Err(LedgerError::Unconfigured)
    }

    async fn revoke(&self, _content_hash: String) -> Result<String, LedgerError> {
        Err(LedgerError::Unconfigured)
    }

    async fn is_valid(&self, _content_hash: String) -> Result<LedgerStatus, LedgerError> {
        Err(LedgerError::Unconfigured)
    }
}

/// HTTP client for the ledger gateway.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    config: LedgerConfig,
    http: Client,
    submissions: Arc<Mutex<()>>,
}

impl HttpLedger {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            http,
            submissions: Arc::new(Mutex::new(())),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.config.gateway_url.trim_end_matches('/'))
    }

    async fn ensure_success(response: Response) -> Result<Response, LedgerError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Err(LedgerError::Rejected { status, body })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MintBody<'a> {
    wallet: String,
    content_hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<MintLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintResponse {
    tx_hash: String,
    token_id: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RevokeBody<'a> {
    content_hash: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokeResponse {
    tx_hash: String,
}

/// Token ids may come back as JSON numbers or strings.
fn token_id_from_value(value: Value) -> Result<String, LedgerError> {
    match value {
        Value::String(id) if !id.is_empty() => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(LedgerError::UnexpectedResponse(format!(
            "token id {other} is not a string or number"
        ))),
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn mint(&self, request: MintRequest) -> Result<MintReceipt, LedgerError> {
        let body = MintBody {
            wallet: request.wallet.to_string(),
            content_hash: &request.content_hash,
            location: request.location,
        };

        let _submission = self.submissions.lock().await;

        let response = self
            .http
            .post(self.url("mint"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: MintResponse = Self::ensure_success(response).await?.json().await?;

        let receipt = MintReceipt {
            tx_ref: parsed.tx_hash,
            token_id: token_id_from_value(parsed.token_id)?,
        };

        info!(
            wallet = %request.wallet,
            content_hash = %request.content_hash,
            tx_ref = %receipt.tx_ref,
            token_id = %receipt.token_id,
            "minted credential"
        );

        Ok(receipt)
    }

    async fn revoke(&self, content_hash: String) -> Result<String, LedgerError> {
        let _submission = self.submissions.lock().await;

        let response = self
            .http
            .post(self.url("revoke"))
            .bearer_auth(&self.config.api_key)
            .json(&RevokeBody {
                content_hash: &content_hash,
            })
            .send()
            .await?;

        let parsed: RevokeResponse = Self::ensure_success(response).await?.json().await?;

        info!(%content_hash, tx_ref = %parsed.tx_hash, "revoked credential");

        Ok(parsed.tx_hash)
    }

    async fn is_valid(&self, content_hash: String) -> Result<LedgerStatus, LedgerError> {
        let response = self
            .http
            .get(self.url(&format!("credentials/{content_hash}")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn token_id_accepts_numbers_and_strings() -> TestResult {
        assert_eq!(token_id_from_value(json!(42))?, "42");
        assert_eq!(token_id_from_value(json!("0x2a"))?, "0x2a");

        Ok(())
    }

    #[test]
    fn token_id_rejects_other_shapes() {
        let result = token_id_from_value(json!(null));

        assert!(
            matches!(result, Err(LedgerError::UnexpectedResponse(_))),
            "expected UnexpectedResponse, got {result:?}"
        );
    }

    #[test]
    fn mint_body_omits_absent_location() -> TestResult {
        let body = MintBody {
            wallet: "0x52908400098527886E0F7030069857D2E4169EE7".to_string(),
            content_hash: "0xabc",
            location: None,
        };

        assert_eq!(
            serde_json::to_value(&body)?,
            json!({
                "wallet": "0x52908400098527886E0F7030069857D2E4169EE7",
                "contentHash": "0xabc",
            })
        );

        Ok(())
    }

    #[test]
    fn url_joins_without_double_slash() -> TestResult {
        let ledger = HttpLedger::new(LedgerConfig {
            gateway_url: "https://ledger.example/".to_string(),
            api_key: "key".to_string(),
            timeout: Duration::from_secs(60),
        })?;

        assert_eq!(ledger.url("mint"), "https://ledger.example/v1/mint");

        Ok(())
    }

    #[tokio::test]
    async fn unconfigured_ledger_refuses_every_call() {
        let ledger = UnconfiguredLedger;

        let result = ledger.revoke("0xabc".to_string()).await;

        assert!(
            matches!(result, Err(LedgerError::Unconfigured)),
            "expected Unconfigured, got {result:?}"
        );
    }
}
