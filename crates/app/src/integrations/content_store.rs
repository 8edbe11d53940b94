//! Durable content store.
//!
//! Artifacts are pinned to IPFS through Pinata. Uploads are best-effort: the
//! issuance pipeline goes ahead with a null artifact when the store is down.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mockall::automock;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::retry::RetryPolicy;

/// Bytes to pin, with their descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub metadata: BTreeMap<String, String>,
}

/// Where a pinned artifact can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Content identifier.
    pub reference: String,

    /// Gateway URL serving the content.
    pub url: String,
}

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("content store is not configured")]
    Unconfigured,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content store rejected the upload with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl ContentStoreError {
    /// Whether another attempt could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unconfigured => false,
            Self::Http(error) => !error.is_builder(),
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

#[automock]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Pin `artifact` and return its content reference.
    async fn put(&self, artifact: Artifact) -> Result<StoredArtifact, ContentStoreError>;
}

/// Store used when no credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredContentStore;

#[async_trait]
impl ContentStore for UnconfiguredContentStore {
    async fn put(&self, _artifact: Artifact) -> Result<StoredArtifact, ContentStoreError> {
        Err(ContentStoreError::Unconfigured)
    }
}

/// Pinata connection settings.
#[derive(Debug, Clone)]
pub struct PinataConfig {
    /// API base, e.g. `"https://api.pinata.cloud"`.
    pub api_url: String,

    /// Public gateway base, e.g. `"https://gateway.pinata.cloud"`.
    pub gateway_url: String,

    /// JWT with pinning scope.
    pub jwt: String,
}

#[derive(Debug, Clone)]
pub struct PinataContentStore {
    config: PinataConfig,
    http: Client,
}

impl PinataContentStore {
    #[must_use]
    pub fn new(config: PinataConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn gateway_url(&self, reference: &str) -> String {
        format!(
            "{}/ipfs/{reference}",
            self.config.gateway_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[async_trait]
impl ContentStore for PinataContentStore {
    async fn put(&self, artifact: Artifact) -> Result<StoredArtifact, ContentStoreError> {
        let url = format!(
            "{}/pinning/pinFileToIPFS",
            self.config.api_url.trim_end_matches('/')
        );

        let metadata = json!({
            "name": artifact.file_name,
            "keyvalues": artifact.metadata,
        });

        let file = Part::bytes(artifact.bytes)
            .file_name(artifact.file_name)
            .mime_str(&artifact.content_type)?;

        let form = Form::new()
            .part("file", file)
            .text("pinataMetadata", metadata.to_string());

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.jwt)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();

            return Err(ContentStoreError::Rejected { status, body });
        }

        let parsed: PinResponse = response.json().await?;

        Ok(StoredArtifact {
            url: self.gateway_url(&parsed.ipfs_hash),
            reference: parsed.ipfs_hash,
        })
    }
}

/// Upload `artifact` under `policy`, degrading any final failure to `None`.
///
/// Callers persist their record either way; a `None` here means the record
/// carries no artifact reference.
pub async fn store_best_effort(
    store: &dyn ContentStore,
    policy: &RetryPolicy,
    artifact: Artifact,
) -> Option<StoredArtifact> {
    let file_name = artifact.file_name.clone();

    let result = policy
        .run(
            |_| {
                let artifact = artifact.clone();
                async move { store.put(artifact).await }
            },
            ContentStoreError::is_transient,
        )
        .await;

    match result {
        Ok(stored) => Some(stored),
        Err(error) => {
            warn!(%file_name, %error, "artifact upload failed, continuing without artifact");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use testresult::TestResult;

    use super::*;

    fn artifact() -> Artifact {
        Artifact {
            file_name: "CERT-0011223344556677.json".to_string(),
            content_type: "application/json".to_string(),
            bytes: b"{}".to_vec(),
            metadata: BTreeMap::new(),
        }
    }

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(0.0)
    }

    #[tokio::test]
    async fn transient_failures_are_retried() -> TestResult {
        let mut store = MockContentStore::new();
        let mut seq = mockall::Sequence::new();

        store
            .expect_put()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(ContentStoreError::Rejected {
                    status: 503,
                    body: String::new(),
                })
            });

        store
            .expect_put()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(StoredArtifact {
                    reference: "bafy".to_string(),
                    url: "https://gw/ipfs/bafy".to_string(),
                })
            });

        let stored = store_best_effort(&store, &quick(3), artifact()).await;

        assert_eq!(stored.map(|s| s.reference), Some("bafy".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn exhausted_retries_degrade_to_none() {
        let mut store = MockContentStore::new();

        store.expect_put().times(3).returning(|_| {
            Err(ContentStoreError::Rejected {
                status: 502,
                body: "bad gateway".to_string(),
            })
        });

        assert_eq!(store_best_effort(&store, &quick(3), artifact()).await, None);
    }

    #[tokio::test]
    async fn unconfigured_store_is_not_retried() {
        let mut store = MockContentStore::new();

        store
            .expect_put()
            .times(1)
            .returning(|_| Err(ContentStoreError::Unconfigured));

        assert_eq!(store_best_effort(&store, &quick(5), artifact()).await, None);
    }

    #[test]
    fn client_errors_are_not_transient() {
        let rejected = ContentStoreError::Rejected {
            status: 401,
            body: String::new(),
        };

        assert!(!rejected.is_transient());
    }

    #[test]
    fn gateway_url_points_at_ipfs_path() {
        let store = PinataContentStore::new(PinataConfig {
            api_url: "https://api.pinata.cloud".to_string(),
            gateway_url: "https://gateway.pinata.cloud/".to_string(),
            jwt: "jwt".to_string(),
        });

        assert_eq!(
            store.gateway_url("bafy"),
            "https://gateway.pinata.cloud/ipfs/bafy"
        );
    }
}
