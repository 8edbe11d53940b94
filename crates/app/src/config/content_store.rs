//! Content Store Config

use std::time::Duration;

use clap::Args;

use crate::{integrations::content_store::PinataConfig, retry::RetryPolicy};

/// Durable content store settings.
#[derive(Debug, Args)]
pub struct ContentStoreConfig {
    /// Pinata JWT; uploads are skipped when absent
    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    pub pinata_jwt: Option<String>,

    /// Pinata API base URL
    #[arg(long, env = "PINATA_API_URL", default_value = "https://api.pinata.cloud")]
    pub pinata_api_url: String,

    /// Public IPFS gateway base URL
    #[arg(
        long,
        env = "PINATA_GATEWAY_URL",
        default_value = "https://gateway.pinata.cloud"
    )]
    pub pinata_gateway_url: String,

    /// Upload attempts before giving up on the artifact
    #[arg(long, env = "CONTENT_STORE_MAX_RETRIES", default_value_t = 3)]
    pub content_store_max_retries: u32,

    /// Delay before the first upload retry, in milliseconds
    #[arg(long, env = "CONTENT_STORE_INITIAL_BACKOFF_MS", default_value_t = 250)]
    pub content_store_initial_backoff_ms: u64,
}

impl ContentStoreConfig {
    /// Pinata settings, or `None` when no JWT is set.
    #[must_use]
    pub fn pinata(&self) -> Option<PinataConfig> {
        let jwt = self.pinata_jwt.as_deref()?.trim();

        if jwt.is_empty() {
            return None;
        }

        Some(PinataConfig {
            api_url: self.pinata_api_url.clone(),
            gateway_url: self.pinata_gateway_url.clone(),
            jwt: jwt.to_string(),
        })
    }

    #[must_use]
    pub fn upload_retry(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.content_store_max_retries)
            .with_initial_delay(Duration::from_millis(self.content_store_initial_backoff_ms))
    }
}
