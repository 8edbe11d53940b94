//! Ledger Config

use std::time::Duration;

use clap::Args;

use crate::integrations::ledger::LedgerConfig as GatewayConfig;

/// Ledger gateway settings.
#[derive(Debug, Args)]
pub struct LedgerConfig {
    /// Ledger gateway base URL; the ledger is unconfigured when absent
    #[arg(long, env = "LEDGER_GATEWAY_URL")]
    pub ledger_gateway_url: Option<String>,

    /// Bearer credential for the ledger gateway
    #[arg(
        long,
        env = "LEDGER_API_KEY",
        hide_env_values = true,
        default_value = ""
    )]
    pub ledger_api_key: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "LEDGER_TIMEOUT_SECONDS", default_value_t = 60)]
    pub ledger_timeout_seconds: u64,
}

impl LedgerConfig {
    /// Gateway client settings, or `None` when no gateway URL is set.
    #[must_use]
    pub fn gateway(&self) -> Option<GatewayConfig> {
        let url = self.ledger_gateway_url.as_deref()?.trim();

        if url.is_empty() {
            return None;
        }

        Some(GatewayConfig {
            gateway_url: url.to_string(),
            api_key: self.ledger_api_key.clone(),
            timeout: Duration::from_secs(self.ledger_timeout_seconds),
        })
    }
}
