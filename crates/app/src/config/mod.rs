//! Application configuration
//!
//! Every setting is a `clap` argument with an environment fallback, so the
//! same values can come from flags, the process environment or a `.env` file.

use clap::Args;

use crate::config::{
    content_store::ContentStoreConfig, db::DatabaseConfig, ledger::LedgerConfig,
    observability::LoggingConfig, policy::PolicyConfig,
};

pub mod content_store;
pub mod db;
pub mod ledger;
pub mod observability;
pub mod policy;

pub use observability::LogFormat;

/// Settings shared by every command.
#[derive(Debug, Args)]
pub struct AppConfig {
    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Ledger gateway settings.
    #[command(flatten)]
    pub ledger: LedgerConfig,

    /// Durable content store settings.
    #[command(flatten)]
    pub content_store: ContentStoreConfig,

    /// Attendance and issuance policy.
    #[command(flatten)]
    pub policy: PolicyConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}
