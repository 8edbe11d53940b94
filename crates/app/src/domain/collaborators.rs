//! Collaborators shared by the domain services.

use std::sync::Arc;

use attest::{clock::Clock, window::WindowCalculator};

use crate::{
    domain::{identities::WalletDirectory, policy::AttendancePolicy},
    integrations::{
        artifacts::ArtifactRenderer, content_store::ContentStore, ledger::Ledger,
        notifications::SideEffects,
    },
    retry::RetryPolicy,
};

/// Explicitly constructed clients and policies, passed to every service.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub windows: WindowCalculator,
    pub policy: AttendancePolicy,
    pub wallets: Arc<dyn WalletDirectory>,
    pub ledger: Arc<dyn Ledger>,
    pub content_store: Arc<dyn ContentStore>,
    pub renderer: Arc<dyn ArtifactRenderer>,
    pub side_effects: SideEffects,
    pub upload_retry: RetryPolicy,
}
