//! App Context

use std::sync::Arc;

use attest::clock::{CalendarError, SystemClock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    database::{self, Db},
    domain::{
        activity::PgActivityLog,
        certificates::{CertificatesService, IssuancePipeline},
        collaborators::Collaborators,
        events::{EventsManager, EventsService},
        identities::PgWalletDirectory,
        poaps::{ClaimOrchestrator, PoapsService},
        quizzes::{PgQuizzesRepository, QuizzesRepository},
    },
    integrations::{
        artifacts::MetadataRenderer,
        content_store::{ContentStore, PinataContentStore, UnconfiguredContentStore},
        ledger::{HttpLedger, Ledger, LedgerError, UnconfiguredLedger},
        notifications::{LogMailer, SideEffects},
    },
    retry::RetryPolicy,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("invalid civil time offset")]
    Calendar(#[from] CalendarError),

    #[error("failed to build ledger client")]
    Ledger(#[from] LedgerError),
}

/// Services wired against Postgres and the configured collaborators.
pub struct AppContext {
    pub events: Arc<dyn EventsService>,
    pub poaps: Arc<dyn PoapsService>,
    pub certificates: Arc<dyn CertificatesService>,
    pub quizzes: Arc<dyn QuizzesRepository>,
    worker: JoinHandle<()>,
}

impl AppContext {
    /// Connect, build every collaborator and start the side-effect worker.
    ///
    /// # Errors
    ///
    /// Returns an error when the database is unreachable or a collaborator
    /// cannot be constructed from `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppInitError> {
        let pool = database::connect(&config.database.database_url)
            .await
            .map_err(AppInitError::Database)?;

        let db = Db::new(pool);

        let ledger: Arc<dyn Ledger> = match config.ledger.gateway() {
            Some(gateway) => Arc::new(HttpLedger::new(gateway)?),
            None => {
                warn!("no ledger gateway configured, minting is disabled");
                Arc::new(UnconfiguredLedger)
            }
        };

        let content_store: Arc<dyn ContentStore> = match config.content_store.pinata() {
            Some(pinata) => Arc::new(PinataContentStore::new(pinata)),
            None => {
                info!("no content store configured, certificates are issued without artifacts");
                Arc::new(UnconfiguredContentStore)
            }
        };

        let (side_effects, worker) = SideEffects::spawn(
            Arc::new(LogMailer),
            Arc::new(PgActivityLog::new(db.clone())),
            RetryPolicy::default(),
        );

        let collaborators = Collaborators {
            clock: Arc::new(SystemClock),
            windows: config.policy.windows()?,
            policy: config.policy.policy(),
            wallets: Arc::new(PgWalletDirectory::new(db.clone())),
            ledger,
            content_store,
            renderer: Arc::new(MetadataRenderer),
            side_effects,
            upload_retry: config.content_store.upload_retry(),
        };

        Ok(Self {
            events: Arc::new(EventsManager::postgres(db.clone(), &collaborators)),
            poaps: Arc::new(ClaimOrchestrator::postgres(db.clone(), &collaborators)),
            certificates: Arc::new(IssuancePipeline::postgres(db.clone(), &collaborators)),
            quizzes: Arc::new(PgQuizzesRepository::new(db)),
            worker,
        })
    }

    /// Drop every service, then wait for queued side effects to drain.
    pub async fn shutdown(self) {
        let Self {
            events,
            poaps,
            certificates,
            quizzes,
            worker,
        } = self;

        drop((events, poaps, certificates, quizzes));

        if let Err(error) = worker.await {
            warn!(%error, "side-effect worker ended abnormally");
        }
    }
}
