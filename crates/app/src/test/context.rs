//! Test context for service-level tests.

use std::{sync::Arc, time::Duration};

use attest::{
    clock::{CivilCalendar, FixedClock},
    window::{EventSchedule, WindowCalculator},
};
use testresult::TestResult;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    domain::{
        certificates::IssuancePipeline,
        collaborators::Collaborators,
        events::{
            EventsManager, EventsService,
            models::{Event, EventUuid, NewEvent, Participant, Venue, Visibility},
        },
        identities::models::WalletAddress,
        poaps::ClaimOrchestrator,
        policy::AttendancePolicy,
    },
    integrations::{
        artifacts::MetadataRenderer,
        content_store::{ContentStore, UnconfiguredContentStore},
        ledger::Ledger,
        notifications::{SideEffect, SideEffects},
    },
    retry::RetryPolicy,
};

use super::{FakeLedger, MemoryStore, at};

/// Services wired to one in-memory store, a fake ledger and a fixed clock.
pub(crate) struct TestContext {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<FakeLedger>,
    pub collaborators: Collaborators,
    pub events: EventsManager,
    pub poaps: ClaimOrchestrator,
    pub certificates: IssuancePipeline,
    side_effects: UnboundedReceiver<SideEffect>,
}

impl TestContext {
    /// A context whose clock reads `now`.
    pub fn at(now: &str) -> TestResult<Self> {
        let store = Arc::new(MemoryStore::default());
        let ledger = Arc::new(FakeLedger::default());
        let (side_effects, receiver) = SideEffects::channel();

        let collaborators = Collaborators {
            clock: Arc::new(FixedClock(at(now)?)),
            windows: WindowCalculator::new(CivilCalendar::canonical()?),
            policy: AttendancePolicy::new("https://campus.example"),
            wallets: store.clone(),
            ledger: ledger.clone(),
            content_store: Arc::new(UnconfiguredContentStore),
            renderer: Arc::new(MetadataRenderer),
            side_effects,
            upload_retry: RetryPolicy::default()
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(0.0),
        };

        Ok(Self::assemble(store, ledger, collaborators, receiver))
    }

    fn assemble(
        store: Arc<MemoryStore>,
        ledger: Arc<FakeLedger>,
        collaborators: Collaborators,
        side_effects: UnboundedReceiver<SideEffect>,
    ) -> Self {
        Self {
            events: EventsManager::new(store.clone(), &collaborators),
            poaps: ClaimOrchestrator::new(store.clone(), store.clone(), &collaborators),
            certificates: IssuancePipeline::new(
                store.clone(),
                store.clone(),
                store.clone(),
                &collaborators,
            ),
            store,
            ledger,
            collaborators,
            side_effects,
        }
    }

    fn rewire(self, collaborators: Collaborators) -> Self {
        Self::assemble(self.store, self.ledger, collaborators, self.side_effects)
    }

    /// Same store, clock moved to `now`.
    pub fn with_now(self, now: &str) -> TestResult<Self> {
        let mut collaborators = self.collaborators.clone();

        collaborators.clock = Arc::new(FixedClock(at(now)?));

        Ok(self.rewire(collaborators))
    }

    pub fn with_ledger(self, ledger: Arc<dyn Ledger>) -> Self {
        let mut collaborators = self.collaborators.clone();

        collaborators.ledger = ledger;

        self.rewire(collaborators)
    }

    pub fn with_content_store(self, content_store: Arc<dyn ContentStore>) -> Self {
        let mut collaborators = self.collaborators.clone();

        collaborators.content_store = content_store;

        self.rewire(collaborators)
    }

    pub fn link_wallet(&self, email: &str) -> WalletAddress {
        self.store.link_wallet(email)
    }

    pub async fn seed_event(
        &self,
        name: &str,
        schedule: EventSchedule,
        venue: Option<Venue>,
    ) -> TestResult<Event> {
        let event = self
            .events
            .create_event(NewEvent {
                uuid: EventUuid::new(),
                name: name.to_string(),
                department: "CSE".to_string(),
                schedule,
                venue,
                visibility: Visibility::Public,
                created_by: None,
            })
            .await?;

        Ok(event)
    }

    pub async fn register(&self, event: EventUuid, name: &str, email: &str) -> TestResult<bool> {
        let added = self
            .events
            .register_participant(event, Participant::new(name, email))
            .await?;

        Ok(added)
    }

    /// Effects queued so far, oldest first.
    pub fn drain_side_effects(&mut self) -> Vec<SideEffect> {
        let mut effects = Vec::new();

        while let Ok(effect) = self.side_effects.try_recv() {
            effects.push(effect);
        }

        effects
    }
}
