//! Events service.

use std::sync::Arc;

use async_trait::async_trait;
use attest::{
    clock::Clock,
    token::{CheckInToken, check_in_url},
    window::{EventStatus, WindowCalculator},
};
use mockall::automock;
use qrcode::{QrCode, render::svg};
use tracing::{debug, info};

use crate::{
    database::Db,
    domain::{
        collaborators::Collaborators,
        events::{
            errors::EventsServiceError,
            models::{CheckInPass, Event, EventUuid, NewEvent, Participant},
            repository::{EventsRepository, PgEventsRepository},
        },
        policy::AttendancePolicy,
    },
};

/// Minimum edge length of rendered QR codes, in pixels.
const QR_MIN_DIMENSION: u32 = 240;

#[derive(Clone)]
pub struct EventsManager {
    repository: Arc<dyn EventsRepository>,
    clock: Arc<dyn Clock>,
    windows: WindowCalculator,
    policy: AttendancePolicy,
}

impl EventsManager {
    #[must_use]
    pub fn new(repository: Arc<dyn EventsRepository>, collaborators: &Collaborators) -> Self {
        Self {
            repository,
            clock: Arc::clone(&collaborators.clock),
            windows: collaborators.windows.clone(),
            policy: collaborators.policy.clone(),
        }
    }

    /// Manager backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(db: Db, collaborators: &Collaborators) -> Self {
        Self::new(Arc::new(PgEventsRepository::new(db)), collaborators)
    }
}

fn render_qr_svg(contents: &str) -> Result<String, EventsServiceError> {
    let code = QrCode::new(contents.as_bytes())?;

    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build())
}

#[async_trait]
impl EventsService for EventsManager {
    async fn create_event(&self, event: NewEvent) -> Result<Event, EventsServiceError> {
        if event.name.trim().is_empty() || event.department.trim().is_empty() {
            return Err(EventsServiceError::MissingDetails);
        }

        if let Some(venue) = &event.venue {
            venue.geofence(self.policy.geofence_radius_km)?;
        }

        let created = self.repository.create_event(event).await?;

        info!(event = %created.uuid, name = %created.name, "created event");

        Ok(created)
    }

    async fn get_event(&self, event: EventUuid) -> Result<Event, EventsServiceError> {
        Ok(self.repository.get_event(event).await?)
    }

    async fn register_participant(
        &self,
        event: EventUuid,
        participant: Participant,
    ) -> Result<bool, EventsServiceError> {
        let participant = Participant::new(participant.name, &participant.email);

        if !participant.is_valid() {
            return Err(EventsServiceError::InvalidParticipant);
        }

        let added = self
            .repository
            .add_participant(event, participant.clone())
            .await?;

        if added {
            debug!(%event, email = %participant.email, "registered participant");
        }

        Ok(added)
    }

    async fn issue_check_in_token(
        &self,
        event: EventUuid,
    ) -> Result<CheckInPass, EventsServiceError> {
        let expires_at = self
            .clock
            .now()
            .checked_add(self.policy.check_in_token_ttl)
            .map_err(EventsServiceError::Overflow)?;

        let token = CheckInToken::generate(expires_at);

        let url = check_in_url(
            &self.policy.public_base_url,
            token.value(),
            &event.to_string(),
        );

        let qr_svg = render_qr_svg(&url)?;
        let value = token.value().to_string();

        self.repository
            .replace_check_in_token(event, token)
            .await?;

        info!(%event, %expires_at, "issued check-in token");

        Ok(CheckInPass {
            token: value,
            check_in_url: url,
            expires_at,
            qr_svg,
        })
    }

    async fn event_status(&self, event: EventUuid) -> Result<EventStatus, EventsServiceError> {
        let found = self.repository.get_event(event).await?;

        Ok(self.windows.status(&found.schedule, self.clock.now())?)
    }
}

#[automock]
#[async_trait]
pub trait EventsService: Send + Sync {
    /// Creates a new event.
    async fn create_event(&self, event: NewEvent) -> Result<Event, EventsServiceError>;

    /// Retrieve a single event with its participants.
    async fn get_event(&self, event: EventUuid) -> Result<Event, EventsServiceError>;

    /// Registers a participant. Returns `false` if the email was already registered.
    async fn register_participant(
        &self,
        event: EventUuid,
        participant: Participant,
    ) -> Result<bool, EventsServiceError>;

    /// Issues a fresh check-in token, invalidating any previous one.
    async fn issue_check_in_token(&self, event: EventUuid)
    -> Result<CheckInPass, EventsServiceError>;

    /// Lifecycle status of the event right now.
    async fn event_status(&self, event: EventUuid) -> Result<EventStatus, EventsServiceError>;
}
