//! Claim orchestration.
//!
//! A claim walks the gates token, expiry, window, location, wallet and
//! duplicate in that order, then mints and records. Nothing is written until
//! every gate has passed, and the `(wallet, event_hash)` unique index settles
//! any race between concurrent claims.

use std::sync::Arc;

use async_trait::async_trait;
use attest::{
    clock::Clock,
    geofence::{LocationVerdict, validate_location},
    hashing::poap_content_hash,
    scoring::attendance_score,
    window::WindowCalculator,
};
use jiff::Timestamp;
use mockall::automock;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{
    database::{Db, StoreError},
    domain::{
        activity::models::{ActivityAction, NewActivityEntry},
        collaborators::Collaborators,
        events::{
            EventsRepository, PgEventsRepository,
            models::{EventUuid, Participant, normalize_email},
        },
        identities::{WalletDirectory, models::WalletAddress},
        poaps::{
            errors::PoapsServiceError,
            models::{ClaimRequest, GpsFix, NewPoap, Poap, PoapUuid},
            repository::{PgPoapsRepository, PoapsRepository},
        },
        policy::AttendancePolicy,
    },
    integrations::{
        ledger::{Ledger, MintLocation, MintReceipt, MintRequest},
        notifications::{SideEffect, SideEffects},
    },
};

#[derive(Clone)]
pub struct ClaimOrchestrator {
    events: Arc<dyn EventsRepository>,
    poaps: Arc<dyn PoapsRepository>,
    wallets: Arc<dyn WalletDirectory>,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    windows: WindowCalculator,
    policy: AttendancePolicy,
    side_effects: SideEffects,
}

impl ClaimOrchestrator {
    #[must_use]
    pub fn new(
        events: Arc<dyn EventsRepository>,
        poaps: Arc<dyn PoapsRepository>,
        collaborators: &Collaborators,
    ) -> Self {
        Self {
            events,
            poaps,
            wallets: Arc::clone(&collaborators.wallets),
            ledger: Arc::clone(&collaborators.ledger),
            clock: Arc::clone(&collaborators.clock),
            windows: collaborators.windows.clone(),
            policy: collaborators.policy.clone(),
            side_effects: collaborators.side_effects.clone(),
        }
    }

    #[must_use]
    pub fn postgres(db: Db, collaborators: &Collaborators) -> Self {
        Self::new(
            Arc::new(PgEventsRepository::new(db.clone())),
            Arc::new(PgPoapsRepository::new(db)),
            collaborators,
        )
    }
}

/// A claim that passed every gate and only needs its ledger receipt.
struct PendingClaim {
    event: EventUuid,
    event_hash: String,
    wallet: WalletAddress,
    email: String,
    name: String,
    checked_in_at: Timestamp,
    fix: GpsFix,
    attendance_score: u8,
}

impl PendingClaim {
    fn mint_request(&self) -> MintRequest {
        MintRequest {
            wallet: self.wallet,
            content_hash: self.event_hash.clone(),
            location: Some(MintLocation {
                latitude: self.fix.latitude,
                longitude: self.fix.longitude,
            }),
        }
    }

    fn into_new_poap(self, receipt: MintReceipt) -> NewPoap {
        NewPoap {
            uuid: PoapUuid::new(),
            event: self.event,
            token_id: receipt.token_id,
            tx_ref: receipt.tx_ref,
            event_hash: self.event_hash,
            wallet: self.wallet,
            email: self.email,
            name: self.name,
            checked_in_at: self.checked_in_at,
            fix: self.fix,
            attendance_score: self.attendance_score,
        }
    }
}

/// Mint, then record. Runs detached so a dropped caller cannot strand a mint.
async fn mint_and_record(
    ledger: Arc<dyn Ledger>,
    poaps: Arc<dyn PoapsRepository>,
    pending: PendingClaim,
) -> Result<Poap, PoapsServiceError> {
    let receipt = ledger.mint(pending.mint_request()).await.map_err(|error| {
        warn!(wallet = %pending.wallet, %error, "attendance mint failed");
        PoapsServiceError::MintFailed(error)
    })?;

    let tx_ref = receipt.tx_ref.clone();

    match poaps.create_poap(pending.into_new_poap(receipt)).await {
        Ok(poap) => Ok(poap),
        Err(StoreError::Conflict) => {
            warn!(%tx_ref, "concurrent claim was recorded first, minted token is orphaned");
            Err(PoapsServiceError::AlreadyClaimed)
        }
        Err(error) => {
            error!(%tx_ref, %error, "minted attendance token could not be recorded");
            Err(error.into())
        }
    }
}

#[async_trait]
impl PoapsService for ClaimOrchestrator {
    async fn claim(&self, request: ClaimRequest) -> Result<Poap, PoapsServiceError> {
        let ClaimRequest {
            token,
            event,
            identity,
            fix,
        } = request;

        let event = match self.events.get_event(event).await {
            Ok(found) => found,
            Err(StoreError::NotFound) => {
                debug!(%event, "claim for unknown event");
                return Err(PoapsServiceError::InvalidToken);
            }
            Err(error) => return Err(PoapsServiceError::Store(error)),
        };

        let Some(current) = event
            .check_in_token
            .as_ref()
            .filter(|current| current.matches(&token))
        else {
            debug!(event = %event.uuid, "presented token is not current");
            return Err(PoapsServiceError::InvalidToken);
        };

        let now = self.clock.now();

        if current.is_expired(now) {
            debug!(event = %event.uuid, expired_at = %current.expires_at(), "token expired");
            return Err(PoapsServiceError::TokenExpired {
                expired_at: current.expires_at(),
            });
        }

        self.windows
            .validate(&event.schedule, now, self.policy.check_in_buffer)
            .map_err(PoapsServiceError::InvalidEvent)?
            .map_err(|rejection| {
                debug!(event = %event.uuid, reason = ?rejection.reason, "outside admission window");
                PoapsServiceError::OutsideWindow(rejection)
            })?;

        let fence = event
            .venue
            .map(|venue| venue.geofence(self.policy.geofence_radius_km))
            .transpose()
            .map_err(PoapsServiceError::InvalidVenue)?;

        let verdict = validate_location(fix.latitude, fix.longitude, fence.as_ref())
            .map_err(PoapsServiceError::InvalidLocation)?
            .map_err(|outside| {
                debug!(event = %event.uuid, distance_km = outside.distance_km, "outside geofence");
                PoapsServiceError::OutsideGeofence(outside)
            })?;

        let email = normalize_email(&identity.email);

        let Some(wallet) = self.wallets.wallet_for_email(&email).await? else {
            debug!(%email, "no linked wallet");
            return Err(PoapsServiceError::NoWallet { email });
        };

        let event_hash = poap_content_hash(
            &event.uuid.to_string(),
            &event.name,
            event.schedule.date(),
        );

        if self
            .poaps
            .find_poap(wallet, event_hash.clone())
            .await?
            .is_some()
        {
            debug!(%wallet, event = %event.uuid, "already claimed");
            return Err(PoapsServiceError::AlreadyClaimed);
        }

        let starts_at = self
            .windows
            .resolve(&event.schedule)
            .map_err(PoapsServiceError::InvalidEvent)?
            .start;

        let pending = PendingClaim {
            event: event.uuid,
            event_hash,
            wallet,
            email: email.clone(),
            name: identity.name.clone(),
            checked_in_at: now,
            fix,
            attendance_score: attendance_score(starts_at, now),
        };

        let poap = tokio::spawn(mint_and_record(
            Arc::clone(&self.ledger),
            Arc::clone(&self.poaps),
            pending,
        ))
        .await
        .map_err(PoapsServiceError::Aborted)??;

        if let Err(error) = self
            .events
            .add_participant(event.uuid, Participant::new(identity.name, &email))
            .await
        {
            warn!(event = %event.uuid, %email, %error, "failed to add claimant to participants");
        }

        let distance_km = match verdict {
            LocationVerdict::OnSite { distance_km } => Some(distance_km),
            LocationVerdict::Virtual => None,
        };

        self.side_effects
            .dispatch(SideEffect::Activity(NewActivityEntry {
                actor: Some(identity.user),
                action: ActivityAction::PoapClaimed,
                subject: poap.uuid.to_string(),
                details: json!({
                    "event": event.uuid.to_string(),
                    "eventName": event.name,
                    "tokenId": poap.token_id,
                    "txRef": poap.tx_ref,
                    "attendanceScore": poap.attendance_score,
                    "distanceKm": distance_km,
                }),
            }));

        info!(
            poap = %poap.uuid,
            event = %event.uuid,
            %email,
            score = poap.attendance_score,
            "recorded attendance"
        );

        Ok(poap)
    }

    async fn revoke_poap(&self, poap: PoapUuid, reason: String) -> Result<Poap, PoapsServiceError> {
        let revoked = self.poaps.revoke_poap(poap, reason.clone()).await?;

        self.side_effects
            .dispatch(SideEffect::Activity(NewActivityEntry {
                actor: None,
                action: ActivityAction::PoapRevoked,
                subject: revoked.uuid.to_string(),
                details: json!({
                    "event": revoked.event.to_string(),
                    "email": revoked.email,
                    "reason": reason,
                }),
            }));

        info!(%poap, "revoked poap");

        Ok(revoked)
    }

    async fn list_poaps(&self, event: EventUuid) -> Result<Vec<Poap>, PoapsServiceError> {
        Ok(self.poaps.list_poaps(event).await?)
    }
}

#[automock]
#[async_trait]
pub trait PoapsService: Send + Sync {
    /// Exchange a check-in token and GPS fix for a proof of attendance.
    async fn claim(&self, request: ClaimRequest) -> Result<Poap, PoapsServiceError>;

    /// Mark a POAP revoked. Revoked POAPs no longer count as attendance.
    async fn revoke_poap(&self, poap: PoapUuid, reason: String) -> Result<Poap, PoapsServiceError>;

    /// All POAPs recorded for an event, revoked ones included.
    async fn list_poaps(&self, event: EventUuid) -> Result<Vec<Poap>, PoapsServiceError>;
}
