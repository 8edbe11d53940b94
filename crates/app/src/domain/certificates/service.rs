//! Certificate issuance pipeline.
//!
//! Single, quiz and event-wide issuance share one per-participant procedure:
//! resolve the wallet, check for a duplicate, mint, pin the artifact on a
//! best-effort basis, then record. Notifications and activity entries are
//! queued afterwards and can never undo a recorded certificate.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use attest::{
    clock::Clock,
    hashing::certificate_content_hash,
    token::{CertificateKind, generate_certificate_id},
    window::{EventStatus, WindowCalculator},
};
use jiff::civil::Date;
use mockall::automock;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{
    database::{Db, StoreError},
    domain::{
        activity::models::{ActivityAction, NewActivityEntry},
        certificates::{
            errors::CertificatesServiceError,
            models::{
                BulkIssuanceReport, Certificate, CertificateUuid, CertificateVerification,
                IssuanceMode, IssueRequest, NewCertificate, ParticipantFailure,
            },
            repository::{CertificatesRepository, PgCertificatesRepository},
        },
        collaborators::Collaborators,
        events::{
            EventsRepository, PgEventsRepository,
            models::{EventUuid, Participant, normalize_email},
        },
        identities::{WalletDirectory, models::{UserUuid, WalletAddress}},
        poaps::{PgPoapsRepository, PoapsRepository},
        policy::AttendancePolicy,
        quizzes::models::Quiz,
    },
    integrations::{
        artifacts::{ArtifactRenderer, CertificateDocument},
        content_store::{ContentStore, store_best_effort},
        ledger::{Ledger, MintReceipt, MintRequest},
        notifications::{Notification, SideEffect, SideEffects},
    },
    retry::RetryPolicy,
};

#[derive(Clone)]
pub struct IssuancePipeline {
    events: Arc<dyn EventsRepository>,
    poaps: Arc<dyn PoapsRepository>,
    certificates: Arc<dyn CertificatesRepository>,
    wallets: Arc<dyn WalletDirectory>,
    ledger: Arc<dyn Ledger>,
    content_store: Arc<dyn ContentStore>,
    renderer: Arc<dyn ArtifactRenderer>,
    clock: Arc<dyn Clock>,
    windows: WindowCalculator,
    policy: AttendancePolicy,
    side_effects: SideEffects,
    upload_retry: RetryPolicy,
}

/// A certificate that passed the wallet and duplicate gates.
struct PendingCertificate {
    certificate_id: String,
    kind: CertificateKind,
    wallet: WalletAddress,
    content_hash: String,
    participant: Participant,
    event_name: String,
    event_date: Date,
    issued_by: Option<UserUuid>,
    verification_url: String,
}

impl PendingCertificate {
    fn document(&self, receipt: &MintReceipt) -> CertificateDocument {
        CertificateDocument {
            certificate_id: self.certificate_id.clone(),
            student_name: self.participant.name.clone(),
            student_email: self.participant.email.clone(),
            event_name: self.event_name.clone(),
            event_date: self.event_date.to_string(),
            content_hash: self.content_hash.clone(),
            token_id: receipt.token_id.clone(),
            verification_url: self.verification_url.clone(),
        }
    }
}

impl IssuancePipeline {
    #[must_use]
    pub fn new(
        events: Arc<dyn EventsRepository>,
        poaps: Arc<dyn PoapsRepository>,
        certificates: Arc<dyn CertificatesRepository>,
        collaborators: &Collaborators,
    ) -> Self {
        Self {
            events,
            poaps,
            certificates,
            wallets: Arc::clone(&collaborators.wallets),
            ledger: Arc::clone(&collaborators.ledger),
            content_store: Arc::clone(&collaborators.content_store),
            renderer: Arc::clone(&collaborators.renderer),
            clock: Arc::clone(&collaborators.clock),
            windows: collaborators.windows.clone(),
            policy: collaborators.policy.clone(),
            side_effects: collaborators.side_effects.clone(),
            upload_retry: collaborators.upload_retry.clone(),
        }
    }

    #[must_use]
    pub fn postgres(db: Db, collaborators: &Collaborators) -> Self {
        Self::new(
            Arc::new(PgEventsRepository::new(db.clone())),
            Arc::new(PgPoapsRepository::new(db.clone())),
            Arc::new(PgCertificatesRepository::new(db)),
            collaborators,
        )
    }

    /// Reject an issuer the identity provider does not know, before anything is minted.
    async fn ensure_issuer(
        &self,
        issued_by: Option<UserUuid>,
    ) -> Result<(), CertificatesServiceError> {
        let Some(user) = issued_by else {
            return Ok(());
        };

        if !self.wallets.user_exists(user).await? {
            debug!(%user, "unknown issuer");
            return Err(CertificatesServiceError::UnknownIssuer { user });
        }

        Ok(())
    }

    async fn issue_one(
        &self,
        request: IssueRequest,
        kind: CertificateKind,
    ) -> Result<Certificate, CertificatesServiceError> {
        let participant = Participant::new(request.participant.name, &request.participant.email);

        if !participant.is_valid() {
            return Err(CertificatesServiceError::InvalidParticipant);
        }

        let Some(wallet) = self.wallets.wallet_for_email(&participant.email).await? else {
            debug!(email = %participant.email, "no linked wallet");
            return Err(CertificatesServiceError::NoWallet {
                email: participant.email,
            });
        };

        if self
            .certificates
            .find_by_event_and_email(request.event_name.clone(), participant.email.clone())
            .await?
            .is_some()
        {
            debug!(email = %participant.email, event = %request.event_name, "duplicate certificate");
            return Err(CertificatesServiceError::DuplicateCertificate);
        }

        let certificate_id = generate_certificate_id(kind);

        let pending = PendingCertificate {
            content_hash: certificate_content_hash(
                &participant.email,
                request.event_date,
                &request.event_name,
            ),
            verification_url: self.policy.verification_url(&certificate_id),
            certificate_id,
            kind,
            wallet,
            participant,
            event_name: request.event_name,
            event_date: request.event_date,
            issued_by: request.issued_by,
        };

        let pipeline = self.clone();

        let certificate = tokio::spawn(async move { pipeline.mint_and_record(pending).await })
            .await
            .map_err(CertificatesServiceError::Aborted)??;

        self.announce(&certificate);

        info!(
            certificate = %certificate.certificate_id,
            email = %certificate.student_email,
            event = %certificate.event_name,
            has_artifact = certificate.artifact.is_some(),
            "issued certificate"
        );

        Ok(certificate)
    }

    /// Mint, pin and record. Runs detached so a dropped caller cannot strand a mint.
    async fn mint_and_record(
        &self,
        pending: PendingCertificate,
    ) -> Result<Certificate, CertificatesServiceError> {
        let receipt = self
            .ledger
            .mint(MintRequest {
                wallet: pending.wallet,
                content_hash: pending.content_hash.clone(),
                location: None,
            })
            .await
            .map_err(|error| {
                warn!(email = %pending.participant.email, %error, "certificate mint failed");
                CertificatesServiceError::MintFailed(error)
            })?;

        // A missing artifact is a degraded success, not a failure.
        let artifact = match self.renderer.render(&pending.document(&receipt)) {
            Ok(artifact) => {
                store_best_effort(self.content_store.as_ref(), &self.upload_retry, artifact).await
            }
            Err(error) => {
                warn!(certificate = %pending.certificate_id, %error, "artifact rendering failed");
                None
            }
        };

        let tx_ref = receipt.tx_ref.clone();

        let created = self
            .certificates
            .create_certificate(NewCertificate {
                uuid: CertificateUuid::new(),
                certificate_id: pending.certificate_id,
                kind: pending.kind,
                token_id: receipt.token_id,
                content_hash: pending.content_hash,
                tx_ref: receipt.tx_ref,
                student_name: pending.participant.name,
                student_email: pending.participant.email,
                event_name: pending.event_name,
                event_date: pending.event_date,
                issued_by: pending.issued_by,
                verification_url: pending.verification_url,
                artifact,
            })
            .await;

        match created {
            Ok(certificate) => Ok(certificate),
            Err(StoreError::Conflict) => {
                warn!(%tx_ref, "concurrent issuance was recorded first, minted token is orphaned");
                Err(CertificatesServiceError::DuplicateCertificate)
            }
            Err(error) => {
                error!(%tx_ref, %error, "minted certificate could not be recorded");
                Err(error.into())
            }
        }
    }

    fn announce(&self, certificate: &Certificate) {
        self.side_effects.dispatch(SideEffect::Notify(Notification {
            to_email: certificate.student_email.clone(),
            to_name: certificate.student_name.clone(),
            subject: format!("Your certificate for {}", certificate.event_name),
            body: format!(
                "Hi {},\n\nYour certificate {} for {} is ready.\nVerify it at {}\n",
                certificate.student_name,
                certificate.certificate_id,
                certificate.event_name,
                certificate.verification_url,
            ),
        }));

        self.side_effects
            .dispatch(SideEffect::Activity(NewActivityEntry {
                actor: certificate.issued_by,
                action: ActivityAction::CertificateIssued,
                subject: certificate.certificate_id.clone(),
                details: json!({
                    "kind": certificate.kind.as_str(),
                    "email": certificate.student_email,
                    "eventName": certificate.event_name,
                    "tokenId": certificate.token_id,
                    "txRef": certificate.tx_ref,
                }),
            }));
    }

    async fn targets(
        &self,
        event: EventUuid,
        participants: Vec<Participant>,
        mode: IssuanceMode,
    ) -> Result<Vec<Participant>, CertificatesServiceError> {
        match mode {
            IssuanceMode::All => Ok(participants),
            IssuanceMode::AttendedOnly => {
                let attended: HashSet<String> = self
                    .poaps
                    .list_poaps(event)
                    .await?
                    .into_iter()
                    .filter(|poap| !poap.revoked)
                    .map(|poap| normalize_email(&poap.email))
                    .collect();

                let targets: Vec<Participant> = participants
                    .into_iter()
                    .filter(|participant| attended.contains(&normalize_email(&participant.email)))
                    .collect();

                if targets.is_empty() {
                    return Err(CertificatesServiceError::NoAttendees);
                }

                Ok(targets)
            }
        }
    }
}

#[async_trait]
impl CertificatesService for IssuancePipeline {
    async fn issue_single(
        &self,
        request: IssueRequest,
    ) -> Result<Certificate, CertificatesServiceError> {
        self.ensure_issuer(request.issued_by).await?;
        self.issue_one(request, CertificateKind::Event).await
    }

    async fn issue_for_event(
        &self,
        event: EventUuid,
        mode: IssuanceMode,
        issued_by: Option<UserUuid>,
    ) -> Result<BulkIssuanceReport, CertificatesServiceError> {
        let event = self.events.get_event(event).await?;
        let window = self.windows.resolve(&event.schedule)?;

        if window.status_at(self.clock.now()) != EventStatus::Completed {
            let ends_at = self.windows.calendar().display(window.end);

            debug!(event = %event.uuid, %ends_at, "event not concluded");

            return Err(CertificatesServiceError::EventNotConcluded { ends_at });
        }

        self.ensure_issuer(issued_by).await?;

        let targets = self
            .targets(event.uuid, event.participants.clone(), mode)
            .await?;

        let mut report = BulkIssuanceReport::default();

        for participant in targets {
            let request = IssueRequest {
                event_name: event.name.clone(),
                event_date: event.schedule.date(),
                participant: participant.clone(),
                issued_by,
            };

            match self.issue_one(request, CertificateKind::Event).await {
                Ok(_) => report.issued += 1,
                Err(error) => {
                    debug!(email = %participant.email, %error, "skipped participant");

                    report.skipped += 1;
                    report.errors.push(ParticipantFailure {
                        name: participant.name,
                        email: participant.email,
                        error: error.to_string(),
                    });
                }
            }
        }

        self.events.mark_certificates_issued(event.uuid).await?;

        self.side_effects
            .dispatch(SideEffect::Activity(NewActivityEntry {
                actor: issued_by,
                action: ActivityAction::BulkIssuanceCompleted,
                subject: event.uuid.to_string(),
                details: json!({
                    "eventName": event.name,
                    "issued": report.issued,
                    "skipped": report.skipped,
                }),
            }));

        info!(
            event = %event.uuid,
            issued = report.issued,
            skipped = report.skipped,
            "bulk issuance finished"
        );

        Ok(report)
    }

    async fn issue_for_quiz(
        &self,
        quiz: Quiz,
        participant: Participant,
        correct_answers: u32,
        issued_by: Option<UserUuid>,
    ) -> Result<Certificate, CertificatesServiceError> {
        if !quiz.active {
            return Err(CertificatesServiceError::QuizInactive);
        }

        self.ensure_issuer(issued_by).await?;

        let outcome = quiz.evaluate(correct_answers);

        if !outcome.passed {
            return Err(CertificatesServiceError::QuizNotPassed {
                percentage: outcome.percentage,
                required: quiz.passing_percentage,
            });
        }

        let request = IssueRequest {
            event_name: quiz.certificate_event_name(),
            event_date: self.windows.calendar().civil_date(self.clock.now()),
            participant,
            issued_by,
        };

        self.issue_one(request, CertificateKind::Skill).await
    }

    async fn verify_certificate(
        &self,
        certificate_id: String,
    ) -> Result<CertificateVerification, CertificatesServiceError> {
        let certificate = self.certificates.record_scan(certificate_id).await?;

        let ledger = match self.ledger.is_valid(certificate.content_hash.clone()).await {
            Ok(status) => Some(status),
            Err(error) => {
                warn!(certificate = %certificate.certificate_id, %error, "ledger status unavailable");
                None
            }
        };

        Ok(CertificateVerification {
            certificate,
            ledger,
        })
    }

    async fn revoke_certificate(
        &self,
        certificate_id: String,
        reason: String,
        actor: Option<UserUuid>,
    ) -> Result<String, CertificatesServiceError> {
        let certificate = self.certificates.get_by_public_id(certificate_id).await?;

        let tx_ref = self
            .ledger
            .revoke(certificate.content_hash.clone())
            .await
            .map_err(CertificatesServiceError::RevokeFailed)?;

        self.side_effects
            .dispatch(SideEffect::Activity(NewActivityEntry {
                actor,
                action: ActivityAction::CertificateRevoked,
                subject: certificate.certificate_id.clone(),
                details: json!({
                    "reason": reason,
                    "txRef": tx_ref,
                    "email": certificate.student_email,
                }),
            }));

        info!(certificate = %certificate.certificate_id, %tx_ref, "revoked certificate");

        Ok(tx_ref)
    }
}

#[automock]
#[async_trait]
pub trait CertificatesService: Send + Sync {
    /// Issue one certificate for a named event.
    async fn issue_single(
        &self,
        request: IssueRequest,
    ) -> Result<Certificate, CertificatesServiceError>;

    /// Issue certificates to an event's participants once it has ended.
    ///
    /// Per-participant failures are collected in the report, never raised.
    async fn issue_for_event(
        &self,
        event: EventUuid,
        mode: IssuanceMode,
        issued_by: Option<UserUuid>,
    ) -> Result<BulkIssuanceReport, CertificatesServiceError>;

    /// Issue a skill certificate for a passed quiz attempt.
    async fn issue_for_quiz(
        &self,
        quiz: Quiz,
        participant: Participant,
        correct_answers: u32,
        issued_by: Option<UserUuid>,
    ) -> Result<Certificate, CertificatesServiceError>;

    /// Look up a certificate by public id, counting the scan.
    async fn verify_certificate(
        &self,
        certificate_id: String,
    ) -> Result<CertificateVerification, CertificatesServiceError>;

    /// Revoke a certificate on the ledger. The record itself is kept.
    async fn revoke_certificate(
        &self,
        certificate_id: String,
        reason: String,
        actor: Option<UserUuid>,
    ) -> Result<String, CertificatesServiceError>;
}
