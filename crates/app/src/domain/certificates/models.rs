//! Certificate Models

use std::str::FromStr;

use attest::token::CertificateKind;
use jiff::{Timestamp, civil::Date};
use thiserror::Error;

use crate::{
    domain::{events::models::Participant, identities::models::UserUuid},
    integrations::{content_store::StoredArtifact, ledger::LedgerStatus},
    uuids::TypedUuid,
};

/// Certificate UUID
pub type CertificateUuid = TypedUuid<Certificate>;

/// Certificate Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub uuid: CertificateUuid,

    /// Public, human-shareable id such as `CERT-9F1C04A2B37DE580`.
    pub certificate_id: String,
    pub kind: CertificateKind,
    pub token_id: String,
    pub content_hash: String,
    pub tx_ref: String,
    pub student_name: String,
    pub student_email: String,
    pub event_name: String,
    pub event_date: Date,
    pub issued_by: Option<UserUuid>,
    pub verification_url: String,

    /// Pinned artifact, absent when the upload gave up.
    pub artifact: Option<StoredArtifact>,
    pub scan_count: u64,
    pub created_at: Timestamp,
}

/// New Certificate Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    pub uuid: CertificateUuid,
    pub certificate_id: String,
    pub kind: CertificateKind,
    pub token_id: String,
    pub content_hash: String,
    pub tx_ref: String,
    pub student_name: String,
    pub student_email: String,
    pub event_name: String,
    pub event_date: Date,
    pub issued_by: Option<UserUuid>,
    pub verification_url: String,
    pub artifact: Option<StoredArtifact>,
}

/// A single certificate to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub event_name: String,
    pub event_date: Date,
    pub participant: Participant,
    pub issued_by: Option<UserUuid>,
}

/// Which participants an event-wide pass targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceMode {
    /// Every registered participant.
    All,

    /// Registered participants holding a non-revoked POAP for the event.
    AttendedOnly,
}

#[derive(Debug, Error)]
#[error("unknown issuance mode {0:?}, expected \"all\" or \"attended-only\"")]
pub struct UnknownIssuanceMode(pub String);

impl FromStr for IssuanceMode {
    type Err = UnknownIssuanceMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "attended-only" | "attendedOnly" => Ok(Self::AttendedOnly),
            other => Err(UnknownIssuanceMode(other.to_string())),
        }
    }
}

/// One participant that a bulk pass skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantFailure {
    pub name: String,
    pub email: String,
    pub error: String,
}

/// Outcome of an event-wide issuance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkIssuanceReport {
    pub issued: usize,
    pub skipped: usize,
    pub errors: Vec<ParticipantFailure>,
}

/// A certificate as seen by someone checking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerification {
    pub certificate: Certificate,

    /// Ledger view of the content hash; `None` when the ledger could not be reached.
    pub ledger: Option<LedgerStatus>,
}

impl CertificateVerification {
    /// Whether the ledger confirms the credential and it has not been revoked.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.ledger
            .is_some_and(|status| status.exists && !status.revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuance_mode_parses_cli_spellings() {
        assert_eq!("all".parse::<IssuanceMode>().ok(), Some(IssuanceMode::All));
        assert_eq!(
            "attended-only".parse::<IssuanceMode>().ok(),
            Some(IssuanceMode::AttendedOnly)
        );
        assert!("some".parse::<IssuanceMode>().is_err());
    }
}
