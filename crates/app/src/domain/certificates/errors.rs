//! Certificates service errors.

use attest::window::WindowError;
use thiserror::Error;
use tokio::task::JoinError;

use crate::{
    database::StoreError,
    domain::{ErrorCategory, identities::models::UserUuid},
    integrations::ledger::LedgerError,
};

/// Certificates service error variants.
#[derive(Debug, Error)]
pub enum CertificatesServiceError {
    /// The participant has no linked ledger wallet.
    #[error("no wallet is linked to {email}")]
    NoWallet { email: String },

    /// A certificate already exists for this event name and email.
    #[error("certificate already issued for this participant and event")]
    DuplicateCertificate,

    /// Bulk issuance attempted before the event ended.
    #[error("event has not concluded; certificates can be issued after {ends_at}")]
    EventNotConcluded { ends_at: String },

    /// Attended-only issuance found nobody to issue to.
    #[error("no registered participant has a valid attendance record")]
    NoAttendees,

    /// The issuing actor is not a known user.
    #[error("unknown issuer {user}")]
    UnknownIssuer { user: UserUuid },

    /// Participant name or email was unusable.
    #[error("participant needs a name and a valid email")]
    InvalidParticipant,

    /// Quiz is no longer accepting attempts.
    #[error("quiz is not active")]
    QuizInactive,

    /// Score fell below the passing threshold.
    #[error("scored {percentage}% but {required}% is required")]
    QuizNotPassed { percentage: u8, required: u8 },

    /// The ledger refused or failed to mint.
    #[error("failed to mint certificate")]
    MintFailed(#[source] LedgerError),

    /// The ledger refused or failed to revoke.
    #[error("failed to revoke certificate")]
    RevokeFailed(#[source] LedgerError),

    /// Certificate or event was not found.
    #[error("not found")]
    NotFound,

    /// Stored event schedule could not be evaluated.
    #[error("invalid event schedule")]
    InvalidEvent(#[from] WindowError),

    /// The mint-and-record task did not run to completion.
    #[error("issuance task aborted")]
    Aborted(#[source] JoinError),

    /// Underlying storage error.
    #[error("storage error")]
    Store(#[source] StoreError),
}

impl CertificatesServiceError {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NoWallet { .. }
            | Self::UnknownIssuer { .. }
            | Self::InvalidParticipant
            | Self::NotFound => ErrorCategory::Validation,
            Self::DuplicateCertificate
            | Self::EventNotConcluded { .. }
            | Self::NoAttendees
            | Self::QuizInactive
            | Self::QuizNotPassed { .. } => ErrorCategory::Conflict,
            Self::MintFailed(_) | Self::RevokeFailed(_) => ErrorCategory::External,
            Self::InvalidEvent(_) | Self::Aborted(_) | Self::Store(_) => ErrorCategory::Internal,
        }
    }
}

impl From<StoreError> for CertificatesServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict => Self::DuplicateCertificate,
            error @ (StoreError::MissingReference
            | StoreError::Corrupt(_)
            | StoreError::Sql(_)) => Self::Store(error),
        }
    }
}
