//! Events service errors.

use attest::{geofence::GeofenceError, window::WindowError};
use qrcode::types::QrError;
use thiserror::Error;

use crate::{database::StoreError, domain::ErrorCategory};

/// Events service error variants.
#[derive(Debug, Error)]
pub enum EventsServiceError {
    /// Event was not found.
    #[error("event not found")]
    NotFound,

    /// An event with this name already exists in the department.
    #[error("event already exists")]
    AlreadyExists,

    /// Event name or department was blank.
    #[error("event name and department are required")]
    MissingDetails,

    /// Participant name or email was unusable.
    #[error("participant needs a name and a valid email")]
    InvalidParticipant,

    /// Venue coordinates or radius were out of range.
    #[error("invalid venue")]
    InvalidVenue(#[from] GeofenceError),

    /// Stored schedule could not be evaluated.
    #[error("invalid schedule")]
    Schedule(#[from] WindowError),

    /// Token expiry fell outside the supported time range.
    #[error("token expiry overflowed the timestamp range")]
    Overflow(#[source] jiff::Error),

    /// Check-in URL could not be encoded as a QR code.
    #[error("failed to render QR code")]
    QrCode(#[from] QrError),

    /// Underlying storage error.
    #[error("storage error")]
    Store(#[source] StoreError),
}

impl EventsServiceError {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound
            | Self::MissingDetails
            | Self::InvalidParticipant
            | Self::InvalidVenue(_)
            | Self::Schedule(_) => ErrorCategory::Validation,
            Self::AlreadyExists => ErrorCategory::Conflict,
            Self::Overflow(_) | Self::QrCode(_) | Self::Store(_) => ErrorCategory::Internal,
        }
    }
}

impl From<StoreError> for EventsServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict => Self::AlreadyExists,
            error @ (StoreError::MissingReference
            | StoreError::Corrupt(_)
            | StoreError::Sql(_)) => Self::Store(error),
        }
    }
}

