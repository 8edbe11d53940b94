//! POAP service errors.

use attest::{
    geofence::{GeofenceError, OutsideGeofence},
    window::{WindowError, WindowRejection},
};
use jiff::Timestamp;
use thiserror::Error;
use tokio::task::JoinError;

use crate::{database::StoreError, domain::ErrorCategory, integrations::ledger::LedgerError};

/// Terminal states of a rejected claim, plus storage failures.
#[derive(Debug, Error)]
pub enum PoapsServiceError {
    /// Event is unknown or the presented token is not its current token.
    #[error("invalid or superseded check-in token")]
    InvalidToken,

    /// The presented token is current but past its expiry.
    #[error("check-in token expired at {expired_at}")]
    TokenExpired { expired_at: Timestamp },

    /// Check-in attempted outside the admission window.
    #[error(transparent)]
    OutsideWindow(WindowRejection),

    /// The reported fix is not a valid coordinate.
    #[error("invalid location")]
    InvalidLocation(#[source] GeofenceError),

    /// The reported fix is too far from the venue.
    #[error(transparent)]
    OutsideGeofence(OutsideGeofence),

    /// The identity has no linked ledger wallet.
    #[error("no wallet is linked to {email}")]
    NoWallet { email: String },

    /// A POAP already exists for this wallet and event.
    #[error("attendance already claimed for this event")]
    AlreadyClaimed,

    /// The ledger refused or failed to mint.
    #[error("failed to mint attendance token")]
    MintFailed(#[source] LedgerError),

    /// POAP was not found.
    #[error("poap not found")]
    NotFound,

    /// Stored event data could not be evaluated.
    #[error("invalid event configuration")]
    InvalidEvent(#[source] WindowError),

    /// Stored venue could not be turned into a geofence.
    #[error("invalid venue configuration")]
    InvalidVenue(#[source] GeofenceError),

    /// The mint-and-record task did not run to completion.
    #[error("claim task aborted")]
    Aborted(#[source] JoinError),

    /// Underlying storage error.
    #[error("storage error")]
    Store(#[source] StoreError),
}

impl PoapsServiceError {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidToken
            | Self::InvalidLocation(_)
            | Self::NoWallet { .. }
            | Self::NotFound => ErrorCategory::Validation,
            Self::TokenExpired { .. }
            | Self::OutsideWindow(_)
            | Self::OutsideGeofence(_)
            | Self::AlreadyClaimed => ErrorCategory::Conflict,
            Self::MintFailed(_) => ErrorCategory::External,
            Self::InvalidEvent(_) | Self::InvalidVenue(_) | Self::Aborted(_) | Self::Store(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

impl From<StoreError> for PoapsServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict => Self::AlreadyClaimed,
            error @ (StoreError::MissingReference
            | StoreError::Corrupt(_)
            | StoreError::Sql(_)) => Self::Store(error),
        }
    }
}
