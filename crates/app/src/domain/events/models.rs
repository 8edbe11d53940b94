//! Event Models

use attest::{
    geofence::{Coordinate, Geofence, GeofenceError},
    token::CheckInToken,
    window::EventSchedule,
};
use jiff::Timestamp;

use crate::{domain::identities::models::UserUuid, uuids::TypedUuid};

/// Event UUID
pub type EventUuid = TypedUuid<Event>;

/// Who may see and register for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Department,
}

impl Visibility {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Department => "department",
        }
    }

    #[must_use]
    pub fn from_storage(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "department" => Some(Self::Department),
            _ => None,
        }
    }
}

/// Registered venue location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Venue {
    pub coordinate: Coordinate,

    /// Overrides the policy radius when set.
    pub radius_km: Option<f64>,
}

impl Venue {
    /// Admission fence, falling back to `default_radius_km`.
    ///
    /// # Errors
    ///
    /// Returns an error when the effective radius is not positive.
    pub fn geofence(&self, default_radius_km: f64) -> Result<Geofence, GeofenceError> {
        Geofence::new(self.coordinate, self.radius_km.unwrap_or(default_radius_km))
    }
}

/// Lowercased, trimmed form used for every email comparison and unique key.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A registered attendee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub email: String,
}

impl Participant {
    #[must_use]
    pub fn new(name: impl Into<String>, email: &str) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: normalize_email(email),
        }
    }

    /// Whether both fields are present and the email is plausible.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && self
                .email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
    }
}

/// Event Model
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub uuid: EventUuid,
    pub name: String,
    pub department: String,
    pub schedule: EventSchedule,
    pub venue: Option<Venue>,
    pub visibility: Visibility,
    pub check_in_token: Option<CheckInToken>,
    pub certificates_issued: bool,
    pub participants: Vec<Participant>,
    pub created_by: Option<UserUuid>,
    pub created_at: Timestamp,
}

/// New Event Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub uuid: EventUuid,
    pub name: String,
    pub department: String,
    pub schedule: EventSchedule,
    pub venue: Option<Venue>,
    pub visibility: Visibility,
    pub created_by: Option<UserUuid>,
}

/// A freshly issued check-in token, ready to share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInPass {
    pub token: String,
    pub check_in_url: String,
    pub expires_at: Timestamp,

    /// QR code encoding `check_in_url`, as an SVG document.
    pub qr_svg: String,
}
