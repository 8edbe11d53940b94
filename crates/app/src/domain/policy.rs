//! Attendance Policy

use attest::{
    geofence::DEFAULT_RADIUS_KM, token::DEFAULT_CHECK_IN_TOKEN_TTL, window::DEFAULT_CHECK_IN_BUFFER,
};
use jiff::SignedDuration;

/// Tunables shared by check-in and issuance.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendancePolicy {
    /// Base of every public link (check-in and verification URLs).
    pub public_base_url: String,

    /// How early check-in opens before the scheduled start.
    pub check_in_buffer: SignedDuration,

    /// Radius used for venues that do not set their own.
    pub geofence_radius_km: f64,

    /// Lifetime of a check-in token, measured from issuance.
    pub check_in_token_ttl: SignedDuration,
}

impl AttendancePolicy {
    #[must_use]
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            check_in_buffer: DEFAULT_CHECK_IN_BUFFER,
            geofence_radius_km: DEFAULT_RADIUS_KM,
            check_in_token_ttl: DEFAULT_CHECK_IN_TOKEN_TTL,
        }
    }

    /// Public verification page for a certificate.
    #[must_use]
    pub fn verification_url(&self, certificate_id: &str) -> String {
        format!(
            "{}/verify/{certificate_id}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}
