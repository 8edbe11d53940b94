//! Policy Config

use attest::{
    clock::{CalendarError, CivilCalendar, DEFAULT_CIVIL_OFFSET_MINUTES},
    window::WindowCalculator,
};
use clap::Args;
use jiff::SignedDuration;

use crate::domain::policy::AttendancePolicy;

/// Attendance and issuance policy.
#[derive(Debug, Args)]
pub struct PolicyConfig {
    /// Base URL for check-in and verification links
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:3000")]
    pub public_base_url: String,

    /// Civil time offset east of UTC, in minutes
    #[arg(
        long,
        env = "CIVIL_OFFSET_MINUTES",
        default_value_t = DEFAULT_CIVIL_OFFSET_MINUTES,
        allow_negative_numbers = true
    )]
    pub civil_offset_minutes: i32,

    /// How early check-in opens before an event starts, in minutes
    #[arg(long, env = "CHECK_IN_BUFFER_MINUTES", default_value_t = 30)]
    pub check_in_buffer_minutes: i64,

    /// Admission radius for venues without their own
    #[arg(long, env = "GEOFENCE_RADIUS_KM", default_value_t = 0.5)]
    pub geofence_radius_km: f64,

    /// Check-in token lifetime, in hours
    #[arg(long, env = "CHECK_IN_TOKEN_TTL_HOURS", default_value_t = 24)]
    pub check_in_token_ttl_hours: i64,
}

impl PolicyConfig {
    #[must_use]
    pub fn policy(&self) -> AttendancePolicy {
        AttendancePolicy {
            public_base_url: self.public_base_url.clone(),
            check_in_buffer: SignedDuration::from_mins(self.check_in_buffer_minutes),
            geofence_radius_km: self.geofence_radius_km,
            check_in_token_ttl: SignedDuration::from_hours(self.check_in_token_ttl_hours),
        }
    }

    /// Window calculator in the configured civil offset.
    ///
    /// # Errors
    ///
    /// Returns an error when the offset is out of range.
    pub fn windows(&self) -> Result<WindowCalculator, CalendarError> {
        CivilCalendar::from_offset_minutes(self.civil_offset_minutes).map(WindowCalculator::new)
    }
}
