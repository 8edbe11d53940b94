//! Civil Time
//!
//! Every schedule comparison goes through a [`CivilCalendar`], which interprets
//! wall-clock dates and times in one fixed UTC offset. The host's local zone is
//! never consulted, so a service running in UTC and one running in IST agree on
//! when an event opens.

use std::fmt::Debug;

use jiff::{
    Timestamp,
    civil::{Date, DateTime, Time},
    tz::{Offset, TimeZone},
};
use thiserror::Error;

/// Offset of the canonical civil timezone (UTC+05:30), in minutes.
pub const DEFAULT_CIVIL_OFFSET_MINUTES: i32 = 330;

/// Wall-clock format used for event start and end times.
pub const CIVIL_TIME_FORMAT: &str = "%H:%M";

/// Errors raised while interpreting civil dates and times.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The configured offset is outside the range jiff supports.
    #[error("civil offset of {minutes} minutes is out of range")]
    InvalidOffset {
        /// Offset that was requested.
        minutes: i32,

        /// Underlying jiff error.
        #[source]
        source: jiff::Error,
    },

    /// A time-of-day string was not `HH:MM`.
    #[error("invalid civil time {value:?}, expected HH:MM")]
    InvalidTime {
        /// Rejected input.
        value: String,

        /// Underlying jiff error.
        #[source]
        source: jiff::Error,
    },

    /// A date string was not `YYYY-MM-DD`.
    #[error("invalid civil date {value:?}, expected YYYY-MM-DD")]
    InvalidDate {
        /// Rejected input.
        value: String,

        /// Underlying jiff error.
        #[source]
        source: jiff::Error,
    },

    /// The civil date-time has no corresponding instant.
    #[error("civil date-time {datetime} cannot be represented as an instant")]
    Unrepresentable {
        /// Civil date-time that failed to resolve.
        datetime: DateTime,

        /// Underlying jiff error.
        #[source]
        source: jiff::Error,
    },
}

/// Source of the current instant.
pub trait Clock: Debug + Send + Sync {
    /// Current instant.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Fixed-offset civil calendar.
#[derive(Debug, Clone)]
pub struct CivilCalendar {
    offset_minutes: i32,
    tz: TimeZone,
}

impl CivilCalendar {
    /// Build a calendar pinned to `minutes` east of UTC.
    ///
    /// # Errors
    ///
    /// Returns an error when the offset is outside jiff's supported range.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, CalendarError> {
        let offset = Offset::from_seconds(minutes.saturating_mul(60))
            .map_err(|source| CalendarError::InvalidOffset { minutes, source })?;

        Ok(Self {
            offset_minutes: minutes,
            tz: TimeZone::fixed(offset),
        })
    }

    /// Calendar for the canonical UTC+05:30 civil zone.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors [`Self::from_offset_minutes`].
    pub fn canonical() -> Result<Self, CalendarError> {
        Self::from_offset_minutes(DEFAULT_CIVIL_OFFSET_MINUTES)
    }

    /// Offset east of UTC, in minutes.
    #[must_use]
    pub const fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    /// Re-express `instant` as a civil date-time.
    #[must_use]
    pub fn to_civil(&self, instant: Timestamp) -> DateTime {
        instant.to_zoned(self.tz.clone()).datetime()
    }

    /// Civil date containing `instant`.
    #[must_use]
    pub fn civil_date(&self, instant: Timestamp) -> Date {
        self.to_civil(instant).date()
    }

    /// `YYYY-MM-DD` rendering of the civil date containing `instant`.
    #[must_use]
    pub fn civil_date_string(&self, instant: Timestamp) -> String {
        self.civil_date(instant).to_string()
    }

    /// `HH:MM` rendering of the civil wall-clock time of `instant`.
    #[must_use]
    pub fn civil_time_string(&self, instant: Timestamp) -> String {
        self.to_civil(instant)
            .time()
            .strftime(CIVIL_TIME_FORMAT)
            .to_string()
    }

    /// Human-readable civil rendering used in rejection messages.
    #[must_use]
    pub fn display(&self, instant: Timestamp) -> String {
        self.to_civil(instant)
            .strftime("%Y-%m-%d %H:%M")
            .to_string()
    }

    /// Instant at which the wall clock reads `time` on `date`.
    ///
    /// # Errors
    ///
    /// Returns an error when the date-time falls outside the supported range.
    pub fn combine(&self, date: Date, time: Time) -> Result<Timestamp, CalendarError> {
        let datetime = date.to_datetime(time);

        datetime
            .to_zoned(self.tz.clone())
            .map(|zoned| zoned.timestamp())
            .map_err(|source| CalendarError::Unrepresentable { datetime, source })
    }

    /// String form of [`Self::combine`]: `YYYY-MM-DD` and `HH:MM`.
    ///
    /// # Errors
    ///
    /// Returns an error when either string is malformed.
    pub fn combine_str(&self, date: &str, time: &str) -> Result<Timestamp, CalendarError> {
        self.combine(parse_civil_date(date)?, parse_civil_time(time)?)
    }
}

/// Parse an `HH:MM` time-of-day.
///
/// # Errors
///
/// Returns an error when `value` is not a valid 24-hour time.
pub fn parse_civil_time(value: &str) -> Result<Time, CalendarError> {
    Time::strptime(CIVIL_TIME_FORMAT, value.trim()).map_err(|source| {
        CalendarError::InvalidTime {
            value: value.to_string(),
            source,
        }
    })
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns an error when `value` is not a valid calendar date.
pub fn parse_civil_date(value: &str) -> Result<Date, CalendarError> {
    value
        .trim()
        .parse::<Date>()
        .map_err(|source| CalendarError::InvalidDate {
            value: value.to_string(),
            source,
        })
}
