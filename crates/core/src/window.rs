//! Event Windows
//!
//! Resolves an event's civil schedule into instants and answers two questions
//! about a point in time: which lifecycle [`EventStatus`] the event is in, and
//! whether the instant falls inside an admission window.

use std::fmt::{self, Display, Formatter};

use jiff::{
    SignedDuration, Timestamp,
    civil::{Date, Time},
};
use thiserror::Error;

use crate::clock::{CalendarError, CivilCalendar, parse_civil_date, parse_civil_time};

/// Grace period before the scheduled start during which check-in is accepted.
pub const DEFAULT_CHECK_IN_BUFFER: SignedDuration = SignedDuration::from_mins(30);

/// Errors raised while resolving a schedule.
#[derive(Debug, Error)]
pub enum WindowError {
    /// The end time precedes the start time.
    #[error("event ends at {end} before it starts at {start}")]
    InvalidSchedule {
        /// Scheduled start.
        start: Time,

        /// Scheduled end.
        end: Time,
    },

    /// A date or time could not be interpreted.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Applying the admission buffer overflowed the supported range.
    #[error("admission buffer overflowed the timestamp range")]
    Overflow(#[source] jiff::Error),
}

/// Lifecycle status of an event relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// Before the scheduled start.
    Upcoming,

    /// Between start and end, both inclusive.
    Ongoing,

    /// Strictly after the scheduled end.
    Completed,
}

impl EventStatus {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        }
    }
}

impl Display for EventStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Civil date plus start and end wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSchedule {
    date: Date,
    start: Time,
    end: Time,
}

impl EventSchedule {
    /// Build a schedule, rejecting an end before the start.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidSchedule`] when `end < start`.
    pub fn new(date: Date, start: Time, end: Time) -> Result<Self, WindowError> {
        if end < start {
            return Err(WindowError::InvalidSchedule { start, end });
        }

        Ok(Self { date, start, end })
    }

    /// Build a schedule from `YYYY-MM-DD` and `HH:MM` strings.
    ///
    /// # Errors
    ///
    /// Returns an error when any component is malformed or the end precedes the start.
    pub fn parse(date: &str, start: &str, end: &str) -> Result<Self, WindowError> {
        Self::new(
            parse_civil_date(date)?,
            parse_civil_time(start)?,
            parse_civil_time(end)?,
        )
    }

    /// Civil date of the event.
    #[must_use]
    pub const fn date(&self) -> Date {
        self.date
    }

    /// Scheduled start time.
    #[must_use]
    pub const fn start(&self) -> Time {
        self.start
    }

    /// Scheduled end time.
    #[must_use]
    pub const fn end(&self) -> Time {
        self.end
    }
}

/// Why an instant falls outside an admission window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowReason {
    /// Before `start - buffer`.
    TooEarly,

    /// After `end`.
    TooLate,
}

/// Rejection carrying the instants involved and a display message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WindowRejection {
    /// Which side of the window was missed.
    pub reason: WindowReason,

    /// Instant that was tested.
    pub now: Timestamp,

    /// Window boundary that was missed.
    pub boundary: Timestamp,

    /// Message embedding civil renderings of `now` and `boundary`.
    pub message: String,
}

/// A schedule resolved to instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    /// Scheduled start instant.
    pub start: Timestamp,

    /// Scheduled end instant.
    pub end: Timestamp,
}

impl EventWindow {
    /// Status of the event at `now`.
    #[must_use]
    pub fn status_at(&self, now: Timestamp) -> EventStatus {
        if now > self.end {
            EventStatus::Completed
        } else if now >= self.start {
            EventStatus::Ongoing
        } else {
            EventStatus::Upcoming
        }
    }
}

/// Schedule evaluator bound to a civil calendar.
#[derive(Debug, Clone)]
pub struct WindowCalculator {
    calendar: CivilCalendar,
}

impl WindowCalculator {
    /// Create a calculator for `calendar`.
    #[must_use]
    pub fn new(calendar: CivilCalendar) -> Self {
        Self { calendar }
    }

    /// Calendar used for resolution and messages.
    #[must_use]
    pub fn calendar(&self) -> &CivilCalendar {
        &self.calendar
    }

    /// Resolve `schedule` into start and end instants.
    ///
    /// # Errors
    ///
    /// Returns an error when the schedule cannot be represented as instants.
    pub fn resolve(&self, schedule: &EventSchedule) -> Result<EventWindow, WindowError> {
        Ok(EventWindow {
            start: self.calendar.combine(schedule.date, schedule.start)?,
            end: self.calendar.combine(schedule.date, schedule.end)?,
        })
    }

    /// Status of `schedule` at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error when the schedule cannot be resolved.
    pub fn status(
        &self,
        schedule: &EventSchedule,
        now: Timestamp,
    ) -> Result<EventStatus, WindowError> {
        Ok(self.resolve(schedule)?.status_at(now))
    }

    /// Check whether `now` lies in `[start - buffer, end]`.
    ///
    /// The outer `Result` reports schedule errors; the inner one reports
    /// whether the instant was admitted.
    ///
    /// # Errors
    ///
    /// Returns an error when the schedule cannot be resolved or the buffer overflows.
    pub fn validate(
        &self,
        schedule: &EventSchedule,
        now: Timestamp,
        buffer: SignedDuration,
    ) -> Result<Result<(), WindowRejection>, WindowError> {
        let window = self.resolve(schedule)?;

        let opens_at = window
            .start
            .checked_sub(buffer)
            .map_err(WindowError::Overflow)?;

        if now < opens_at {
            return Ok(Err(WindowRejection {
                reason: WindowReason::TooEarly,
                now,
                boundary: opens_at,
                message: format!(
                    "check-in opens at {} ({} minutes before the start); current time is {}",
                    self.calendar.display(opens_at),
                    buffer.as_mins(),
                    self.calendar.display(now),
                ),
            }));
        }

        if now > window.end {
            return Ok(Err(WindowRejection {
                reason: WindowReason::TooLate,
                now,
                boundary: window.end,
                message: format!(
                    "check-in closed at {}; current time is {}",
                    self.calendar.display(window.end),
                    self.calendar.display(now),
                ),
            }));
        }

        Ok(Ok(()))
    }
}
