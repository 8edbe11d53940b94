//! Punctuality Scoring

use jiff::Timestamp;

/// Score awarded for arriving at or before the scheduled start.
pub const MAX_ATTENDANCE_SCORE: u8 = 100;

/// Lowest score awarded to any verified attendee.
pub const MIN_ATTENDANCE_SCORE: u8 = 50;

/// Points deducted per completed lateness step.
pub const DEDUCTION_PER_STEP: i64 = 5;

/// Length of one lateness step, in milliseconds (ten minutes).
pub const STEP_MILLIS: i64 = 10 * 60 * 1_000;

/// Punctuality score for checking in at `check_in` against a start of `start`.
///
/// Five points come off for every full ten minutes late, never dropping below
/// [`MIN_ATTENDANCE_SCORE`].
#[must_use]
pub fn attendance_score(start: Timestamp, check_in: Timestamp) -> u8 {
    if check_in <= start {
        return MAX_ATTENDANCE_SCORE;
    }

    let late_millis = check_in
        .as_millisecond()
        .saturating_sub(start.as_millisecond());

    let deduction = (late_millis / STEP_MILLIS).saturating_mul(DEDUCTION_PER_STEP);

    let score = i64::from(MAX_ATTENDANCE_SCORE)
        .saturating_sub(deduction)
        .max(i64::from(MIN_ATTENDANCE_SCORE));

    u8::try_from(score).unwrap_or(MIN_ATTENDANCE_SCORE)
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};
    use testresult::TestResult;

    use super::*;

    fn start() -> Result<Timestamp, jiff::Error> {
        "2024-03-15T04:30:00Z".parse()
    }

    #[test]
    fn early_and_on_time_score_full_marks() -> TestResult {
        let start = start()?;

        assert_eq!(attendance_score(start, start), 100);
        assert_eq!(
            attendance_score(start, start.checked_sub(SignedDuration::from_mins(25))?),
            100
        );

        Ok(())
    }

    #[test]
    fn partial_step_costs_nothing() -> TestResult {
        let start = start()?;

        let score = attendance_score(start, start.checked_add(SignedDuration::from_secs(599))?);

        assert_eq!(score, 100);

        Ok(())
    }

    #[test]
    fn stepped_decay_matches_reference_points() -> TestResult {
        let start = start()?;

        for (late_minutes, expected) in [(10, 95), (19, 95), (20, 90), (55, 75), (99, 55)] {
            let check_in = start.checked_add(SignedDuration::from_mins(late_minutes))?;

            assert_eq!(
                attendance_score(start, check_in),
                expected,
                "unexpected score at {late_minutes} minutes late"
            );
        }

        Ok(())
    }

    #[test]
    fn floor_holds_however_late() -> TestResult {
        let start = start()?;

        assert_eq!(
            attendance_score(start, start.checked_add(SignedDuration::from_hours(10))?),
            50
        );
        assert_eq!(
            attendance_score(start, start.checked_add(SignedDuration::from_hours(24 * 365))?),
            50
        );

        Ok(())
    }

    #[test]
    fn score_never_increases_with_lateness() -> TestResult {
        let start = start()?;
        let mut previous = MAX_ATTENDANCE_SCORE;

        for minute in 0..200 {
            let score = attendance_score(start, start.checked_add(SignedDuration::from_mins(minute))?);

            assert!(score <= previous, "score rose at minute {minute}");
            assert!(
                (MIN_ATTENDANCE_SCORE..=MAX_ATTENDANCE_SCORE).contains(&score),
                "score {score} out of range"
            );

            previous = score;
        }

        Ok(())
    }
}
