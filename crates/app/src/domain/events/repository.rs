//! Events Repository

use async_trait::async_trait;
use attest::{geofence::Coordinate, token::CheckInToken, window::EventSchedule};
use jiff_sqlx::{Date as SqlxDate, Time as SqlxTime, Timestamp as SqlxTimestamp};
use mockall::automock;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::{
    database::{Db, StoreError},
    domain::events::models::{Event, EventUuid, NewEvent, Participant, Venue, Visibility},
};

const CREATE_EVENT_SQL: &str = include_str!("sql/create_event.sql");
const GET_EVENT_SQL: &str = include_str!("sql/get_event.sql");
const GET_EVENT_PARTICIPANTS_SQL: &str = include_str!("sql/get_event_participants.sql");
const REPLACE_CHECK_IN_TOKEN_SQL: &str = include_str!("sql/replace_check_in_token.sql");
const ADD_PARTICIPANT_SQL: &str = include_str!("sql/add_participant.sql");
const MARK_CERTIFICATES_ISSUED_SQL: &str = include_str!("sql/mark_certificates_issued.sql");

/// Event persistence.
#[automock]
#[async_trait]
pub trait EventsRepository: Send + Sync {
    /// Insert an event; `(department, name)` is unique.
    async fn create_event(&self, event: NewEvent) -> Result<Event, StoreError>;

    /// Load an event with its participants.
    async fn get_event(&self, event: EventUuid) -> Result<Event, StoreError>;

    /// Overwrite the event's check-in token. Last write wins.
    async fn replace_check_in_token(
        &self,
        event: EventUuid,
        token: CheckInToken,
    ) -> Result<(), StoreError>;

    /// Register a participant, returning `false` when the email was already registered.
    async fn add_participant(
        &self,
        event: EventUuid,
        participant: Participant,
    ) -> Result<bool, StoreError>;

    async fn mark_certificates_issued(&self, event: EventUuid) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgEventsRepository {
    db: Db,
}

impl PgEventsRepository {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn get_participants(&self, event: EventUuid) -> Result<Vec<Participant>, StoreError> {
        let rows: Vec<(String, String)> = query_as(GET_EVENT_PARTICIPANTS_SQL)
            .bind(event.into_uuid())
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, email)| Participant { name, email })
            .collect())
    }
}

#[async_trait]
impl EventsRepository for PgEventsRepository {
    async fn create_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let coordinate = event.venue.map(|venue| venue.coordinate);

        query_as::<Postgres, Event>(CREATE_EVENT_SQL)
            .bind(event.uuid.into_uuid())
            .bind(event.name)
            .bind(event.department)
            .bind(SqlxDate::from(event.schedule.date()))
            .bind(SqlxTime::from(event.schedule.start()))
            .bind(SqlxTime::from(event.schedule.end()))
            .bind(coordinate.map(|c| c.latitude()))
            .bind(coordinate.map(|c| c.longitude()))
            .bind(event.venue.and_then(|venue| venue.radius_km))
            .bind(event.visibility.as_str())
            .bind(event.created_by.map(Uuid::from))
            .fetch_one(self.db.pool())
            .await
            .map_err(StoreError::from)
    }

    async fn get_event(&self, event: EventUuid) -> Result<Event, StoreError> {
        let mut found = query_as::<Postgres, Event>(GET_EVENT_SQL)
            .bind(event.into_uuid())
            .fetch_one(self.db.pool())
            .await?;

        found.participants = self.get_participants(event).await?;

        Ok(found)
    }

    async fn replace_check_in_token(
        &self,
        event: EventUuid,
        token: CheckInToken,
    ) -> Result<(), StoreError> {
        let result = query(REPLACE_CHECK_IN_TOKEN_SQL)
            .bind(event.into_uuid())
            .bind(token.value())
            .bind(SqlxTimestamp::from(token.expires_at()))
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn add_participant(
        &self,
        event: EventUuid,
        participant: Participant,
    ) -> Result<bool, StoreError> {
        let result = query(ADD_PARTICIPANT_SQL)
            .bind(event.into_uuid())
            .bind(participant.name)
            .bind(participant.email)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_certificates_issued(&self, event: EventUuid) -> Result<(), StoreError> {
        let result = query(MARK_CERTIFICATES_ISSUED_SQL)
            .bind(event.into_uuid())
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

fn decode_error(column: &str, error: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(error),
    }
}

impl<'r> FromRow<'r, PgRow> for Event {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let schedule = EventSchedule::new(
            row.try_get::<SqlxDate, _>("event_date")?.to_jiff(),
            row.try_get::<SqlxTime, _>("start_time")?.to_jiff(),
            row.try_get::<SqlxTime, _>("end_time")?.to_jiff(),
        )
        .map_err(|e| decode_error("end_time", e))?;

        let latitude: Option<f64> = row.try_get("venue_latitude")?;
        let longitude: Option<f64> = row.try_get("venue_longitude")?;

        let venue = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Venue {
                coordinate: Coordinate::new(latitude, longitude)
                    .map_err(|e| decode_error("venue_latitude", e))?,
                radius_km: row.try_get("venue_radius_km")?,
            }),
            _ => None,
        };

        let visibility: String = row.try_get("visibility")?;

        let visibility = Visibility::from_storage(&visibility).ok_or_else(|| {
            decode_error(
                "visibility",
                StoreError::Corrupt(format!("unknown visibility {visibility:?}")),
            )
        })?;

        let token: Option<String> = row.try_get("check_in_token")?;
        let expires_at = row
            .try_get::<Option<SqlxTimestamp>, _>("check_in_token_expires_at")?
            .map(SqlxTimestamp::to_jiff);

        let check_in_token = token
            .zip(expires_at)
            .map(|(value, expires_at)| CheckInToken::new(value, expires_at));

        Ok(Self {
            uuid: EventUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            department: row.try_get("department")?,
            schedule,
            venue,
            visibility,
            check_in_token,
            certificates_issued: row.try_get("certificates_issued")?,
            participants: Vec::new(),
            created_by: row
                .try_get::<Option<Uuid>, _>("created_by")?
                .map(Into::into),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use crate::{
        domain::identities::models::UserUuid,
        test::{TestDb, new_event},
    };

    use super::*;

    #[tokio::test]
    async fn events_round_trip_with_participants() -> TestResult {
        let test_db = TestDb::new().await;
        let events = PgEventsRepository::new(test_db.db());

        let created = events.create_event(new_event("Hack Night", None)?).await?;

        assert!(
            events
                .add_participant(created.uuid, Participant::new("Ada", "ada@campus.edu"))
                .await?
        );
        assert!(
            !events
                .add_participant(created.uuid, Participant::new("Ada", "ADA@campus.edu "))
                .await?,
            "second registration of the same email should be a no-op"
        );

        let loaded = events.get_event(created.uuid).await?;

        assert_eq!(loaded.schedule, created.schedule);
        assert_eq!(loaded.visibility, Visibility::Department);
        assert_eq!(loaded.participants, vec![Participant::new("Ada", "ada@campus.edu")]);

        Ok(())
    }

    #[tokio::test]
    async fn event_names_are_unique_per_department() -> TestResult {
        let test_db = TestDb::new().await;
        let events = PgEventsRepository::new(test_db.db());

        events.create_event(new_event("Hack Night", None)?).await?;

        let duplicate = events.create_event(new_event("Hack Night", None)?).await;

        let mut elsewhere = new_event("Hack Night", None)?;
        elsewhere.department = "ECE".to_string();

        assert!(matches!(duplicate, Err(StoreError::Conflict)));
        assert!(events.create_event(elsewhere).await.is_ok());

        Ok(())
    }

    #[tokio::test]
    async fn latest_check_in_token_wins() -> TestResult {
        let test_db = TestDb::new().await;
        let events = PgEventsRepository::new(test_db.db());
        let created = events.create_event(new_event("Hack Night", None)?).await?;
        let expires_at: Timestamp = "2024-03-16T04:30:00Z".parse()?;

        events
            .replace_check_in_token(created.uuid, CheckInToken::new("first".to_string(), expires_at))
            .await?;
        events
            .replace_check_in_token(created.uuid, CheckInToken::new("second".to_string(), expires_at))
            .await?;

        let token = events
            .get_event(created.uuid)
            .await?
            .check_in_token
            .ok_or("token should be stored")?;

        assert!(token.matches("second"));
        assert!(!token.matches("first"));
        assert_eq!(token.expires_at(), expires_at);

        let missing = events
            .replace_check_in_token(EventUuid::new(), CheckInToken::new("x".to_string(), expires_at))
            .await;

        assert!(matches!(missing, Err(StoreError::NotFound)));

        Ok(())
    }

    #[tokio::test]
    async fn certificates_issued_flag_is_persisted() -> TestResult {
        let test_db = TestDb::new().await;
        let events = PgEventsRepository::new(test_db.db());
        let created = events.create_event(new_event("Hack Night", None)?).await?;

        assert!(!created.certificates_issued);

        events.mark_certificates_issued(created.uuid).await?;

        assert!(events.get_event(created.uuid).await?.certificates_issued);
        assert!(matches!(
            events.mark_certificates_issued(EventUuid::new()).await,
            Err(StoreError::NotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_creator_is_a_missing_reference() -> TestResult {
        let test_db = TestDb::new().await;
        let events = PgEventsRepository::new(test_db.db());

        let result = events
            .create_event(new_event("Hack Night", Some(UserUuid::new()))?)
            .await;

        assert!(
            matches!(result, Err(StoreError::MissingReference)),
            "expected MissingReference, got {result:?}"
        );

        let creator = test_db.insert_user("faculty@campus.edu", None).await;
        let created = events
            .create_event(new_event("Hack Night", Some(creator))?)
            .await?;

        assert_eq!(created.created_by, Some(creator));

        Ok(())
    }
}
