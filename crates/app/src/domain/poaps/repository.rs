//! POAP Repository

use async_trait::async_trait;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use mockall::automock;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query_as};

use crate::{
    database::{Db, StoreError},
    domain::{
        events::models::EventUuid,
        identities::models::WalletAddress,
        poaps::models::{GpsFix, NewPoap, Poap, PoapUuid},
    },
};

const FIND_POAP_SQL: &str = include_str!("sql/find_poap.sql");
const CREATE_POAP_SQL: &str = include_str!("sql/create_poap.sql");
const LIST_POAPS_SQL: &str = include_str!("sql/list_poaps.sql");
const REVOKE_POAP_SQL: &str = include_str!("sql/revoke_poap.sql");

/// POAP persistence. `(wallet, event_hash)` is unique.
#[automock]
#[async_trait]
pub trait PoapsRepository: Send + Sync {
    async fn find_poap(
        &self,
        wallet: WalletAddress,
        event_hash: String,
    ) -> Result<Option<Poap>, StoreError>;

    /// Insert a POAP, failing with [`StoreError::Conflict`] if the wallet already claimed.
    async fn create_poap(&self, poap: NewPoap) -> Result<Poap, StoreError>;

    async fn list_poaps(&self, event: EventUuid) -> Result<Vec<Poap>, StoreError>;

    async fn revoke_poap(&self, poap: PoapUuid, reason: String) -> Result<Poap, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgPoapsRepository {
    db: Db,
}

impl PgPoapsRepository {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PoapsRepository for PgPoapsRepository {
    async fn find_poap(
        &self,
        wallet: WalletAddress,
        event_hash: String,
    ) -> Result<Option<Poap>, StoreError> {
        query_as::<Postgres, Poap>(FIND_POAP_SQL)
            .bind(wallet.to_string())
            .bind(event_hash)
            .fetch_optional(self.db.pool())
            .await
            .map_err(StoreError::from)
    }

    async fn create_poap(&self, poap: NewPoap) -> Result<Poap, StoreError> {
        query_as::<Postgres, Poap>(CREATE_POAP_SQL)
            .bind(poap.uuid.into_uuid())
            .bind(poap.event.into_uuid())
            .bind(poap.token_id)
            .bind(poap.tx_ref)
            .bind(poap.event_hash)
            .bind(poap.wallet.to_string())
            .bind(poap.email)
            .bind(poap.name)
            .bind(SqlxTimestamp::from(poap.checked_in_at))
            .bind(poap.fix.latitude)
            .bind(poap.fix.longitude)
            .bind(poap.fix.accuracy_m)
            .bind(i16::from(poap.attendance_score))
            .fetch_one(self.db.pool())
            .await
            .map_err(StoreError::from)
    }

    async fn list_poaps(&self, event: EventUuid) -> Result<Vec<Poap>, StoreError> {
        query_as::<Postgres, Poap>(LIST_POAPS_SQL)
            .bind(event.into_uuid())
            .fetch_all(self.db.pool())
            .await
            .map_err(StoreError::from)
    }

    async fn revoke_poap(&self, poap: PoapUuid, reason: String) -> Result<Poap, StoreError> {
        query_as::<Postgres, Poap>(REVOKE_POAP_SQL)
            .bind(poap.into_uuid())
            .bind(reason)
            .fetch_one(self.db.pool())
            .await
            .map_err(StoreError::from)
    }
}

impl<'r> FromRow<'r, PgRow> for Poap {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let wallet: String = row.try_get("wallet_address")?;

        let wallet = wallet
            .parse::<WalletAddress>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "wallet_address".to_string(),
                source: Box::new(e),
            })?;

        let score: i16 = row.try_get("attendance_score")?;

        let attendance_score = u8::try_from(score).map_err(|e| sqlx::Error::ColumnDecode {
            index: "attendance_score".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: PoapUuid::from_uuid(row.try_get("uuid")?),
            event: EventUuid::from_uuid(row.try_get("event_uuid")?),
            token_id: row.try_get("token_id")?,
            tx_ref: row.try_get("tx_ref")?,
            event_hash: row.try_get("event_hash")?,
            wallet,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            checked_in_at: row.try_get::<SqlxTimestamp, _>("checked_in_at")?.to_jiff(),
            fix: GpsFix {
                latitude: row.try_get("latitude")?,
                longitude: row.try_get("longitude")?,
                accuracy_m: row.try_get("accuracy_m")?,
            },
            attendance_score,
            revoked: row.try_get("revoked")?,
            revoked_reason: row.try_get("revoked_reason")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use crate::{
        domain::events::{EventsRepository, PgEventsRepository},
        test::{TestDb, fix_at, new_event, wallet_for},
    };

    use super::*;

    fn new_poap(event: EventUuid, email: &str, checked_in_at: &str) -> TestResult<NewPoap> {
        Ok(NewPoap {
            uuid: PoapUuid::new(),
            event,
            token_id: "7".to_string(),
            tx_ref: "0xtx".to_string(),
            event_hash: "0xhash".to_string(),
            wallet: wallet_for(email),
            email: email.to_string(),
            name: email.to_string(),
            checked_in_at: checked_in_at.parse::<Timestamp>()?,
            fix: fix_at(12.9716, 77.5946),
            attendance_score: 95,
        })
    }

    async fn seeded_event(test_db: &TestDb) -> TestResult<EventUuid> {
        let event = PgEventsRepository::new(test_db.db())
            .create_event(new_event("Hack Night", None)?)
            .await?;

        Ok(event.uuid)
    }

    #[tokio::test]
    async fn one_poap_per_wallet_and_event_hash() -> TestResult {
        let test_db = TestDb::new().await;
        let poaps = PgPoapsRepository::new(test_db.db());
        let event = seeded_event(&test_db).await?;

        let stored = poaps
            .create_poap(new_poap(event, "ada@campus.edu", "2024-03-15T04:35:00Z")?)
            .await?;
        let second = poaps
            .create_poap(new_poap(event, "ada@campus.edu", "2024-03-15T04:36:00Z")?)
            .await;

        assert_eq!(stored.wallet, wallet_for("ada@campus.edu"));
        assert_eq!(stored.attendance_score, 95);
        assert_eq!(stored.fix, fix_at(12.9716, 77.5946));
        assert!(!stored.revoked);
        assert!(matches!(second, Err(StoreError::Conflict)));

        let found = poaps
            .find_poap(wallet_for("ada@campus.edu"), "0xhash".to_string())
            .await?;
        let absent = poaps
            .find_poap(wallet_for("bob@campus.edu"), "0xhash".to_string())
            .await?;

        assert_eq!(found.map(|poap| poap.uuid), Some(stored.uuid));
        assert!(absent.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn poaps_are_listed_per_event_in_check_in_order() -> TestResult {
        let test_db = TestDb::new().await;
        let poaps = PgPoapsRepository::new(test_db.db());
        let event = seeded_event(&test_db).await?;
        let other = PgEventsRepository::new(test_db.db())
            .create_event(new_event("Demo Day", None)?)
            .await?
            .uuid;

        poaps
            .create_poap(new_poap(event, "bob@campus.edu", "2024-03-15T04:50:00Z")?)
            .await?;
        poaps
            .create_poap(new_poap(event, "ada@campus.edu", "2024-03-15T04:35:00Z")?)
            .await?;
        poaps
            .create_poap(NewPoap {
                event_hash: "0xother".to_string(),
                ..new_poap(other, "ada@campus.edu", "2024-03-15T04:40:00Z")?
            })
            .await?;

        let listed: Vec<String> = poaps
            .list_poaps(event)
            .await?
            .into_iter()
            .map(|poap| poap.email)
            .collect();

        assert_eq!(listed, ["ada@campus.edu", "bob@campus.edu"]);

        Ok(())
    }

    #[tokio::test]
    async fn revoking_keeps_the_record_with_its_reason() -> TestResult {
        let test_db = TestDb::new().await;
        let poaps = PgPoapsRepository::new(test_db.db());
        let event = seeded_event(&test_db).await?;

        let stored = poaps
            .create_poap(new_poap(event, "ada@campus.edu", "2024-03-15T04:35:00Z")?)
            .await?;

        let revoked = poaps
            .revoke_poap(stored.uuid, "shared the QR code".to_string())
            .await?;

        assert!(revoked.revoked);
        assert_eq!(revoked.revoked_reason.as_deref(), Some("shared the QR code"));
        assert_eq!(poaps.list_poaps(event).await?, vec![revoked]);

        let missing = poaps
            .revoke_poap(PoapUuid::new(), "unknown".to_string())
            .await;

        assert!(matches!(missing, Err(StoreError::NotFound)));

        Ok(())
    }

    #[tokio::test]
    async fn poap_for_unknown_event_is_a_missing_reference() -> TestResult {
        let test_db = TestDb::new().await;
        let poaps = PgPoapsRepository::new(test_db.db());

        let result = poaps
            .create_poap(new_poap(EventUuid::new(), "ada@campus.edu", "2024-03-15T04:35:00Z")?)
            .await;

        assert!(
            matches!(result, Err(StoreError::MissingReference)),
            "expected MissingReference, got {result:?}"
        );

        Ok(())
    }
}
