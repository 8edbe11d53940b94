//! Certificates Repository

use async_trait::async_trait;
use attest::token::CertificateKind;
use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use mockall::automock;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query_as};
use uuid::Uuid;

use crate::{
    database::{Db, StoreError},
    domain::certificates::models::{Certificate, CertificateUuid, NewCertificate},
    integrations::content_store::StoredArtifact,
};

const FIND_BY_EVENT_AND_EMAIL_SQL: &str = include_str!("sql/find_certificate_by_event_and_email.sql");
const GET_CERTIFICATE_SQL: &str = include_str!("sql/get_certificate.sql");
const CREATE_CERTIFICATE_SQL: &str = include_str!("sql/create_certificate.sql");
const RECORD_SCAN_SQL: &str = include_str!("sql/record_scan.sql");

/// Certificate persistence. `(event_name, student_email)` and `certificate_id` are unique.
#[automock]
#[async_trait]
pub trait CertificatesRepository: Send + Sync {
    async fn find_by_event_and_email(
        &self,
        event_name: String,
        email: String,
    ) -> Result<Option<Certificate>, StoreError>;

    /// Insert a certificate, failing with [`StoreError::Conflict`] on either unique key.
    async fn create_certificate(
        &self,
        certificate: NewCertificate,
    ) -> Result<Certificate, StoreError>;

    async fn get_by_public_id(&self, certificate_id: String) -> Result<Certificate, StoreError>;

    /// Increment the scan counter and return the updated record.
    async fn record_scan(&self, certificate_id: String) -> Result<Certificate, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgCertificatesRepository {
    db: Db,
}

impl PgCertificatesRepository {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CertificatesRepository for PgCertificatesRepository {
    async fn find_by_event_and_email(
        &self,
        event_name: String,
        email: String,
    ) -> Result<Option<Certificate>, StoreError> {
        query_as::<Postgres, Certificate>(FIND_BY_EVENT_AND_EMAIL_SQL)
            .bind(event_name)
            .bind(email)
            .fetch_optional(self.db.pool())
            .await
            .map_err(StoreError::from)
    }

    async fn create_certificate(
        &self,
        certificate: NewCertificate,
    ) -> Result<Certificate, StoreError> {
        let (artifact_ref, artifact_url) = certificate
            .artifact
            .map(|artifact| (artifact.reference, artifact.url))
            .unzip();

        query_as::<Postgres, Certificate>(CREATE_CERTIFICATE_SQL)
            .bind(certificate.uuid.into_uuid())
            .bind(certificate.certificate_id)
            .bind(certificate.kind.as_str())
            .bind(certificate.token_id)
            .bind(certificate.content_hash)
            .bind(certificate.tx_ref)
            .bind(certificate.student_name)
            .bind(certificate.student_email)
            .bind(certificate.event_name)
            .bind(SqlxDate::from(certificate.event_date))
            .bind(certificate.issued_by.map(Uuid::from))
            .bind(certificate.verification_url)
            .bind(artifact_ref)
            .bind(artifact_url)
            .fetch_one(self.db.pool())
            .await
            .map_err(StoreError::from)
    }

    async fn get_by_public_id(&self, certificate_id: String) -> Result<Certificate, StoreError> {
        query_as::<Postgres, Certificate>(GET_CERTIFICATE_SQL)
            .bind(certificate_id)
            .fetch_one(self.db.pool())
            .await
            .map_err(StoreError::from)
    }

    async fn record_scan(&self, certificate_id: String) -> Result<Certificate, StoreError> {
        query_as::<Postgres, Certificate>(RECORD_SCAN_SQL)
            .bind(certificate_id)
            .fetch_one(self.db.pool())
            .await
            .map_err(StoreError::from)
    }
}

impl<'r> FromRow<'r, PgRow> for Certificate {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("kind")?;

        let kind = CertificateKind::from_storage(&kind).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "kind".to_string(),
            source: Box::new(StoreError::Corrupt(format!("unknown certificate kind {kind:?}"))),
        })?;

        let scan_count: i64 = row.try_get("scan_count")?;

        let scan_count = u64::try_from(scan_count).map_err(|e| sqlx::Error::ColumnDecode {
            index: "scan_count".to_string(),
            source: Box::new(e),
        })?;

        let artifact_ref: Option<String> = row.try_get("artifact_ref")?;
        let artifact_url: Option<String> = row.try_get("artifact_url")?;

        Ok(Self {
            uuid: CertificateUuid::from_uuid(row.try_get("uuid")?),
            certificate_id: row.try_get("certificate_id")?,
            kind,
            token_id: row.try_get("token_id")?,
            content_hash: row.try_get("content_hash")?,
            tx_ref: row.try_get("tx_ref")?,
            student_name: row.try_get("student_name")?,
            student_email: row.try_get("student_email")?,
            event_name: row.try_get("event_name")?,
            event_date: row.try_get::<SqlxDate, _>("event_date")?.to_jiff(),
            issued_by: row
                .try_get::<Option<Uuid>, _>("issued_by")?
                .map(Into::into),
            verification_url: row.try_get("verification_url")?,
            artifact: artifact_ref
                .zip(artifact_url)
                .map(|(reference, url)| StoredArtifact { reference, url }),
            scan_count,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use testresult::TestResult;

    use crate::{domain::identities::models::UserUuid, test::TestDb};

    use super::*;

    fn new_certificate(certificate_id: &str, email: &str) -> NewCertificate {
        NewCertificate {
            uuid: CertificateUuid::new(),
            certificate_id: certificate_id.to_string(),
            kind: CertificateKind::Event,
            token_id: "1".to_string(),
            content_hash: "0xabc".to_string(),
            tx_ref: "0xtx".to_string(),
            student_name: "Ada".to_string(),
            student_email: email.to_string(),
            event_name: "Hack Night".to_string(),
            event_date: date(2024, 3, 15),
            issued_by: None,
            verification_url: format!("https://campus.example/verify/{certificate_id}"),
            artifact: None,
        }
    }

    #[tokio::test]
    async fn both_unique_keys_report_conflict() -> TestResult {
        let test_db = TestDb::new().await;
        let certificates = PgCertificatesRepository::new(test_db.db());

        certificates
            .create_certificate(new_certificate("CERT-0000000000000001", "ada@campus.edu"))
            .await?;

        let same_person = certificates
            .create_certificate(new_certificate("CERT-0000000000000002", "ada@campus.edu"))
            .await;
        let same_id = certificates
            .create_certificate(new_certificate("CERT-0000000000000001", "bob@campus.edu"))
            .await;

        assert!(matches!(same_person, Err(StoreError::Conflict)));
        assert!(matches!(same_id, Err(StoreError::Conflict)));

        Ok(())
    }

    #[tokio::test]
    async fn lookups_find_the_stored_certificate() -> TestResult {
        let test_db = TestDb::new().await;
        let certificates = PgCertificatesRepository::new(test_db.db());

        let stored = certificates
            .create_certificate(NewCertificate {
                kind: CertificateKind::Skill,
                artifact: Some(StoredArtifact {
                    reference: "bafy123".to_string(),
                    url: "https://gateway.example/ipfs/bafy123".to_string(),
                }),
                ..new_certificate("SKILL-0000000000000001", "ada@campus.edu")
            })
            .await?;

        let by_id = certificates
            .get_by_public_id("SKILL-0000000000000001".to_string())
            .await?;
        let by_person = certificates
            .find_by_event_and_email("Hack Night".to_string(), "ada@campus.edu".to_string())
            .await?;
        let nobody = certificates
            .find_by_event_and_email("Hack Night".to_string(), "bob@campus.edu".to_string())
            .await?;

        assert_eq!(by_id, stored);
        assert_eq!(by_id.kind, CertificateKind::Skill);
        assert_eq!(by_id.artifact.map(|artifact| artifact.reference).as_deref(), Some("bafy123"));
        assert_eq!(by_person.map(|certificate| certificate.uuid), Some(stored.uuid));
        assert!(nobody.is_none());
        assert!(matches!(
            certificates.get_by_public_id("CERT-FFFFFFFFFFFFFFFF".to_string()).await,
            Err(StoreError::NotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn certificate_scans_are_counted() -> TestResult {
        let test_db = TestDb::new().await;
        let certificates = PgCertificatesRepository::new(test_db.db());

        certificates
            .create_certificate(new_certificate("CERT-0000000000000001", "ada@campus.edu"))
            .await?;

        certificates
            .record_scan("CERT-0000000000000001".to_string())
            .await?;

        let scanned = certificates
            .record_scan("CERT-0000000000000001".to_string())
            .await?;

        assert_eq!(scanned.scan_count, 2);
        assert_eq!(scanned.event_date, date(2024, 3, 15));
        assert!(matches!(
            certificates.record_scan("CERT-FFFFFFFFFFFFFFFF".to_string()).await,
            Err(StoreError::NotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_issuer_is_a_missing_reference() -> TestResult {
        let test_db = TestDb::new().await;
        let certificates = PgCertificatesRepository::new(test_db.db());

        let result = certificates
            .create_certificate(NewCertificate {
                issued_by: Some(UserUuid::new()),
                ..new_certificate("CERT-0000000000000001", "ada@campus.edu")
            })
            .await;

        assert!(
            matches!(result, Err(StoreError::MissingReference)),
            "expected MissingReference, got {result:?}"
        );

        Ok(())
    }
}
