//! Activity Models

use serde_json::Value;

use crate::domain::identities::models::UserUuid;

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    CertificateIssued,
    CertificateRevoked,
    BulkIssuanceCompleted,
    PoapClaimed,
    PoapRevoked,
}

impl ActivityAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CertificateIssued => "certificate.issued",
            Self::CertificateRevoked => "certificate.revoked",
            Self::BulkIssuanceCompleted => "certificate.bulk_issued",
            Self::PoapClaimed => "poap.claimed",
            Self::PoapRevoked => "poap.revoked",
        }
    }
}

/// An activity-log entry waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivityEntry {
    pub actor: Option<UserUuid>,
    pub action: ActivityAction,
    pub subject: String,
    pub details: Value,
}
