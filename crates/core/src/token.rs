//! Opaque Tokens
//!
//! Check-in tokens and public certificate identifiers.

use std::fmt::{self, Display, Formatter};

use alloy_primitives::hex;
use jiff::{SignedDuration, Timestamp};
use rand::{RngCore, rngs::OsRng};
use subtle::ConstantTimeEq;

/// Number of random bytes in a check-in token (256 bits).
pub const CHECK_IN_TOKEN_BYTES: usize = 32;

/// Default lifetime of a check-in token, measured from issuance.
pub const DEFAULT_CHECK_IN_TOKEN_TTL: SignedDuration = SignedDuration::from_hours(24);

/// Number of random bytes in a public certificate id suffix.
pub const CERTIFICATE_ID_BYTES: usize = 8;

/// The single outstanding check-in token of an event.
#[derive(Clone, PartialEq, Eq)]
pub struct CheckInToken {
    value: String,
    expires_at: Timestamp,
}

impl CheckInToken {
    /// Wrap an existing token value.
    #[must_use]
    pub fn new(value: String, expires_at: Timestamp) -> Self {
        Self { value, expires_at }
    }

    /// Mint a fresh random token valid until `expires_at`.
    #[must_use]
    pub fn generate(expires_at: Timestamp) -> Self {
        let mut bytes = [0_u8; CHECK_IN_TOKEN_BYTES];

        OsRng.fill_bytes(&mut bytes);

        Self::new(hex::encode(bytes), expires_at)
    }

    /// Opaque token value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Instant after which the token is no longer accepted.
    #[must_use]
    pub const fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Whether `presented` is this token.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        self.value.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for CheckInToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckInToken")
            .field("value", &"**redacted**")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Shareable check-in URL: `{base_url}/poap/checkin?token={token}&eventId={event_id}`.
#[must_use]
pub fn check_in_url(base_url: &str, token: &str, event_id: &str) -> String {
    format!(
        "{}/poap/checkin?token={token}&eventId={event_id}",
        base_url.trim_end_matches('/')
    )
}

/// Origin of a certificate, which selects its public id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateKind {
    /// Issued for attending an event.
    Event,

    /// Issued for passing a skill quiz.
    Skill,
}

impl CertificateKind {
    /// Public id prefix, without the separator.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Event => "CERT",
            Self::Skill => "SKILL",
        }
    }

    /// Stable lowercase name for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Skill => "skill",
        }
    }

    /// Inverse of [`Self::as_str`].
    #[must_use]
    pub fn from_storage(value: &str) -> Option<Self> {
        match value {
            "event" => Some(Self::Event),
            "skill" => Some(Self::Skill),
            _ => None,
        }
    }
}

impl Display for CertificateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a human-shareable certificate id such as `CERT-9F1C04A2B37DE580`.
#[must_use]
pub fn generate_certificate_id(kind: CertificateKind) -> String {
    let mut bytes = [0_u8; CERTIFICATE_ID_BYTES];

    OsRng.fill_bytes(&mut bytes);

    format!("{}-{}", kind.prefix(), hex::encode_upper(bytes))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn generated_tokens_are_long_and_distinct() -> TestResult {
        let expires_at: Timestamp = "2024-03-16T00:00:00Z".parse()?;

        let a = CheckInToken::generate(expires_at);
        let b = CheckInToken::generate(expires_at);

        assert_eq!(a.value().len(), CHECK_IN_TOKEN_BYTES * 2);
        assert_ne!(a.value(), b.value(), "tokens must not repeat");

        Ok(())
    }

    #[test]
    fn matches_only_the_exact_value() -> TestResult {
        let token = CheckInToken::new("abc123".to_string(), "2024-03-16T00:00:00Z".parse()?);

        assert!(token.matches("abc123"));
        assert!(!token.matches("abc124"));
        assert!(!token.matches("abc12"));
        assert!(!token.matches("abc1234"));
        assert!(!token.matches(""));

        Ok(())
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() -> TestResult {
        let expires_at: Timestamp = "2024-03-16T00:00:00Z".parse()?;
        let token = CheckInToken::new("t".to_string(), expires_at);

        assert!(!token.is_expired(expires_at));
        assert!(token.is_expired(expires_at.checked_add(SignedDuration::from_millis(1))?));

        Ok(())
    }

    #[test]
    fn debug_output_redacts_the_value() -> TestResult {
        let token = CheckInToken::new("secret-value".to_string(), "2024-03-16T00:00:00Z".parse()?);

        assert!(
            !format!("{token:?}").contains("secret-value"),
            "token value leaked into debug output"
        );

        Ok(())
    }

    #[test]
    fn check_in_url_embeds_token_and_event() {
        let url = check_in_url("https://campus.example/", "deadbeef", "evt-42");

        assert_eq!(
            url,
            "https://campus.example/poap/checkin?token=deadbeef&eventId=evt-42"
        );
    }

    #[test]
    fn certificate_ids_carry_their_prefix() {
        let cert = generate_certificate_id(CertificateKind::Event);
        let skill = generate_certificate_id(CertificateKind::Skill);

        assert!(cert.starts_with("CERT-"), "unexpected id {cert}");
        assert!(skill.starts_with("SKILL-"), "unexpected id {skill}");
        assert_eq!(cert.len(), "CERT-".len() + CERTIFICATE_ID_BYTES * 2);
    }
}
