//! Content Hashes
//!
//! Deterministic digests that anchor credentials on the ledger. Both hashes
//! bind to event name and date by value, not to any database row.

use alloy_primitives::{hex, keccak256};
use jiff::civil::Date;
use sha2::{Digest, Sha256};

/// Render a civil date the way the hash preimage expects it: UTC midnight, millisecond precision.
#[must_use]
pub fn event_date_iso(date: Date) -> String {
    format!("{date}T00:00:00.000Z")
}

/// Attendance hash: `keccak256("{event_id}-{event_name}-{event_date_iso}")`, `0x`-prefixed.
#[must_use]
pub fn poap_content_hash(event_id: &str, event_name: &str, event_date: Date) -> String {
    let preimage = format!("{event_id}-{event_name}-{}", event_date_iso(event_date));

    format!("0x{}", hex::encode(keccak256(preimage.as_bytes())))
}

/// Certificate hash: `sha256(email + event_date + event_name)` as lowercase hex, `0x`-prefixed.
#[must_use]
pub fn certificate_content_hash(email: &str, event_date: Date, event_name: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(email.as_bytes());
    hasher.update(event_date.to_string().as_bytes());
    hasher.update(event_name.as_bytes());

    format!("0x{:x}", hasher.finalize())
}
