//! Shared test fixtures: in-memory stores, a fake ledger and a fixed clock.

mod context;

use alloy_primitives::{Address, keccak256};
use attest::window::{EventSchedule, WindowError};
use jiff::Timestamp;

use crate::domain::{
    events::models::{EventUuid, NewEvent, Visibility, normalize_email},
    identities::models::{Identity, UserUuid, WalletAddress},
    poaps::models::GpsFix,
};

pub(crate) use context::TestContext;
pub(crate) use db::TestDb;
pub(crate) use ledger::FakeLedger;
pub(crate) use memory::MemoryStore;

/// Parse an RFC 3339 instant such as `2024-03-15T10:00:00+05:30`.
pub(crate) fn at(instant: &str) -> Result<Timestamp, jiff::Error> {
    instant.parse()
}

pub(crate) fn identity(name: &str, email: &str) -> Identity {
    Identity {
        user: UserUuid::new(),
        email: email.to_string(),
        name: name.to_string(),
    }
}

/// A fix with a plausible phone-grade accuracy.
pub(crate) fn fix_at(latitude: f64, longitude: f64) -> GpsFix {
    GpsFix {
        latitude,
        longitude,
        accuracy_m: Some(12.0),
    }
}

/// A wallet derived from the email, so the same email always maps to the same address.
pub(crate) fn wallet_for(email: &str) -> WalletAddress {
    WalletAddress::new(Address::from_word(keccak256(normalize_email(email).as_bytes())))
}

/// A CSE department event on 2024-03-15, 10:00-12:00, without a venue.
pub(crate) fn new_event(name: &str, created_by: Option<UserUuid>) -> Result<NewEvent, WindowError> {
    Ok(NewEvent {
        uuid: EventUuid::new(),
        name: name.to_string(),
        department: "CSE".to_string(),
        schedule: EventSchedule::parse("2024-03-15", "10:00", "12:00")?,
        venue: None,
        visibility: Visibility::Department,
        created_by,
    })
}
