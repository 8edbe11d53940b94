//! POAP Models

use jiff::Timestamp;

use crate::{
    domain::{
        events::models::EventUuid,
        identities::models::{Identity, WalletAddress},
    },
    uuids::TypedUuid,
};

/// POAP UUID
pub type PoapUuid = TypedUuid<Poap>;

/// A GPS fix as reported by the client, before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,

    /// Reported accuracy radius in metres.
    pub accuracy_m: Option<f64>,
}

/// Everything a participant presents to check in.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRequest {
    pub token: String,
    pub event: EventUuid,
    pub identity: Identity,
    pub fix: GpsFix,
}

/// Proof of attendance record.
#[derive(Debug, Clone, PartialEq)]
pub struct Poap {
    pub uuid: PoapUuid,
    pub event: EventUuid,
    pub token_id: String,
    pub tx_ref: String,
    pub event_hash: String,
    pub wallet: WalletAddress,
    pub email: String,
    pub name: String,
    pub checked_in_at: Timestamp,
    pub fix: GpsFix,
    pub attendance_score: u8,
    pub revoked: bool,
    pub revoked_reason: Option<String>,
}

/// New POAP Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoap {
    pub uuid: PoapUuid,
    pub event: EventUuid,
    pub token_id: String,
    pub tx_ref: String,
    pub event_hash: String,
    pub wallet: WalletAddress,
    pub email: String,
    pub name: String,
    pub checked_in_at: Timestamp,
    pub fix: GpsFix,
    pub attendance_score: u8,
}
