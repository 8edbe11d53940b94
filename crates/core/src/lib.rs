//! Attest
//!
//! Scheduling, proof-of-presence and credential-hashing rules for campus
//! events. Everything here is synchronous and free of I/O; persistence and
//! ledger calls live in `attest-app`.

pub mod clock;
pub mod geofence;
pub mod hashing;
pub mod scoring;
pub mod token;
pub mod window;
