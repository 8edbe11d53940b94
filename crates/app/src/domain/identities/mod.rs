//! Identities
//!
//! Users are owned by the identity provider; this module only reads the
//! wallet each user has linked.

pub mod models;
mod repository;

pub use repository::*;
