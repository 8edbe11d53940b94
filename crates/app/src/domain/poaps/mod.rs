//! Proofs of Attendance

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::PoapsServiceError;
pub use repository::*;
pub use service::*;
