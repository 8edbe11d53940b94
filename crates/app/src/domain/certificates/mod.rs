//! Certificates

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::CertificatesServiceError;
pub use repository::*;
pub use service::*;
