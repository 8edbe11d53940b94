//! Events

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::EventsServiceError;
pub use repository::*;
pub use service::*;
