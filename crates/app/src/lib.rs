//! Campus credentialing services: events, attendance claims and certificates.

pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod integrations;
pub mod observability;
pub mod retry;

#[cfg(test)]
mod test;

mod uuids;
