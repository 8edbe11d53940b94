//! External collaborators: ledger, content store, rendering and side effects.

pub mod artifacts;
pub mod content_store;
pub mod ledger;
pub mod notifications;
