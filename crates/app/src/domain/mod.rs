//! Attest Domain Concerns

pub mod activity;
pub mod certificates;
pub mod collaborators;
pub mod events;
pub mod identities;
pub mod poaps;
pub mod policy;
pub mod quizzes;

/// Coarse class of a service error, for rendering "bad input" apart from
/// "already done" and "try again later".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing input.
    Validation,

    /// The request conflicts with recorded state.
    Conflict,

    /// A remote dependency failed.
    External,

    /// Storage or runtime failure.
    Internal,
}
