//! Webhook gateway for fastci.
//!
//! Authenticates inbound GitHub/Bitbucket webhooks, normalizes their
//! payloads into the internal event shape and enqueues accepted events
//! onto the build queue.

pub mod auth;
pub mod providers;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Terminal outcome of one webhook request. The gateway never surfaces an
/// error to its caller; every failure mode resolves to a rejection reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    Rejected(String),
}
