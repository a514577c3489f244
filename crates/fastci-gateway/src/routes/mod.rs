//! Gateway routes.

pub mod health;
pub mod webhook;

use crate::AppState;
use axum::Router;

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(webhook::router())
        .with_state(state)
}
