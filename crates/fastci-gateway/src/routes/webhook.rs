//! The webhook trigger endpoint.

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use ipnet::IpNet;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use tracing::{info, warn};

use crate::providers::{self, Provider, ranges};
use crate::{AppState, EnqueueOutcome, auth};

pub fn router() -> Router<AppState> {
    Router::new().route("/{trigger_id}", post(receive_webhook))
}

async fn receive_webhook(
    State(state): State<AppState>,
    Path(trigger_id): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle(&state, &trigger_id, peer.ip(), &headers, &body).await {
        EnqueueOutcome::Accepted => StatusCode::OK.into_response(),
        // The caller gets a best-effort diagnostic, nothing more.
        EnqueueOutcome::Rejected(msg) => {
            (StatusCode::OK, Json(json!({ "msg": msg }))).into_response()
        }
    }
}

/// Run the full validation chain for one webhook request.
///
/// The chain short-circuits on the first failure and never raises: every
/// failure mode resolves to a rejection reason. Only the final enqueue
/// step mutates any state.
pub async fn handle(
    state: &AppState,
    trigger_id: &str,
    peer: IpAddr,
    headers: &HeaderMap,
    body: &[u8],
) -> EnqueueOutcome {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let provider = Provider::from_user_agent(user_agent);

    // 1. Source address.
    let addr = match auth::client_addr(headers, peer) {
        Ok(addr) => addr,
        Err(msg) => return reject(msg),
    };
    let blocks = match &state.config.source_override {
        Some(override_addr) => vec![IpNet::from(*override_addr)],
        None => match ranges::fetch_hook_blocks(&state.http, provider, &state.config).await {
            Ok(blocks) => blocks,
            Err(msg) => return reject(msg),
        },
    };
    if let Err(msg) = auth::check_source_ip(addr, &blocks) {
        return reject(msg);
    }
    info!(%addr, %provider, "source address accepted");

    // 2. Trigger id.
    if trigger_id != state.config.trigger_id {
        return reject(format!(
            "trigger id {trigger_id} does not match the expected value"
        ));
    }

    // 3. Shared secret (optional).
    if let Err(msg) = auth::check_secret(state.config.secret.as_deref(), headers, body) {
        return reject(msg);
    }

    // 4. Payload normalization.
    let event = match providers::normalize(provider, headers, body) {
        Ok(event) => event,
        Err(msg) => return reject(msg),
    };

    // 5. Branch allow-list.
    if event.branch != state.config.trigger_branch {
        return reject(format!(
            "trigger branch {} does not match branch {} to test and build on",
            event.branch, state.config.trigger_branch
        ));
    }

    // 6. Durable enqueue.
    match state.queue.enqueue(&event).await {
        Ok(path) => {
            info!(
                path = %path.display(),
                event_type = %event.event_type,
                commit = %event.commit_hash,
                "build job queued"
            );
            EnqueueOutcome::Accepted
        }
        Err(e) => reject(format!("could not queue the build job: {e}")),
    }
}

fn reject(msg: String) -> EnqueueOutcome {
    warn!(%msg, "webhook rejected");
    EnqueueOutcome::Rejected(msg)
}
