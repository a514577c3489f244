//! End-to-end gateway tests: a webhook request in, a queued job file out.

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use fastci_config::GatewayConfig;
use fastci_core::NormalizedEvent;
use fastci_gateway::{AppState, routes};
use fastci_scheduler::BuildQueue;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha1::Sha1;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const TRIGGER_ID: &str = "deadbeef";
const SECRET: &str = "s3cret";

fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

fn gateway(queue_dir: &Path, server: &mockito::Server) -> Router {
    let github_url = format!("{}/meta", server.url());
    let bitbucket_url = format!("{}/ip-ranges", server.url());
    let config = GatewayConfig::from_lookup(|var| match var {
        "FASTCI_TRIGGER_ID" => Some(TRIGGER_ID.to_string()),
        "FASTCI_TRIGGER_BRANCH" => Some("main".to_string()),
        "FASTCI_TRIGGER_SECRET" => Some(SECRET.to_string()),
        "FASTCI_GITHUB_META_URL" => Some(github_url.clone()),
        "FASTCI_BITBUCKET_RANGES_URL" => Some(bitbucket_url.clone()),
        _ => None,
    })
    .unwrap();

    let queue = Arc::new(BuildQueue::new(queue_dir).unwrap());
    let state = AppState::new(Arc::new(config), queue, reqwest::Client::new());
    routes::router(state).layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 9], 4000))))
}

async fn mock_github_ranges(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("GET", "/meta")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"hooks": ["192.30.252.0/22"]}"#)
        .create_async()
        .await
}

fn github_push_body() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "ref": "refs/heads/main",
        "compare": "https://github.com/acme/widget/compare/abc...def",
        "repository": { "html_url": "https://github.com/acme/widget" },
        "head_commit": {
            "id": "53cb2d5270c6917c834ee6a6917c834ee6a60000",
            "message": "fix the widget",
            "timestamp": "2023-01-11T08:36:10Z",
            "url": "https://github.com/acme/widget/commit/53cb2d",
            "author": { "name": "Jane Doe", "email": "jane@example.org" },
            "committer": { "name": "GitHub", "email": "noreply@github.com" }
        }
    }))
    .unwrap()
}

fn github_request(trigger_id: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/{trigger_id}"))
        .header("User-Agent", "GitHub-Hookshot/044aadd")
        .header("X-GitHub-Event", "push")
        .header("X-Forwarded-For", "10.0.0.1, 192.30.252.7")
        .header("X-Hub-Signature", sign(&body))
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn rejection_msg(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    value["msg"].as_str().unwrap_or_default().to_string()
}

fn queued_files(queue_dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(queue_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn signed_github_push_to_the_trigger_branch_is_queued() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    let _ranges = mock_github_ranges(&mut server).await;

    let app = gateway(dir.path(), &server);
    let response = app
        .oneshot(github_request(TRIGGER_ID, github_push_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let files = queued_files(dir.path());
    assert_eq!(files.len(), 1);

    let yaml = std::fs::read_to_string(&files[0]).unwrap();
    assert!(yaml.contains("event_type: push"));
    assert!(yaml.contains("branch: main"));

    let event: NormalizedEvent = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(
        event.commit_hash,
        "53cb2d5270c6917c834ee6a6917c834ee6a60000"
    );
    assert_eq!(event.repo_url, "https://github.com/acme/widget");
}

#[tokio::test]
async fn source_address_outside_the_published_ranges_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    let _ranges = mock_github_ranges(&mut server).await;

    let app = gateway(dir.path(), &server);
    let body = github_push_body();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/{TRIGGER_ID}"))
        .header("User-Agent", "GitHub-Hookshot/044aadd")
        .header("X-GitHub-Event", "push")
        .header("X-Forwarded-For", "203.0.113.9")
        .header("X-Hub-Signature", sign(&body))
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let msg = rejection_msg(response).await;
    assert!(msg.contains("not in the list of accepted source addresses"));
    assert!(queued_files(dir.path()).is_empty());
}

#[tokio::test]
async fn unreachable_range_endpoint_rejects_the_request() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/meta")
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let app = gateway(dir.path(), &server);
    let response = app
        .oneshot(github_request(TRIGGER_ID, github_push_body()))
        .await
        .unwrap();

    let msg = rejection_msg(response).await;
    assert!(msg.contains("could not determine the acceptable github source ranges"));
    assert!(queued_files(dir.path()).is_empty());
}

#[tokio::test]
async fn wrong_trigger_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    let _ranges = mock_github_ranges(&mut server).await;

    let app = gateway(dir.path(), &server);
    let response = app
        .oneshot(github_request("cafebabe", github_push_body()))
        .await
        .unwrap();

    let msg = rejection_msg(response).await;
    assert!(msg.contains("trigger id cafebabe does not match"));
    assert!(queued_files(dir.path()).is_empty());
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    let _ranges = mock_github_ranges(&mut server).await;

    let app = gateway(dir.path(), &server);
    let body = github_push_body();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/{TRIGGER_ID}"))
        .header("User-Agent", "GitHub-Hookshot/044aadd")
        .header("X-GitHub-Event", "push")
        .header("X-Forwarded-For", "192.30.252.7")
        .header("X-Hub-Signature", sign(b"something else entirely"))
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let msg = rejection_msg(response).await;
    assert!(msg.contains("digest does not match signature"));
    assert!(queued_files(dir.path()).is_empty());
}

#[tokio::test]
async fn push_to_another_branch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    let _ranges = mock_github_ranges(&mut server).await;

    let mut payload: Value = serde_json::from_slice(&github_push_body()).unwrap();
    payload["ref"] = json!("refs/heads/feature-y");
    let body = serde_json::to_vec(&payload).unwrap();

    let app = gateway(dir.path(), &server);
    let response = app.oneshot(github_request(TRIGGER_ID, body)).await.unwrap();

    let msg = rejection_msg(response).await;
    assert!(msg.contains("trigger branch feature-y does not match branch main"));
    assert!(queued_files(dir.path()).is_empty());
}

#[tokio::test]
async fn bitbucket_pull_request_queues_with_the_source_branch() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/ip-ranges")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items": [{"cidr": "104.192.136.0/21"}]}"#)
        .create_async()
        .await;

    let body = serde_json::to_vec(&json!({
        "pullrequest": {
            "title": "Add the frobnicator",
            "created_on": "2023-01-12T10:00:00+00:00",
            "author": { "display_name": "Jane Doe" },
            "source": {
                "branch": { "name": "feature-x" },
                "commit": {
                    "hash": "917c834ee6a6",
                    "links": { "html": { "href": "https://bitbucket.org/acme/widget/commits/917c83" } }
                }
            },
            "destination": {
                "branch": { "name": "main" },
                "commit": {
                    "hash": "53cb2d5270c6",
                    "links": { "html": { "href": "https://bitbucket.org/acme/widget/commits/53cb2d" } }
                },
                "repository": {
                    "links": { "html": { "href": "https://bitbucket.org/acme/widget" } }
                }
            }
        }
    }))
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{TRIGGER_ID}"))
        .header("User-Agent", "Bitbucket-Webhooks/2.0")
        .header("X-Event-Key", "pullrequest:created")
        .header("X-Forwarded-For", "104.192.136.5")
        .header("X-Hub-Signature", sign(&body))
        .body(Body::from(body))
        .unwrap();

    let app = gateway(dir.path(), &server);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let files = queued_files(dir.path());
    assert_eq!(files.len(), 1);
    let event: NormalizedEvent =
        serde_yaml::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(event.branch, "main");
    assert_eq!(event.src_branch.as_deref(), Some("feature-x"));
    assert_eq!(event.checkout_ref(), "feature-x");
}

#[tokio::test]
async fn request_without_a_signature_passes_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    let _ranges = mock_github_ranges(&mut server).await;

    let app = gateway(dir.path(), &server);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/{TRIGGER_ID}"))
        .header("User-Agent", "GitHub-Hookshot/044aadd")
        .header("X-GitHub-Event", "push")
        .header("X-Forwarded-For", "192.30.252.7")
        .body(Body::from(github_push_body()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(queued_files(dir.path()).len(), 1);
}
