//! End-to-end pipeline tests against a local HTTP server that stands in for
//! the Zoom OAuth endpoint, the Zoom meeting list, and the Slack webhook.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use meetbrief::config::Config;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorded {
    token_auth_headers: Arc<Mutex<Vec<String>>>,
    webhook_payloads: Arc<Mutex<Vec<Value>>>,
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_config(addr: SocketAddr) -> Config {
    let base = format!("http://{addr}");
    Config {
        zoom_client_id: "test-id".to_string(),
        zoom_client_secret: "test-secret".to_string(),
        zoom_account_id: "test-account".to_string(),
        slack_webhook_url: format!("{base}/webhook"),
        slack_channel: "#standups".to_string(),
        utc_offset_hours: 9,
        page_size: 100,
        zoom_api_base_url: base.clone(),
        zoom_oauth_base_url: base,
    }
}

async fn token_handler(State(recorded): State<Recorded>, headers: HeaderMap) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    recorded.token_auth_headers.lock().unwrap().push(auth);
    Json(json!({"access_token": "test-token", "token_type": "bearer", "expires_in": 3600}))
}

async fn webhook_handler(
    State(recorded): State<Recorded>,
    Json(payload): Json<Value>,
) -> StatusCode {
    recorded.webhook_payloads.lock().unwrap().push(payload);
    StatusCode::OK
}

fn meeting(topic: &str, start_time: String) -> Value {
    json!({
        "uuid": "u==",
        "id": 42,
        "topic": topic,
        "type": 2,
        "start_time": start_time,
        "duration": 30,
        "timezone": "UTC",
        "join_url": format!("https://zoom.us/j/{topic}")
    })
}

#[tokio::test]
async fn posts_two_blocks_for_todays_meetings() {
    let recorded = Recorded::default();
    let today = Utc::now().date_naive();
    let tomorrow = today + Duration::days(1);
    let meetings = json!({
        "page_size": 100,
        "meetings": [
            meeting("planning", format!("{today}T05:00:00Z")),
            meeting("standup", format!("{today}T01:00:00Z")),
            meeting("offsite", format!("{tomorrow}T01:00:00Z")),
        ]
    });

    let app = Router::new()
        .route("/oauth/token", post(token_handler))
        .route(
            "/v2/users/me/meetings",
            get(move || async move { Json(meetings) }),
        )
        .route("/webhook", post(webhook_handler))
        .with_state(recorded.clone());
    let addr = serve(app).await;

    meetbrief::app::run(&test_config(addr)).await.unwrap();

    let auth_headers = recorded.token_auth_headers.lock().unwrap();
    assert_eq!(auth_headers.len(), 1);
    // base64("test-id:test-secret")
    assert_eq!(auth_headers[0], "Basic dGVzdC1pZDp0ZXN0LXNlY3JldA==");

    let payloads = recorded.webhook_payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["channel"], "#standups");
    let text = payloads[0]["text"].as_str().unwrap();
    assert_eq!(text.matches("🔹").count(), 2);
    // Chronological order, not response order.
    assert!(text.find("standup").unwrap() < text.find("planning").unwrap());
    assert!(!text.contains("offsite"));
    assert!(text.ends_with("총 2개의 회의가 예정되어 있습니다."));
}

#[tokio::test]
async fn failed_fetch_degrades_to_an_empty_briefing() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/oauth/token", post(token_handler))
        .route(
            "/v2/users/me/meetings",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/webhook", post(webhook_handler))
        .with_state(recorded.clone());
    let addr = serve(app).await;

    meetbrief::app::run(&test_config(addr)).await.unwrap();

    let payloads = recorded.webhook_payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    let text = payloads[0]["text"].as_str().unwrap();
    assert!(text.contains("오늘 예정된 회의가 없습니다"));
}

#[tokio::test]
async fn failed_token_request_aborts_the_run() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/oauth/token", post(|| async { StatusCode::UNAUTHORIZED }))
        .route("/webhook", post(webhook_handler))
        .with_state(recorded.clone());
    let addr = serve(app).await;

    let err = meetbrief::app::run(&test_config(addr))
        .await
        .expect_err("auth failure must be fatal");
    assert!(format!("{err:#}").contains("authenticate"));
    assert!(recorded.webhook_payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn webhook_failure_is_reported_not_panicked() {
    let recorded = Recorded::default();
    let today = Utc::now().date_naive();
    let meetings = json!({"meetings": [meeting("standup", format!("{today}T01:00:00Z"))]});
    let app = Router::new()
        .route("/oauth/token", post(token_handler))
        .route(
            "/v2/users/me/meetings",
            get(move || async move { Json(meetings) }),
        )
        .route(
            "/webhook",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .with_state(recorded.clone());
    let addr = serve(app).await;

    let err = meetbrief::app::run(&test_config(addr))
        .await
        .expect_err("delivery failure must surface");
    assert!(format!("{err:#}").contains("deliver"));
}

fn source_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

#[tokio::test]
async fn update_install_swaps_and_backs_up_the_install_dir() {
    use meetbrief::update::{UpdateConfig, UpdateEngine};

    let archive = source_archive(&[
        ("meetbrief-master/notify.txt", "new tree"),
        ("meetbrief-master/scripts/run.sh", "echo hi"),
    ]);
    let app = Router::new()
        .route(
            "/repos/owner/meetbrief/commits/master",
            get(|| async {
                Json(json!({
                    "sha": "def5678901234",
                    "commit": {"message": "Add run script"}
                }))
            }),
        )
        .route(
            "/repos/owner/meetbrief/archive/refs/heads/master.tar.gz",
            get(move || async move { archive }),
        );
    let addr = serve(app).await;

    let root = tempfile::tempdir().unwrap();
    let install_dir = root.path().join("install");
    std::fs::create_dir_all(&install_dir).unwrap();
    std::fs::write(install_dir.join("old.txt"), "old tree").unwrap();

    let config = UpdateConfig {
        repo_url: format!("http://{addr}/repos/owner/meetbrief"),
        install_dir: install_dir.clone(),
    };
    let report = UpdateEngine::new(config).unwrap().install().await.unwrap();
    assert!(report.has_update());

    assert_eq!(
        std::fs::read_to_string(install_dir.join("notify.txt")).unwrap(),
        "new tree"
    );
    assert_eq!(
        std::fs::read_to_string(install_dir.join("scripts/run.sh")).unwrap(),
        "echo hi"
    );
    assert!(!install_dir.join("old.txt").exists());
    assert_eq!(
        std::fs::read_to_string(root.path().join("install.backup/old.txt")).unwrap(),
        "old tree"
    );
    assert_eq!(
        std::fs::read_to_string(install_dir.join(".version"))
            .unwrap()
            .trim(),
        "def5678"
    );
}

#[tokio::test]
async fn update_check_compares_marker_against_remote_sha() {
    use meetbrief::update::{UpdateConfig, UpdateEngine};

    let app = Router::new().route(
        "/repos/owner/meetbrief/commits/master",
        get(|| async {
            Json(json!({
                "sha": "abc1234def567890",
                "commit": {"message": "Tighten date filtering\n\nDetails."}
            }))
        }),
    );
    let addr = serve(app).await;

    let install_dir = tempfile::tempdir().unwrap();
    std::fs::write(install_dir.path().join(".version"), "abc1234").unwrap();

    // The engine rewrites github.com to api.github.com/repos; the test server
    // plays both hosts, so hand it a URL already shaped like the API path.
    let config = UpdateConfig {
        repo_url: format!("http://{addr}/repos/owner/meetbrief"),
        install_dir: install_dir.path().to_path_buf(),
    };
    let engine = UpdateEngine::new(config).unwrap();
    let report = engine.check().await.unwrap();
    assert_eq!(report.latest, "abc1234");
    assert_eq!(report.subject, "Tighten date filtering");
    assert!(!report.has_update());
}
