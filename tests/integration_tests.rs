//! End-to-end tests over a real TCP socket.
//!
//! Each fixture serves a temporary static site on an ephemeral port and talks
//! to it with `reqwest`, the way a browser or CDN would.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use edge_gate::{AppState, Config, build_router};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Test fixture that owns the server task and its static site.
struct TestFixture {
    base_url: String,
    client: Client,
    state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    _site: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    async fn with_config(config: Config) -> Self {
        let site = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(site.path().join("index.html"), "<h1>Inicio</h1>").unwrap();
        std::fs::write(site.path().join("404.html"), "<h1>No encontrado</h1>").unwrap();
        std::fs::write(site.path().join("styles.9f8e7d.css"), "body{margin:0}").unwrap();

        let state = AppState::new(Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_dir: site.path().to_path_buf(),
            metrics_port: 0,
            ..config
        })
        .expect("Failed to build state");

        // Binding before spawning means the port accepts connections right away.
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind ephemeral port");
        let addr = listener.local_addr().expect("Failed to get local address");

        let (tx, rx) = oneshot::channel::<()>();
        let app = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .expect("Server failed");
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            state,
            shutdown: Some(tx),
            _site: site,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["cache-control"], "no-store");
    assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
    assert!(body["uptime_seconds"].is_u64());
}

// ============================================================================
// Static site
// ============================================================================

#[tokio::test]
async fn test_static_site_headers() {
    let fixture = TestFixture::new().await;

    let page = fixture.get("/").await;
    assert_eq!(page.status(), StatusCode::OK);
    assert_eq!(
        page.headers()["cache-control"],
        "public, max-age=86400, stale-while-revalidate=3600"
    );
    assert_eq!(
        page.headers()["strict-transport-security"],
        "max-age=63072000; includeSubDomains; preload"
    );
    assert_eq!(page.text().await.unwrap(), "<h1>Inicio</h1>");

    let asset = fixture.get("/styles.9f8e7d.css").await;
    assert_eq!(asset.status(), StatusCode::OK);
    assert_eq!(
        asset.headers()["cache-control"],
        "public, max-age=31536000, immutable"
    );
}

#[tokio::test]
async fn test_missing_page_serves_404_html() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/no-existe").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.text().await.unwrap(), "<h1>No encontrado</h1>");
}

// ============================================================================
// Gate decisions
// ============================================================================

#[tokio::test]
async fn test_foreign_origin_forbidden() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .client
        .get(fixture.url("/"))
        .header("Origin", "https://evil.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limit_over_socket() {
    let fixture = TestFixture::new().await;

    for i in 1..=10 {
        let response = fixture
            .client
            .get(fixture.url("/"))
            .header("X-Forwarded-For", "203.0.113.5")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {i}");
    }

    let response = fixture
        .client
        .get(fixture.url("/"))
        .header("X-Forwarded-For", "203.0.113.5")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["content-type"], "application/json");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "error": "Demasiadas solicitudes" }));

    // A different client is unaffected.
    let other = fixture
        .client
        .get(fixture.url("/"))
        .header("X-Real-IP", "198.51.100.7")
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(fixture.state.tracked_clients(), 2);
}

#[tokio::test]
async fn test_concurrent_burst_admits_exactly_limit() {
    let fixture = TestFixture::new().await;

    let mut handles = Vec::new();
    for _ in 0..30 {
        let client = fixture.client.clone();
        let url = fixture.url("/");
        handles.push(tokio::spawn(async move {
            client
                .get(url)
                .header("X-Forwarded-For", "192.0.2.44")
                .send()
                .await
                .unwrap()
                .status()
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 10);
    assert_eq!(limited, 20);
}

#[tokio::test]
async fn test_short_window_recovers_in_real_time() {
    let fixture = TestFixture::with_config(Config {
        rate_limit: 1,
        rate_limit_window: Duration::from_millis(200),
        ..Config::default()
    })
    .await;

    assert_eq!(fixture.get("/").await.status(), StatusCode::OK);
    assert_eq!(fixture.get("/").await.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(fixture.get("/").await.status(), StatusCode::OK);
}
