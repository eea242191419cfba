//! Common test utilities for E2E tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{Json, Router, routing::post};
use decap_oauth_relay::{AppState, build_router, config};
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with the default test config
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a new test server instance
    pub async fn with_config(config: config::AppConfig) -> Self {
        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = build_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

/// Create test configuration
///
/// The token endpoint points at a closed port; tests that exercise the
/// exchange override it with a `StubProvider` URL.
pub fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "cms.example.com".to_string(),
            protocol: "https".to_string(),
        },
        github: config::GitHubConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            scopes: "repo,user:email".to_string(),
            authorize_url: "https://github.example/login/oauth/authorize".to_string(),
            token_url: "http://127.0.0.1:9/token".to_string(),
        },
        relay: config::RelayConfig {
            mount_path: "/oauth".to_string(),
            state_cookie: "decap_oauth_state".to_string(),
            state_max_age_seconds: 300,
            require_state: true,
            admin_path: "/admin/".to_string(),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Stub GitHub token endpoint
///
/// Answers every POST with a canned JSON body and records what it was sent,
/// so tests can assert both that an exchange happened (or did not) and what
/// form fields the relay submitted.
pub struct StubProvider {
    pub addr: String,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl StubProvider {
    /// Spawn a stub token endpoint returning `response` to every POST
    pub async fn spawn(response: serde_json::Value) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));

        let handler_hits = hits.clone();
        let handler_bodies = bodies.clone();
        let app = Router::new().route(
            "/token",
            post(move |body: String| {
                let hits = handler_hits.clone();
                let bodies = handler_bodies.clone();
                let response = response.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    bodies.lock().unwrap().push(body);
                    Json(response)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            hits,
            bodies,
        }
    }

    /// Token endpoint URL to put into the relay config
    pub fn token_url(&self) -> String {
        format!("{}/token", self.addr)
    }

    /// Number of exchange attempts observed
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw form bodies observed, oldest first
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}
