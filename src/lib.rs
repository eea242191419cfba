//! Decap OAuth Relay - a minimal GitHub OAuth token relay for Decap CMS
//!
//! The editor opens `<mount>/authorize` in a popup; this service parks an
//! anti-forgery state in a cookie and forwards the browser to GitHub's
//! consent page. GitHub redirects back to `<mount>/callback`, where the
//! single-use code is exchanged server-to-server for an access token (the
//! OAuth client secret stays out of the browser) and the token is handed
//! to the editor's opener window by a small bridge page.
//!
//! # Modules
//!
//! - `oauth`: the authorize/callback relay routes and the bridge page
//! - `config`: configuration management
//! - `error`: error types

pub mod config;
pub mod error;
pub mod oauth;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request. The relay holds no mutable
/// state across requests; the only shared resource is the HTTP client's
/// connection pool.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// HTTP client for the token exchange
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        // The token endpoint call is the only suspension point in the whole
        // service; the client-wide timeout bounds it.
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("decap-oauth-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    let cors_layer = build_cors_layer(&state.config.server);
    let mount = state.config.relay.mount_path.clone();

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest(&mount, oauth::oauth_router())
        .fallback(oauth::info)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
