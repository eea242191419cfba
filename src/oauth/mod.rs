//! GitHub OAuth relay routes
//!
//! The three-route authorization code relay: `/authorize` starts the flow,
//! `/callback` finishes it, and everything else answers with a liveness
//! payload. The routes carry no authentication of their own: the flow
//! exists to produce the credential.

mod authorize;
mod bridge;
mod callback;
mod state;

pub use authorize::authorize;
pub use callback::callback;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json},
    routing::get,
};

use crate::AppState;
use crate::config::AppConfig;

/// Create OAuth relay router
pub fn oauth_router() -> Router<AppState> {
    Router::new()
        .route("/", get(mount_redirect))
        .route("/authorize", get(authorize))
        .route("/callback", get(callback))
}

/// GET `<mount>`
///
/// Convenience entry point: sends the browser straight to `/authorize`.
async fn mount_redirect(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let base = public_base_url(&headers, &state.config);
    found(format!("{}{}/authorize", base, state.config.relay.mount_path))
}

/// Fallback route: liveness payload pointing at the relay endpoints.
pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    let mount = &state.config.relay.mount_path;
    let body = serde_json::json!({
        "ok": true,
        "authorize": format!("{mount}/authorize"),
        "callback": format!("{mount}/callback"),
    });

    ([(header::CACHE_CONTROL, "no-store")], Json(body))
}

/// 302 Found with a Location header.
///
/// `axum::response::Redirect` only offers 303/307/308; the consumers of
/// this flow expect the classic 302.
pub(crate) fn found(location: String) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
    )
}

/// Public base URL of this deployment as seen by the browser.
///
/// Prefers the reverse-proxy forwarding headers, then the Host header, then
/// the configured base URL, so the redirect URI matches what GitHub has on
/// file for the client id even when the service binds behind a proxy.
pub(crate) fn public_base_url(headers: &HeaderMap, config: &AppConfig) -> String {
    let forwarded_proto = header_value(headers, "x-forwarded-proto");
    let forwarded_host =
        header_value(headers, "x-forwarded-host").or_else(|| header_value(headers, "host"));

    match forwarded_host {
        Some(host) => {
            let proto = forwarded_proto.unwrap_or_else(|| config.server.protocol.clone());
            format!("{proto}://{host}")
        }
        None => config.server.base_url(),
    }
}

/// Callback URL registered with GitHub.
///
/// Authorize and callback must derive the exact same value for a given
/// request or the provider rejects the exchange.
pub(crate) fn callback_url(headers: &HeaderMap, config: &AppConfig) -> String {
    format!(
        "{}{}/callback",
        public_base_url(headers, config),
        config.relay.mount_path
    )
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
