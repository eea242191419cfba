//! Token exchanger
//!
//! Step two of the relay: validate the callback, exchange the single-use
//! code for an access token server-to-server, and hand the result to the
//! opener window through the bridge page.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::state::{clear_state_cookie, state_matches};
use super::{bridge, callback_url, public_base_url};
use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;

/// Query parameters GitHub appends to the callback redirect
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Single-use authorization code
    pub code: Option<String>,
    /// Echo of the state sent to `/authorize`
    pub state: Option<String>,
}

/// Token endpoint response; GitHub reports failures in-band with a 200
#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET `<mount>/callback`
///
/// # Steps
/// 1. Reject when `code` is absent (400), before any outbound call
/// 2. Verify the state parameter against the state cookie
/// 3. POST the code to the token endpoint with the same redirect URI
/// 4. Render the bridge page: token on success, error event otherwise
///
/// The provider is never retried: authorization codes are single-use, so a
/// second exchange would fail identically.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let config = &state.config;

    let code = query
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or(AppError::MissingCode)?;

    verify_state(config, &jar, query.state.as_deref())?;

    let redirect_uri = callback_url(&headers, config);
    let response = state
        .http_client
        .post(&config.github.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[
            ("client_id", config.github.client_id.as_str()),
            ("client_secret", config.github.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code", code),
        ])
        .send()
        .await?;

    let origin = public_base_url(&headers, config);

    let exchange: TokenExchangeResponse = match response.json().await {
        Ok(exchange) => exchange,
        Err(error) => {
            tracing::warn!(%error, "Token endpoint returned an unreadable body");
            return Ok(error_reply(&origin));
        }
    };

    let Some(token) = exchange.access_token else {
        tracing::warn!(
            error = exchange.error.as_deref().unwrap_or("unknown"),
            description = exchange.error_description.as_deref().unwrap_or(""),
            "Token exchange failed"
        );
        return Ok(error_reply(&origin));
    };

    tracing::info!("Token exchange succeeded");

    let jar = jar.add(clear_state_cookie(config));
    let page = bridge::success_page(&origin, &config.relay.admin_path, &token);
    Ok((jar, Html(page)).into_response())
}

fn error_reply(origin: &str) -> Response {
    Html(bridge::error_page(origin, bridge::ERROR_EXCHANGE_FAILED)).into_response()
}

/// CSRF check: the state parameter must equal the value parked in the
/// cookie by `/authorize`. Runs before the outbound call so a forged
/// callback never consumes the code.
///
/// With `relay.require_state` off the check still applies whenever the
/// callback presents a `state` parameter.
fn verify_state(
    config: &AppConfig,
    jar: &CookieJar,
    presented: Option<&str>,
) -> Result<(), AppError> {
    if !config.relay.require_state && presented.is_none() {
        return Ok(());
    }

    let expected = jar
        .get(&config.relay.state_cookie)
        .map(|cookie| cookie.value());

    match (expected, presented) {
        (Some(expected), Some(presented)) if state_matches(expected, presented) => Ok(()),
        _ => Err(AppError::StateMismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;

    fn test_config(require_state: bool) -> AppConfig {
        use crate::config::{GitHubConfig, LoggingConfig, RelayConfig, ServerConfig};

        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                domain: "cms.example.com".to_string(),
                protocol: "https".to_string(),
            },
            github: GitHubConfig {
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                scopes: "repo,user:email".to_string(),
                authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
            },
            relay: RelayConfig {
                mount_path: "/oauth".to_string(),
                state_cookie: "decap_oauth_state".to_string(),
                state_max_age_seconds: 300,
                require_state,
                admin_path: "/admin/".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    fn jar_with_state(value: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new("decap_oauth_state", value.to_string()))
    }

    #[test]
    fn matching_state_passes() {
        let config = test_config(true);
        let jar = jar_with_state("abc123");

        assert!(verify_state(&config, &jar, Some("abc123")).is_ok());
    }

    #[test]
    fn mismatched_state_is_rejected() {
        let config = test_config(true);
        let jar = jar_with_state("abc123");

        let error = verify_state(&config, &jar, Some("evil")).unwrap_err();
        assert!(matches!(error, AppError::StateMismatch));
    }

    #[test]
    fn missing_state_is_rejected_when_required() {
        let config = test_config(true);

        let error = verify_state(&config, &jar_with_state("abc123"), None).unwrap_err();
        assert!(matches!(error, AppError::StateMismatch));

        let error = verify_state(&config, &CookieJar::new(), Some("abc123")).unwrap_err();
        assert!(matches!(error, AppError::StateMismatch));
    }

    #[test]
    fn absent_state_is_tolerated_when_not_required() {
        let config = test_config(false);

        assert!(verify_state(&config, &CookieJar::new(), None).is_ok());
        // A presented state is still checked even in relaxed mode.
        let error = verify_state(&config, &CookieJar::new(), Some("abc123")).unwrap_err();
        assert!(matches!(error, AppError::StateMismatch));
    }
}
