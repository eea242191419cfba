//! Authorize initiator
//!
//! Step one of the relay: mint the anti-forgery state, park it in a cookie,
//! and send the browser to GitHub's consent page.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use url::Url;

use super::state::{build_state_cookie, mint_state};
use super::{callback_url, found};
use crate::AppState;
use crate::error::AppError;

/// GET `<mount>/authorize`
///
/// Responds 302 to the provider consent URL with the state cookie attached.
/// The redirect URI is derived from the forwarding headers of this very
/// request so that it matches the URL GitHub has on file, scheme included.
pub async fn authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let config = &state.config;
    let redirect_uri = callback_url(&headers, config);
    let authorize_state = mint_state();

    let mut consent = Url::parse(&config.github.authorize_url)
        .map_err(|e| AppError::Config(format!("github.authorize_url is invalid: {e}")))?;
    consent
        .query_pairs_mut()
        .append_pair("client_id", &config.github.client_id)
        .append_pair("redirect_uri", &redirect_uri)
        .append_pair("scope", &config.github.scopes)
        .append_pair("state", &authorize_state);

    tracing::debug!(%redirect_uri, "Redirecting to the consent page");

    let cookie = build_state_cookie(config, authorize_state);
    Ok((jar.add(cookie), found(consent.into())).into_response())
}
