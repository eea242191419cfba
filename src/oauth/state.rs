//! Anti-forgery state handling
//!
//! The state value ties an `/authorize` redirect to its `/callback`. It
//! round-trips through GitHub's `state` parameter on one side and a
//! short-lived cookie on the other; nothing is stored server-side, so its
//! lifetime and scope are bounded by the cookie alone.

use axum_extra::extract::cookie::{Cookie, SameSite};
use rand::{Rng, distributions::Alphanumeric};
use subtle::ConstantTimeEq;

use crate::config::AppConfig;

/// Length of minted state tokens.
pub(crate) const STATE_LEN: usize = 32;

/// Mint a fresh anti-forgery state token.
///
/// `thread_rng` is a CSPRNG; the token must be unguessable because it is
/// the only thing correlating the callback with the browser that started
/// the flow.
pub(crate) fn mint_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// Compare the callback state against the cookie value in constant time.
pub(crate) fn state_matches(expected: &str, presented: &str) -> bool {
    expected
        .as_bytes()
        .ct_eq(presented.as_bytes())
        .into()
}

/// Build the state cookie set alongside the authorize redirect.
pub(crate) fn build_state_cookie(config: &AppConfig, state: String) -> Cookie<'static> {
    Cookie::build((config.relay.state_cookie.clone(), state))
        .path("/")
        .max_age(time::Duration::seconds(config.relay.state_max_age_seconds))
        .http_only(true)
        .secure(config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build()
}

/// Removal cookie sent after a successful exchange; the state is single-use.
pub(crate) fn clear_state_cookie(config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.relay.state_cookie.clone(), String::new()))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}
