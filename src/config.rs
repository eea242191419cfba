//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "cms.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the deployment
    ///
    /// # Returns
    /// Full URL like "https://cms.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// GitHub OAuth application credentials and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// OAuth app client id
    pub client_id: String,
    /// OAuth app client secret; never logged, never echoed in a response
    pub client_secret: String,
    /// Scope string requested on the consent page
    pub scopes: String,
    /// Authorization endpoint; override only for tests
    pub authorize_url: String,
    /// Token endpoint; override only for tests
    pub token_url: String,
}

/// Relay behavior
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Mount point for the OAuth routes (e.g., "/oauth")
    pub mount_path: String,
    /// Name of the anti-forgery state cookie
    pub state_cookie: String,
    /// State cookie lifetime in seconds; long enough for the GitHub
    /// round-trip, short enough to bound replay
    pub state_max_age_seconds: i64,
    /// Reject callbacks whose state does not match the cookie
    pub require_state: bool,
    /// Path of the editor admin UI, used by the no-opener fallback
    pub admin_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (DECAP_RELAY__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid. Missing GitHub
    /// credentials fail here, at startup, not per-request.
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("github.scopes", "repo,user:email")?
            .set_default(
                "github.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "github.token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("relay.mount_path", "/oauth")?
            .set_default("relay.state_cookie", "decap_oauth_state")?
            .set_default("relay.state_max_age_seconds", 300)?
            .set_default("relay.require_state", true)?
            .set_default("relay.admin_path", "/admin/")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (DECAP_RELAY__*)
            .add_source(
                Environment::with_prefix("DECAP_RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Whether the state cookie should carry the `Secure` attribute.
    ///
    /// Secure cookies are dropped by browsers on plain-http localhost
    /// setups, so local development domains opt out.
    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.github.client_id.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "github.client_id must be set".to_string(),
            ));
        }

        if self.github.client_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "github.client_secret must be set".to_string(),
            ));
        }

        for (key, value) in [
            ("github.authorize_url", &self.github.authorize_url),
            ("github.token_url", &self.github.token_url),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(crate::error::AppError::Config(format!(
                    "{} must be an absolute URL",
                    key
                )));
            }
        }

        if !self.relay.mount_path.starts_with('/') || self.relay.mount_path.len() < 2 {
            return Err(crate::error::AppError::Config(
                "relay.mount_path must start with '/' and name a sub-path".to_string(),
            ));
        }
        if self.relay.mount_path.ends_with('/') {
            return Err(crate::error::AppError::Config(
                "relay.mount_path must not end with '/'".to_string(),
            ));
        }

        if self.relay.state_max_age_seconds <= 0 {
            return Err(crate::error::AppError::Config(
                "relay.state_max_age_seconds must be greater than 0".to_string(),
            ));
        }

        if self.relay.state_cookie.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "relay.state_cookie must be set".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure state cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
