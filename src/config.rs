//! Runtime configuration.
//!
//! All configuration comes from the environment. The two credentials are
//! required at bootstrap; everything else has defaults matching the
//! production GigaChat endpoints.

use anyhow::{bail, Result};

/// Default OAuth endpoint for GigaChat access tokens.
pub const DEFAULT_OAUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";

/// Default GigaChat REST API base.
pub const DEFAULT_API_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";

/// Default OAuth scope (corporate access).
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_CORP";

#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram Bot API token.
    pub telegram_token: String,
    /// Base64-encoded GigaChat OAuth client credentials.
    pub gigachat_credentials: String,
    /// OAuth scope sent with the token request.
    pub gigachat_scope: String,
    /// OAuth token endpoint.
    pub gigachat_oauth_url: String,
    /// Chat completions API base URL.
    pub gigachat_api_url: String,
    /// Whether to verify TLS certificates when talking to GigaChat.
    /// The GigaChat endpoints use the Russian Trusted Root CA, which is
    /// absent from common trust stores, so this defaults to off.
    pub gigachat_verify_ssl: bool,
    /// Base log level for `tracing`.
    pub log_level: String,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let Some(telegram_token) = lookup("TELEGRAM_TOKEN").filter(|v| !v.is_empty()) else {
            bail!("TELEGRAM_TOKEN is not set");
        };
        let Some(gigachat_credentials) =
            lookup("GIGACHAT_DEFAULT_TOKEN").filter(|v| !v.is_empty())
        else {
            bail!("GIGACHAT_DEFAULT_TOKEN is not set");
        };

        Ok(Self {
            telegram_token,
            gigachat_credentials,
            gigachat_scope: lookup("GIGACHAT_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.into()),
            gigachat_oauth_url: lookup("GIGACHAT_OAUTH_URL")
                .unwrap_or_else(|| DEFAULT_OAUTH_URL.into()),
            gigachat_api_url: lookup("GIGACHAT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            gigachat_verify_ssl: lookup("GIGACHAT_VERIFY_SSL")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
        })
    }
}
