//! GigaChat REST API client.
//!
//! Authentication is a two-step flow: the base64 client credentials are
//! exchanged at the OAuth endpoint for a short-lived access token (scoped,
//! with a unique `RqUID` per request), which is then sent as a Bearer token
//! to `/chat/completions`. The access token is cached until shortly before
//! its expiry.

use super::{ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
use crate::config::Config;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Refresh the token this long before its reported expiry.
const EXPIRY_SLACK_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_SLACK_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct OauthResponse {
    access_token: String,
    /// Unix timestamp in milliseconds.
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// GigaChat-backed [`Provider`].
pub struct GigaChatProvider {
    credentials: String,
    scope: String,
    oauth_url: String,
    api_url: String,
    client: Client,
    token: RwLock<Option<CachedToken>>,
}

impl GigaChatProvider {
    /// Build a client from the runtime configuration.
    pub fn new(config: &Config) -> Self {
        let mut builder = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10));

        // The production endpoints chain to the Russian Trusted Root CA,
        // which most trust stores do not carry.
        if !config.gigachat_verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Self {
            credentials: config.gigachat_credentials.clone(),
            scope: config.gigachat_scope.clone(),
            oauth_url: config.gigachat_oauth_url.clone(),
            api_url: config.gigachat_api_url.trim_end_matches('/').to_string(),
            client: builder.build().unwrap_or_else(|_| Client::new()),
            token: RwLock::new(None),
        }
    }

    fn error(&self, model: &str, message: String, status_code: Option<u16>) -> ProviderError {
        ProviderError {
            provider: self.name().to_string(),
            model: model.to_string(),
            message,
            status_code,
        }
    }

    /// Exchange credentials for an access token ahead of the first turn
    /// (TLS handshake + OAuth round trip).
    pub async fn warmup(&self) -> Result<(), ProviderError> {
        self.access_token("warmup").await.map(|_| ())
    }

    /// Return a fresh access token, exchanging credentials if needed.
    async fn access_token(&self, model: &str) -> Result<String, ProviderError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        let response = self
            .client
            .post(&self.oauth_url)
            .header("Authorization", format!("Basic {}", self.credentials))
            .header("RqUID", Uuid::new_v4().to_string())
            .header("Accept", "application/json")
            .form(&[("scope", self.scope.as_str())])
            .send()
            .await
            .map_err(|e| self.error(model, format!("OAuth request failed: {e}"), None))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.error(
                model,
                format!("OAuth error ({}): {body}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let oauth: OauthResponse = response
            .json()
            .await
            .map_err(|e| self.error(model, format!("Malformed OAuth response: {e}"), None))?;

        let expires_at = DateTime::<Utc>::from_timestamp_millis(oauth.expires_at)
            .unwrap_or_else(|| Utc::now() + Duration::minutes(25));

        let token = CachedToken {
            access_token: oauth.access_token,
            expires_at,
        };
        let access_token = token.access_token.clone();
        *self.token.write().await = Some(token);

        tracing::debug!(expires_at = %expires_at, "GigaChat access token refreshed");
        Ok(access_token)
    }
}

#[async_trait]
impl Provider for GigaChatProvider {
    fn name(&self) -> &str {
        "gigachat"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let start = Instant::now();
        let token = self.access_token(&request.model).await?;

        let url = format!("{}/chat/completions", self.api_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.error(&request.model, format!("Request failed: {e}"), None))?;

        let status = response.status();
        if !status.is_success() {
            // A rejected token will not recover on its own; drop it so the
            // next turn re-authenticates.
            if status.as_u16() == 401 {
                *self.token.write().await = None;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(self.error(
                &request.model,
                format!("API error ({}): {body}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let completions: CompletionsResponse = response
            .json()
            .await
            .map_err(|e| self.error(&request.model, format!("Malformed response: {e}"), None))?;

        let content = completions
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| self.error(&request.model, "Response contained no choices".into(), None))?;

        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = start.elapsed().as_millis() as u64;
        let usage = completions.usage.unwrap_or_default();

        tracing::info!(
            model = %request.model,
            latency_ms,
            total_tokens = usage.total_tokens,
            "generation complete"
        );

        Ok(ChatResponse {
            model: request.model,
            content,
            usage,
            latency_ms,
        })
    }
}
