//! Token server client.
//!
//! `GET {base}/api/get/rtc/{channel}` returns `{"rtc_token": "...", "uid": 42}`.

use super::{endpoint, parse_base_url, truncate_error_body};
use common::secret::SecretString;
use common::types::{ChannelName, Uid};
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Token client errors.
#[derive(Debug, Error)]
pub enum TokenClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Credential and identity issued for one channel.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Opaque channel access token.
    pub token: SecretString,
    /// Identity to join with.
    pub uid: Uid,
}

/// Token server response body.
#[derive(Deserialize)]
struct RtcTokenResponse {
    rtc_token: SecretString,
    uid: Uid,
}

/// Source of channel access tokens.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    /// Resolve a channel name to a token and the identity to join with.
    async fn fetch_token(&self, channel: &ChannelName) -> Result<TokenGrant, TokenClientError>;
}

/// Client for the token server.
#[derive(Debug, Clone)]
pub struct TokenClient {
    base_url: Url,
    http_client: Client,
}

impl TokenClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `TokenClientError::Configuration` if the URL does not parse or
    /// the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, TokenClientError> {
        let base_url = parse_base_url(base_url).map_err(TokenClientError::Configuration)?;
        let http_client = Client::builder().build().map_err(|e| {
            TokenClientError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Fetch a token for `channel`.
    ///
    /// # Errors
    ///
    /// - `Http` on transport failure
    /// - `RequestFailed` on a non-2xx status
    /// - `InvalidResponse` if the body lacks `rtc_token` or `uid`
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn fetch_token(&self, channel: &ChannelName) -> Result<TokenGrant, TokenClientError> {
        let url = endpoint(&self.base_url, &["api", "get", "rtc", channel.as_str()]);

        let response = self.http_client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenClientError::RequestFailed {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        let body = response.bytes().await?;
        let parsed: RtcTokenResponse = serde_json::from_slice(&body)
            .map_err(|e| TokenClientError::InvalidResponse(e.to_string()))?;

        debug!(
            target: "session.clients.token",
            uid = %parsed.uid,
            "Token issued"
        );

        Ok(TokenGrant {
            token: parsed.rtc_token,
            uid: parsed.uid,
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for TokenClient {
    async fn fetch_token(&self, channel: &ChannelName) -> Result<TokenGrant, TokenClientError> {
        TokenClient::fetch_token(self, channel).await
    }
}
