//! Cloud recording service client.
//!
//! - `POST {base}/api/start/call` with `{"channel"}` returns
//!   `{"data": {"rid", "sid", "uid"}}`
//! - `POST {base}/api/stop/call` with `{"channel", "rid", "sid", "uid"}`
//!   succeeds on HTTP 200 only; the body is ignored

use super::{endpoint, parse_base_url, truncate_error_body, JSON_UTF8};
use crate::session::RecordingSession;
use common::types::ChannelName;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Recording client errors.
#[derive(Debug, Error)]
pub enum RecordingClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Start recording failed with status {status}: {body}")]
    StartFailed { status: u16, body: String },

    #[error("Stop recording failed with status {status}")]
    StopFailed { status: u16 },

    #[error("Invalid start recording response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Body of the start call.
#[derive(Debug, Serialize)]
struct StartRecordingRequest<'a> {
    channel: &'a ChannelName,
}

/// Response of the start call.
#[derive(Debug, Deserialize)]
struct StartRecordingResponse {
    data: RecordingSession,
}

/// Body of the stop call: the channel plus the start call's identifiers.
#[derive(Debug, Serialize)]
struct StopRecordingRequest<'a> {
    channel: &'a ChannelName,
    #[serde(flatten)]
    session: &'a RecordingSession,
}

/// Cloud recording control operations.
#[async_trait::async_trait]
pub trait RecordingService: Send + Sync {
    /// Start recording `channel`.
    async fn start(&self, channel: &ChannelName)
        -> Result<RecordingSession, RecordingClientError>;

    /// Stop the recording identified by `session`.
    async fn stop(
        &self,
        channel: &ChannelName,
        session: &RecordingSession,
    ) -> Result<(), RecordingClientError>;
}

/// Client for the cloud recording service.
#[derive(Debug, Clone)]
pub struct RecordingClient {
    base_url: Url,
    http_client: Client,
}

impl RecordingClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `RecordingClientError::Configuration` if the URL does not parse
    /// or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, RecordingClientError> {
        let base_url = parse_base_url(base_url).map_err(RecordingClientError::Configuration)?;
        let http_client = Client::builder().build().map_err(|e| {
            RecordingClientError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Start a cloud recording job for `channel`.
    ///
    /// # Errors
    ///
    /// - `Http` on transport failure
    /// - `StartFailed` on a non-2xx status
    /// - `InvalidResponse` if the body lacks `data.rid`, `data.sid` or `data.uid`
    #[instrument(skip_all, fields(channel = %channel))]
    pub async fn start(
        &self,
        channel: &ChannelName,
    ) -> Result<RecordingSession, RecordingClientError> {
        let url = endpoint(&self.base_url, &["api", "start", "call"]);
        let body = serde_json::to_vec(&StartRecordingRequest { channel })?;

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecordingClientError::StartFailed {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        let body = response.bytes().await?;
        let parsed: StartRecordingResponse = serde_json::from_slice(&body)
            .map_err(|e| RecordingClientError::InvalidResponse(e.to_string()))?;

        debug!(
            target: "session.clients.recording",
            resource_id = %parsed.data.resource_id,
            session_id = %parsed.data.session_id,
            recording_uid = %parsed.data.recording_uid,
            "Recording started"
        );

        Ok(parsed.data)
    }

    /// Stop the cloud recording job identified by `session`.
    ///
    /// # Errors
    ///
    /// - `Http` on transport failure
    /// - `StopFailed` on any status other than 200
    #[instrument(skip_all, fields(channel = %channel, session_id = %session.session_id))]
    pub async fn stop(
        &self,
        channel: &ChannelName,
        session: &RecordingSession,
    ) -> Result<(), RecordingClientError> {
        let url = endpoint(&self.base_url, &["api", "stop", "call"]);
        let body = serde_json::to_vec(&StopRecordingRequest { channel, session })?;

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(RecordingClientError::StopFailed {
                status: response.status().as_u16(),
            });
        }

        debug!(target: "session.clients.recording", "Recording stopped");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordingService for RecordingClient {
    async fn start(
        &self,
        channel: &ChannelName,
    ) -> Result<RecordingSession, RecordingClientError> {
        RecordingClient::start(self, channel).await
    }

    async fn stop(
        &self,
        channel: &ChannelName,
        session: &RecordingSession,
    ) -> Result<(), RecordingClientError> {
        RecordingClient::stop(self, channel, session).await
    }
}
