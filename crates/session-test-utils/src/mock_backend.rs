//! Scripted token source and recording service.
//!
//! HTTP contract tests use `wiremock` against the real clients. These mocks
//! are for tests about sequencing, where the wire format does not matter.

use common::secret::SecretString;
use common::types::{ChannelName, Uid};
use session_controller::clients::{
    RecordingClientError, RecordingService, TokenClientError, TokenGrant, TokenSource,
};
use session_controller::session::RecordingSession;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum TokenBehavior {
    Grant { token: String, uid: Uid },
    Fail { status: u16 },
    Pending,
}

/// Token source with a fixed answer and optional latency.
#[derive(Debug, Clone)]
pub struct MockTokenSource {
    behavior: TokenBehavior,
    latency: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockTokenSource {
    /// Answer with `token` and `uid`.
    #[must_use]
    pub fn granting(token: &str, uid: u32) -> Self {
        Self::with_behavior(TokenBehavior::Grant {
            token: token.to_string(),
            uid: Uid(uid),
        })
    }

    /// Answer with a non-2xx status.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self::with_behavior(TokenBehavior::Fail { status })
    }

    /// Never answer.
    #[must_use]
    pub fn pending() -> Self {
        Self::with_behavior(TokenBehavior::Pending)
    }

    /// Answer only after `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of fetches started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with_behavior(behavior: TokenBehavior) -> Self {
        Self {
            behavior,
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl TokenSource for MockTokenSource {
    async fn fetch_token(&self, _channel: &ChannelName) -> Result<TokenGrant, TokenClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match &self.behavior {
            TokenBehavior::Grant { token, uid } => Ok(TokenGrant {
                token: SecretString::from(token.as_str()),
                uid: *uid,
            }),
            TokenBehavior::Fail { status } => Err(TokenClientError::RequestFailed {
                status: *status,
                body: "mock token failure".to_string(),
            }),
            TokenBehavior::Pending => std::future::pending().await,
        }
    }
}

/// One recorded recording call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingCall {
    Start { channel: String },
    Stop {
        channel: String,
        session: RecordingSession,
    },
}

/// Recording service with scripted outcomes.
#[derive(Debug, Clone)]
pub struct MockRecordingService {
    start: Option<RecordingSession>,
    stop_status: Arc<Mutex<u16>>,
    calls: Arc<Mutex<Vec<RecordingCall>>>,
}

impl MockRecordingService {
    /// Starts return `session`; stops succeed.
    #[must_use]
    pub fn starting(session: RecordingSession) -> Self {
        Self {
            start: Some(session),
            stop_status: Arc::new(Mutex::new(200)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Starts fail with 503.
    #[must_use]
    pub fn failing_start() -> Self {
        let mut service = Self::starting(RecordingSession {
            resource_id: String::new(),
            session_id: String::new(),
            recording_uid: Uid::UNASSIGNED,
        });
        service.start = None;
        service
    }

    /// Make later stops answer `status`. Only 200 succeeds.
    pub fn set_stop_status(&self, status: u16) {
        *self.stop_status.lock().unwrap() = status;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordingCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Sessions passed to stop, in order.
    #[must_use]
    pub fn stops(&self) -> Vec<RecordingSession> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordingCall::Stop { session, .. } => Some(session),
                RecordingCall::Start { .. } => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl RecordingService for MockRecordingService {
    async fn start(
        &self,
        channel: &ChannelName,
    ) -> Result<RecordingSession, RecordingClientError> {
        self.calls.lock().unwrap().push(RecordingCall::Start {
            channel: channel.to_string(),
        });
        self.start
            .clone()
            .ok_or_else(|| RecordingClientError::StartFailed {
                status: 503,
                body: "mock start failure".to_string(),
            })
    }

    async fn stop(
        &self,
        channel: &ChannelName,
        session: &RecordingSession,
    ) -> Result<(), RecordingClientError> {
        self.calls.lock().unwrap().push(RecordingCall::Stop {
            channel: channel.to_string(),
            session: session.clone(),
        });
        let status = *self.stop_status.lock().unwrap();
        if status == 200 {
            Ok(())
        } else {
            Err(RecordingClientError::StopFailed { status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn demo() -> ChannelName {
        ChannelName::new("demo").unwrap()
    }

    #[tokio::test]
    async fn test_token_source_outcomes() {
        let granting = MockTokenSource::granting("abc123", 42);
        let grant = granting.fetch_token(&demo()).await.unwrap();
        assert_eq!(grant.token.expose_secret(), "abc123");
        assert_eq!(grant.uid, Uid(42));
        assert_eq!(granting.calls(), 1);

        let failing = MockTokenSource::failing(500);
        assert!(matches!(
            failing.fetch_token(&demo()).await,
            Err(TokenClientError::RequestFailed { status: 500, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_token_source_never_answers() {
        let pending = MockTokenSource::pending();
        let result = tokio::time::timeout(Duration::from_secs(60), pending.fetch_token(&demo())).await;
        assert!(result.is_err());
        assert_eq!(pending.calls(), 1);
    }

    #[tokio::test]
    async fn test_recording_service_records_stops() {
        let session = RecordingSession {
            resource_id: "R1".to_string(),
            session_id: "S1".to_string(),
            recording_uid: Uid(7),
        };
        let service = MockRecordingService::starting(session.clone());

        assert_eq!(service.start(&demo()).await.unwrap(), session);
        service.set_stop_status(500);
        assert!(service.stop(&demo(), &session).await.is_err());
        service.set_stop_status(200);
        assert!(service.stop(&demo(), &session).await.is_ok());

        assert_eq!(service.stops(), vec![session.clone(), session]);
        assert!(MockRecordingService::failing_start()
            .start(&demo())
            .await
            .is_err());
    }
}
