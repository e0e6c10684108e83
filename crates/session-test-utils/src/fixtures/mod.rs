//! Canonical test values and a session builder.
//!
//! The demo values match the documented scenario: channel `demo`, token
//! `abc123` for uid 42, and a recording `R1`/`S1` with recording uid 7.

use crate::mock_backend::{MockRecordingService, MockTokenSource};
use crate::mock_engine::{EngineProbe, MockEngineFactory};
use crate::mock_platform::{MockPermissions, MockSurfaces, SurfaceProbe};
use common::secret::SecretString;
use common::types::{ChannelName, Uid};
use session_controller::actor::{SessionActor, SessionActorHandle, SessionDeps, SessionSettings};
use session_controller::clients::{RecordingService, TokenSource};
use session_controller::config::DEFAULT_JOIN_DELAY;
use session_controller::session::{RecordingSession, SessionSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEMO_CHANNEL: &str = "demo";
pub const DEMO_TOKEN: &str = "abc123";
pub const DEMO_UID: u32 = 42;
pub const DEMO_RESOURCE_ID: &str = "R1";
pub const DEMO_SESSION_ID: &str = "S1";
pub const DEMO_RECORDING_UID: u32 = 7;

/// How long [`TestSession::wait_for`] polls before failing.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[must_use]
pub fn demo_channel() -> ChannelName {
    ChannelName::new(DEMO_CHANNEL).unwrap()
}

/// The recording the demo start call returns.
#[must_use]
pub fn demo_recording() -> RecordingSession {
    RecordingSession {
        resource_id: DEMO_RESOURCE_ID.to_string(),
        session_id: DEMO_SESSION_ID.to_string(),
        recording_uid: Uid(DEMO_RECORDING_UID),
    }
}

/// A running session wired to mocks.
pub struct TestSession {
    pub handle: SessionActorHandle,
    pub task: JoinHandle<()>,
    pub engine: EngineProbe,
    pub surfaces: SurfaceProbe,
    pub permissions: MockPermissions,
}

impl TestSession {
    #[must_use]
    pub fn builder() -> TestSessionBuilder {
        TestSessionBuilder::default()
    }

    /// Current snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the actor has stopped.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.handle.snapshot().await.expect("session actor stopped")
    }

    /// Poll the snapshot until `predicate` holds.
    ///
    /// # Panics
    ///
    /// Panics if it does not hold within [`WAIT_TIMEOUT`].
    pub async fn wait_for<F>(&self, mut predicate: F) -> SessionSnapshot
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        loop {
            let snapshot = self.snapshot().await;
            if predicate(&snapshot) {
                return snapshot;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not met within {WAIT_TIMEOUT:?}, last snapshot: {snapshot:?}"
            );
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Cancel the actor and wait for it to exit.
    ///
    /// # Panics
    ///
    /// Panics if the actor task panicked.
    pub async fn shutdown(self) {
        self.handle.shutdown();
        self.task.await.expect("session actor panicked");
    }
}

/// Builder for [`TestSession`].
pub struct TestSessionBuilder {
    channel: String,
    join_delay: Duration,
    token_source: Arc<dyn TokenSource>,
    recording_service: Arc<dyn RecordingService>,
    fail_engine: bool,
    permissions: MockPermissions,
}

impl Default for TestSessionBuilder {
    fn default() -> Self {
        Self {
            channel: DEMO_CHANNEL.to_string(),
            join_delay: DEFAULT_JOIN_DELAY,
            token_source: Arc::new(MockTokenSource::granting(DEMO_TOKEN, DEMO_UID)),
            recording_service: Arc::new(MockRecordingService::starting(demo_recording())),
            fail_engine: false,
            permissions: MockPermissions::granting_all(),
        }
    }
}

impl TestSessionBuilder {
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    #[must_use]
    pub fn with_join_delay(mut self, join_delay: Duration) -> Self {
        self.join_delay = join_delay;
        self
    }

    #[must_use]
    pub fn with_token_source(mut self, token_source: impl TokenSource + 'static) -> Self {
        self.token_source = Arc::new(token_source);
        self
    }

    #[must_use]
    pub fn with_recording_service(
        mut self,
        recording_service: impl RecordingService + 'static,
    ) -> Self {
        self.recording_service = Arc::new(recording_service);
        self
    }

    /// Make engine creation fail.
    #[must_use]
    pub fn with_failing_engine(mut self) -> Self {
        self.fail_engine = true;
        self
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: MockPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Initialize the session and spawn its actor.
    ///
    /// # Panics
    ///
    /// Panics if the channel name is invalid or no tokio runtime is running.
    #[must_use]
    pub fn spawn(self) -> TestSession {
        let (factory, engine) = if self.fail_engine {
            MockEngineFactory::failing()
        } else {
            MockEngineFactory::new()
        };
        let (surfaces, surface_probe) = MockSurfaces::new();

        let settings = SessionSettings {
            channel: ChannelName::new(self.channel).expect("invalid test channel name"),
            app_id: SecretString::from("test-app-id"),
            join_delay: self.join_delay,
        };
        let deps = SessionDeps {
            token_source: self.token_source,
            recording_service: self.recording_service,
            engine_factory: Box::new(factory),
            surfaces: Box::new(surfaces),
            permissions: Box::new(self.permissions.clone()),
        };

        let (handle, task) = SessionActor::spawn(settings, deps, CancellationToken::new());

        TestSession {
            handle,
            task,
            engine,
            surfaces: surface_probe,
            permissions: self.permissions,
        }
    }
}
