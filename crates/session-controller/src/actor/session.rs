//! `SessionActor` - owns the session controller on a single task.
//!
//! The actor plays the role of a UI thread: handle requests, network
//! completions and engine callbacks are all applied here, one at a time.
//!
//! # Join race
//!
//! Starting the join flow fires the token fetch and a fixed join timer
//! together. Whichever finishes first is posted first. When the timer fires
//! the session joins with whatever token it holds at that moment, which may be
//! none if the fetch failed or is still in flight. A fetch that never
//! resolves still yields exactly one join.

use super::messages::SessionMessage;
use crate::clients::{
    RecordingClientError, RecordingService, TokenClientError, TokenGrant, TokenSource,
};
use crate::config::Config;
use crate::controller::SessionController;
use crate::engine::{EngineEvent, EngineEventSink, EngineFactory};
use crate::errors::SessionError;
use crate::platform::{PermissionRequester, VideoSurfaces};
use crate::session::{RecordingSession, SessionSnapshot};
use common::secret::SecretString;
use common::types::ChannelName;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the session mailbox.
const SESSION_CHANNEL_BUFFER: usize = 64;

/// Static session parameters.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub channel: ChannelName,
    pub app_id: SecretString,
    /// Delay between starting the token fetch and joining.
    pub join_delay: Duration,
}

impl SessionSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            channel: config.channel_name.clone(),
            app_id: config.engine_app_id.clone(),
            join_delay: config.join_delay,
        }
    }
}

/// Collaborators the session drives.
pub struct SessionDeps {
    pub token_source: Arc<dyn TokenSource>,
    pub recording_service: Arc<dyn RecordingService>,
    pub engine_factory: Box<dyn EngineFactory>,
    pub surfaces: Box<dyn VideoSurfaces>,
    pub permissions: Box<dyn PermissionRequester>,
}

/// Handle to the `SessionActor`.
#[derive(Clone)]
pub struct SessionActorHandle {
    sender: mpsc::Sender<SessionMessage>,
    events: EngineEventSink,
    cancel_token: CancellationToken,
}

impl SessionActorHandle {
    /// Fire the token fetch and the join timer.
    ///
    /// # Errors
    ///
    /// `JoinFlowAlreadyStarted` on a second call, `ActorUnavailable` if the
    /// actor has stopped.
    pub async fn start_join_flow(&self) -> Result<(), SessionError> {
        self.request(|respond_to| SessionMessage::StartJoinFlow { respond_to })
            .await?
    }

    /// Start (`true`) or stop (`false`) cloud recording.
    ///
    /// Returns once the request is accepted. The HTTP call runs in the
    /// background and its outcome shows up in [`snapshot`](Self::snapshot).
    ///
    /// # Errors
    ///
    /// `RecordingAlreadyActive` when starting over an existing or starting
    /// recording, `NoActiveRecording` when stopping with none.
    pub async fn toggle_recording(&self, recording: bool) -> Result<(), SessionError> {
        self.request(|respond_to| SessionMessage::ToggleRecording {
            recording,
            respond_to,
        })
        .await?
    }

    /// Toggle recording in the direction the session state calls for.
    ///
    /// Starts when no recording is held or starting, otherwise stops. A failed
    /// start therefore leads to another start, and a failed stop keeps the
    /// held recording so the next call retries the stop. Returns the direction
    /// requested.
    ///
    /// # Errors
    ///
    /// As [`toggle_recording`](Self::toggle_recording). A stop requested while
    /// a start is still in flight is rejected with `NoActiveRecording`.
    pub async fn toggle_recording_from_state(&self) -> Result<bool, SessionError> {
        let snapshot = self.snapshot().await?;
        let recording = snapshot.recording.is_none() && !snapshot.recording_start_pending;
        self.toggle_recording(recording).await?;
        Ok(recording)
    }

    /// Stop or resume sending local audio.
    pub async fn mute_local_audio(&self, muted: bool) -> Result<(), SessionError> {
        self.request(|respond_to| SessionMessage::MuteLocalAudio { muted, respond_to })
            .await?
    }

    /// Switch between front and rear cameras.
    pub async fn switch_camera(&self) -> Result<(), SessionError> {
        self.request(|respond_to| SessionMessage::SwitchCamera { respond_to })
            .await?
    }

    /// Leave the channel and destroy the engine. Returns `false` if there was
    /// no engine.
    pub async fn leave(&self) -> Result<bool, SessionError> {
        self.request(|respond_to| SessionMessage::Leave { respond_to })
            .await
    }

    /// Current session state.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|respond_to| SessionMessage::GetSnapshot { respond_to })
            .await
    }

    /// Sink the media engine reports callbacks into.
    #[must_use]
    pub fn event_sink(&self) -> EngineEventSink {
        self.events.clone()
    }

    /// Stop the actor. It leaves the channel before exiting.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|e| SessionError::ActorUnavailable(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::ActorUnavailable(format!("response receive failed: {e}")))
    }
}

/// The `SessionActor` implementation.
pub struct SessionActor {
    controller: SessionController,
    join_delay: Duration,
    receiver: mpsc::Receiver<SessionMessage>,
    /// Weak so in-flight tasks do not keep the mailbox open.
    mailbox: mpsc::WeakSender<SessionMessage>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    token_source: Arc<dyn TokenSource>,
    recording_service: Arc<dyn RecordingService>,
    cancel_token: CancellationToken,
    join_flow_started: bool,
}

impl SessionActor {
    /// Initialize the session and spawn the actor task.
    ///
    /// Initialization runs before this returns: permissions are requested, the
    /// engine is created and local video is set up. If the engine cannot be
    /// created the actor still runs, and engine operations report
    /// `EngineUnavailable`.
    pub fn spawn(
        settings: SessionSettings,
        deps: SessionDeps,
        cancel_token: CancellationToken,
    ) -> (SessionActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);
        let (events, event_receiver) = EngineEventSink::channel();

        let mut controller = SessionController::new(settings.channel, deps.surfaces);
        if let Err(e) = controller.initialize(
            deps.permissions.as_ref(),
            deps.engine_factory.as_ref(),
            &settings.app_id,
            events.clone(),
        ) {
            warn!(
                target: "session.actor",
                error = %e,
                "Session initialization incomplete, continuing"
            );
        }

        let actor = Self {
            controller,
            join_delay: settings.join_delay,
            receiver,
            mailbox: sender.downgrade(),
            events: event_receiver,
            token_source: deps.token_source,
            recording_service: deps.recording_service,
            cancel_token: cancel_token.clone(),
            join_flow_started: false,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionActorHandle {
            sender,
            events,
            cancel_token,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "session.actor", fields(channel = %self.controller.channel()))]
    async fn run(mut self) {
        info!(target: "session.actor", "SessionActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "session.actor",
                        "SessionActor received cancellation signal"
                    );
                    self.controller.leave();
                    break;
                }

                msg = self.receiver.recv() => {
                    if let Some(message) = msg {
                        self.handle_message(message);
                    } else {
                        info!(target: "session.actor", "SessionActor channel closed, exiting");
                        self.controller.leave();
                        break;
                    }
                }

                Some(event) = self.events.recv() => {
                    self.handle_engine_event(event);
                }
            }
        }

        info!(target: "session.actor", "SessionActor stopped");
    }

    fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::StartJoinFlow { respond_to } => {
                let _ = respond_to.send(self.start_join_flow());
            }

            SessionMessage::TokenFetched { result } => self.on_token_fetched(result),

            SessionMessage::JoinTimerElapsed => self.on_join_timer_elapsed(),

            SessionMessage::ToggleRecording {
                recording,
                respond_to,
            } => {
                let result = if recording {
                    self.start_recording()
                } else {
                    self.stop_recording()
                };
                let _ = respond_to.send(result);
            }

            SessionMessage::RecordingStartCompleted { result } => {
                self.on_recording_start_completed(result);
            }

            SessionMessage::RecordingStopCompleted { session, result } => {
                self.on_recording_stop_completed(&session, result);
            }

            SessionMessage::MuteLocalAudio { muted, respond_to } => {
                let _ = respond_to.send(self.controller.mute_local_audio(muted));
            }

            SessionMessage::SwitchCamera { respond_to } => {
                let _ = respond_to.send(self.controller.switch_camera());
            }

            SessionMessage::Leave { respond_to } => {
                let _ = respond_to.send(self.controller.leave());
            }

            SessionMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.controller.snapshot());
            }
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::UserJoined { uid, elapsed_ms } => {
                debug!(
                    target: "session.actor",
                    uid = %uid,
                    elapsed_ms,
                    "Remote participant joined"
                );
                if let Err(e) = self.controller.on_participant_joined(uid) {
                    warn!(
                        target: "session.actor",
                        uid = %uid,
                        error = %e,
                        "Failed to render remote participant"
                    );
                }
            }
            EngineEvent::UserOffline { uid, reason } => {
                debug!(
                    target: "session.actor",
                    uid = %uid,
                    reason = ?reason,
                    "Remote participant offline"
                );
                self.controller.on_participant_left(uid);
            }
        }
    }

    fn start_join_flow(&mut self) -> Result<(), SessionError> {
        if self.join_flow_started {
            return Err(SessionError::JoinFlowAlreadyStarted);
        }
        self.join_flow_started = true;

        tokio::spawn(join_race(
            Arc::clone(&self.token_source),
            self.controller.channel().clone(),
            self.join_delay,
            self.mailbox.clone(),
            self.cancel_token.child_token(),
        ));

        info!(
            target: "session.actor",
            join_delay = ?self.join_delay,
            "Join flow started"
        );
        Ok(())
    }

    fn on_token_fetched(&mut self, result: Result<TokenGrant, TokenClientError>) {
        match result {
            Ok(grant) => self.controller.apply_token(grant),
            Err(e) => warn!(
                target: "session.actor",
                error = %e,
                "Token fetch failed, join proceeds with the token held"
            ),
        }
    }

    fn on_join_timer_elapsed(&mut self) {
        if let Err(e) = self.controller.join_channel() {
            warn!(target: "session.actor", error = %e, "Channel join failed");
        }
    }

    fn start_recording(&mut self) -> Result<(), SessionError> {
        self.controller.begin_recording_start()?;

        let service = Arc::clone(&self.recording_service);
        let channel = self.controller.channel().clone();
        self.spawn_call(async move {
            let result = service.start(&channel).await;
            SessionMessage::RecordingStartCompleted { result }
        });

        debug!(target: "session.actor", "Cloud recording start requested");
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), SessionError> {
        let session = self.controller.recording_for_stop()?;

        let service = Arc::clone(&self.recording_service);
        let channel = self.controller.channel().clone();
        self.spawn_call(async move {
            let result = service.stop(&channel, &session).await;
            SessionMessage::RecordingStopCompleted { session, result }
        });

        debug!(target: "session.actor", "Cloud recording stop requested");
        Ok(())
    }

    fn on_recording_start_completed(
        &mut self,
        result: Result<RecordingSession, RecordingClientError>,
    ) {
        match result {
            Ok(session) => self.controller.recording_started(session),
            Err(e) => {
                self.controller.recording_start_failed();
                warn!(target: "session.actor", error = %e, "Cloud recording start failed");
            }
        }
    }

    fn on_recording_stop_completed(
        &mut self,
        session: &RecordingSession,
        result: Result<(), RecordingClientError>,
    ) {
        match result {
            Ok(()) => self.controller.recording_stopped(session),
            // The stale session stays so the next stop sends the same identifiers.
            Err(e) => warn!(
                target: "session.actor",
                session_id = %session.session_id,
                error = %e,
                "Cloud recording stop failed"
            ),
        }
    }

    /// Run a network call off the actor and post its completion back.
    fn spawn_call<F>(&self, call: F)
    where
        F: Future<Output = SessionMessage> + Send + 'static,
    {
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let message = call.await;
            post(&mailbox, message).await;
        });
    }
}

/// Post a completion to the actor, dropping it if the actor has stopped.
async fn post(mailbox: &mpsc::WeakSender<SessionMessage>, message: SessionMessage) {
    let Some(sender) = mailbox.upgrade() else {
        debug!(target: "session.actor", "Session actor gone, dropping completion");
        return;
    };
    if sender.send(message).await.is_err() {
        debug!(target: "session.actor", "Session actor gone, dropping completion");
    }
}

/// Race the token fetch against the join timer, posting both outcomes.
async fn join_race(
    token_source: Arc<dyn TokenSource>,
    channel: ChannelName,
    join_delay: Duration,
    mailbox: mpsc::WeakSender<SessionMessage>,
    cancel_token: CancellationToken,
) {
    let race = async {
        let fetch = token_source.fetch_token(&channel);
        let timer = tokio::time::sleep(join_delay);
        tokio::pin!(fetch, timer);

        tokio::select! {
            result = &mut fetch => {
                post(&mailbox, SessionMessage::TokenFetched { result }).await;
                timer.await;
                post(&mailbox, SessionMessage::JoinTimerElapsed).await;
            }
            () = &mut timer => {
                debug!(target: "session.actor", "Join timer elapsed before token fetch finished");
                post(&mailbox, SessionMessage::JoinTimerElapsed).await;
                let result = fetch.await;
                post(&mailbox, SessionMessage::TokenFetched { result }).await;
            }
        }
    };

    tokio::select! {
        () = cancel_token.cancelled() => {
            debug!(target: "session.actor", "Join race cancelled");
        }
        () = race => {}
    }
}
