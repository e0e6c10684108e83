//! Message types for the session actor.
//!
//! Requests from the handle carry a `oneshot` reply channel. Completions from
//! tasks the actor spawned carry only their result.

use crate::clients::{RecordingClientError, TokenClientError, TokenGrant};
use crate::errors::SessionError;
use crate::session::{RecordingSession, SessionSnapshot};
use tokio::sync::oneshot;

/// Messages sent to `SessionActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// Start the token fetch and the join timer.
    StartJoinFlow {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// The token fetch finished.
    TokenFetched {
        result: Result<TokenGrant, TokenClientError>,
    },

    /// The join delay elapsed; join with whatever token is held.
    JoinTimerElapsed,

    /// Start (`true`) or stop (`false`) cloud recording.
    ToggleRecording {
        recording: bool,
        /// Answers once the request is accepted, before the HTTP call finishes.
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// The start call finished.
    RecordingStartCompleted {
        result: Result<RecordingSession, RecordingClientError>,
    },

    /// The stop call for `session` finished.
    RecordingStopCompleted {
        session: RecordingSession,
        result: Result<(), RecordingClientError>,
    },

    MuteLocalAudio {
        muted: bool,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    SwitchCamera {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Leave the channel and destroy the engine.
    Leave {
        /// `false` if there was no engine to release.
        respond_to: oneshot::Sender<bool>,
    },

    GetSnapshot {
        respond_to: oneshot::Sender<SessionSnapshot>,
    },
}
