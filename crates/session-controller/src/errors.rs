//! Session controller error types.
//!
//! Transport and engine failures are logged by the session actor and never
//! escalate. Precondition violations (stopping a recording that does not
//! exist, joining twice) are returned to the caller.

use crate::clients::recording_client::RecordingClientError;
use crate::clients::token_client::TokenClientError;
use thiserror::Error;

/// Session controller error type.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The media engine was never created or has already been released.
    #[error("Media engine unavailable")]
    EngineUnavailable,

    /// The media engine rejected an operation.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Stop requested while no recording session exists.
    #[error("No active recording session")]
    NoActiveRecording,

    /// Start requested while a recording session exists or is being started.
    #[error("Recording session already active")]
    RecordingAlreadyActive,

    /// A join was already attempted in this launch-to-leave cycle.
    #[error("Channel join already attempted")]
    JoinAlreadyAttempted,

    /// The token-fetch/join sequence was already started.
    #[error("Join flow already started")]
    JoinFlowAlreadyStarted,

    /// Token server call failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenClientError),

    /// Recording service call failed.
    #[error("Recording error: {0}")]
    Recording(#[from] RecordingClientError),

    /// The session actor is no longer running.
    #[error("Session actor unavailable: {0}")]
    ActorUnavailable(String),
}

impl SessionError {
    /// Whether the caller invoked an operation in a state that does not allow it.
    #[must_use]
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            SessionError::NoActiveRecording
                | SessionError::RecordingAlreadyActive
                | SessionError::JoinAlreadyAttempted
                | SessionError::JoinFlowAlreadyStarted
        )
    }
}

/// Errors reported by the media engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine could not be created.
    #[error("Engine initialization failed: {0}")]
    Initialization(String),

    /// An engine call returned a failure code.
    #[error("Engine operation {operation} failed: {reason}")]
    Operation {
        operation: &'static str,
        reason: String,
    },
}
