//! Media engine boundary.
//!
//! The media SDK is opaque: it owns capture, encoding, transport and
//! rendering. This module describes the small operation set the session uses
//! and the two callbacks it listens to.
//!
//! SDK callbacks arrive on SDK-owned threads. [`EngineEventSink`] forwards them
//! onto the session actor's event queue without blocking, so the session only
//! ever sees them on its own task.

use crate::errors::{EngineError, SessionError};
use common::secret::SecretString;
use common::types::{ChannelName, Uid};
use tokio::sync::mpsc;
use tracing::warn;

/// Encoded video size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

/// Target bitrate policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitrate {
    /// Engine-chosen bitrate for the resolution and frame rate.
    Standard,
}

/// How the encoder orients the outgoing video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationMode {
    FixedPortrait,
}

/// Outgoing video parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoEncoderConfig {
    pub dimensions: VideoDimensions,
    pub frame_rate: u32,
    pub bitrate: Bitrate,
    pub orientation: OrientationMode,
}

impl VideoEncoderConfig {
    /// 640x360 at 15 fps, standard bitrate, fixed portrait.
    pub const DEMO_PROFILE: VideoEncoderConfig = VideoEncoderConfig {
        dimensions: VideoDimensions {
            width: 640,
            height: 360,
        },
        frame_rate: 15,
        bitrate: Bitrate::Standard,
        orientation: OrientationMode::FixedPortrait,
    };
}

/// Why a remote participant went offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    /// The participant left.
    Quit,
    /// No packets received for too long.
    Dropped,
    /// The participant switched to audience role.
    BecameAudience,
}

/// Callbacks the session listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A remote participant joined the channel.
    UserJoined { uid: Uid, elapsed_ms: u32 },
    /// A remote participant left the channel.
    UserOffline { uid: Uid, reason: OfflineReason },
}

/// Operations the session performs on the media SDK.
///
/// Implementations wrap the native engine. Every call reports failure through
/// [`EngineError`] instead of a raw SDK return code. Dropping the engine
/// destroys it.
pub trait MediaEngine: Send {
    /// Turn on the video module.
    fn enable_video(&mut self) -> Result<(), EngineError>;

    /// Apply outgoing video parameters.
    fn set_video_encoder_configuration(
        &mut self,
        config: &VideoEncoderConfig,
    ) -> Result<(), EngineError>;

    /// Bind the local camera preview to the local surface.
    fn setup_local_video(&mut self) -> Result<(), EngineError>;

    /// Join `channel` as `uid`. A missing token is passed through as-is.
    fn join_channel(
        &mut self,
        token: Option<&SecretString>,
        channel: &ChannelName,
        uid: Uid,
    ) -> Result<(), EngineError>;

    /// Leave the current channel.
    fn leave_channel(&mut self) -> Result<(), EngineError>;

    /// Stop or resume sending the local audio stream.
    fn mute_local_audio_stream(&mut self, muted: bool) -> Result<(), EngineError>;

    /// Toggle between front and rear cameras.
    fn switch_camera(&mut self) -> Result<(), EngineError>;

    /// Bind `uid`'s video stream to a remote surface.
    fn setup_remote_video(&mut self, uid: Uid) -> Result<(), EngineError>;
}

/// Creates the media engine.
pub trait EngineFactory: Send {
    /// Create an engine that reports callbacks into `events`.
    fn create(
        &self,
        app_id: &SecretString,
        events: EngineEventSink,
    ) -> Result<Box<dyn MediaEngine>, EngineError>;
}

/// Non-blocking bridge from SDK callback threads to the session actor.
///
/// The queue is unbounded: a dropped `UserOffline` would leave remote surfaces
/// on screen, so callbacks are never shed. Events only fail to post once the
/// session has stopped.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    sender: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSink {
    /// Create a sink and the receiving end of its queue.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Post an event. Returns `false` if the session is no longer running.
    pub fn emit(&self, event: EngineEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                warn!(
                    target: "session.engine",
                    event = ?event,
                    "Session no longer running, dropping engine event"
                );
                false
            }
        }
    }

    /// Report that a remote participant joined.
    pub fn user_joined(&self, uid: Uid, elapsed_ms: u32) -> bool {
        self.emit(EngineEvent::UserJoined { uid, elapsed_ms })
    }

    /// Report that a remote participant left.
    pub fn user_offline(&self, uid: Uid, reason: OfflineReason) -> bool {
        self.emit(EngineEvent::UserOffline { uid, reason })
    }
}

/// The single engine instance, or nothing if creation failed or it was released.
///
/// Every call site goes through [`EngineHandle::get_mut`], which reports
/// [`SessionError::EngineUnavailable`] instead of faulting.
#[derive(Default)]
pub struct EngineHandle(Option<Box<dyn MediaEngine>>);

impl EngineHandle {
    /// A handle with no engine.
    #[must_use]
    pub fn empty() -> Self {
        Self(None)
    }

    /// Wrap a created engine.
    #[must_use]
    pub fn new(engine: Box<dyn MediaEngine>) -> Self {
        Self(Some(engine))
    }

    /// Whether an engine is present.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }

    /// Borrow the engine.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EngineUnavailable` if there is no engine.
    pub fn get_mut(&mut self) -> Result<&mut (dyn MediaEngine + 'static), SessionError> {
        self.0.as_deref_mut().ok_or(SessionError::EngineUnavailable)
    }

    /// Take the engine out, leaving the handle empty.
    pub fn release(&mut self) -> Option<Box<dyn MediaEngine>> {
        self.0.take()
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("available", &self.is_available())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct NoopEngine;

    impl MediaEngine for NoopEngine {
        fn enable_video(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
        fn set_video_encoder_configuration(
            &mut self,
            _config: &VideoEncoderConfig,
        ) -> Result<(), EngineError> {
            Ok(())
        }
        fn setup_local_video(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
        fn join_channel(
            &mut self,
            _token: Option<&SecretString>,
            _channel: &ChannelName,
            _uid: Uid,
        ) -> Result<(), EngineError> {
            Ok(())
        }
        fn leave_channel(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
        fn mute_local_audio_stream(&mut self, _muted: bool) -> Result<(), EngineError> {
            Ok(())
        }
        fn switch_camera(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
        fn setup_remote_video(&mut self, _uid: Uid) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn test_demo_profile() {
        let profile = VideoEncoderConfig::DEMO_PROFILE;
        assert_eq!(profile.dimensions.width, 640);
        assert_eq!(profile.dimensions.height, 360);
        assert_eq!(profile.frame_rate, 15);
        assert_eq!(profile.bitrate, Bitrate::Standard);
        assert_eq!(profile.orientation, OrientationMode::FixedPortrait);
    }

    #[test]
    fn test_empty_handle_reports_unavailable() {
        let mut handle = EngineHandle::empty();
        assert!(!handle.is_available());
        assert!(matches!(
            handle.get_mut(),
            Err(SessionError::EngineUnavailable)
        ));
        assert!(handle.release().is_none());
    }

    #[test]
    fn test_release_empties_handle() {
        let mut handle = EngineHandle::new(Box::new(NoopEngine));
        assert!(handle.is_available());
        assert!(handle.get_mut().unwrap().enable_video().is_ok());

        assert!(handle.release().is_some());
        assert!(!handle.is_available());
        assert!(handle.get_mut().is_err());
    }

    #[test]
    fn test_handle_debug_does_not_require_engine_debug() {
        let handle = EngineHandle::new(Box::new(NoopEngine));
        assert_eq!(format!("{handle:?}"), "EngineHandle { available: true }");
    }

    #[tokio::test]
    async fn test_sink_forwards_events() {
        let (sink, mut receiver) = EngineEventSink::channel();

        assert!(sink.user_joined(Uid(5), 120));
        assert!(sink.user_offline(Uid(5), OfflineReason::Quit));

        assert_eq!(
            receiver.recv().await,
            Some(EngineEvent::UserJoined {
                uid: Uid(5),
                elapsed_ms: 120
            })
        );
        assert_eq!(
            receiver.recv().await,
            Some(EngineEvent::UserOffline {
                uid: Uid(5),
                reason: OfflineReason::Quit
            })
        );
    }

    #[tokio::test]
    async fn test_sink_keeps_every_event_in_a_burst() {
        let (sink, mut receiver) = EngineEventSink::channel();

        for uid in 0..1_000 {
            assert!(sink.user_joined(Uid(uid), 0));
        }
        assert!(sink.user_offline(Uid(999), OfflineReason::Dropped));

        let mut received = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            received.push(event);
        }
        assert_eq!(received.len(), 1_001);
        assert_eq!(
            received.last(),
            Some(&EngineEvent::UserOffline {
                uid: Uid(999),
                reason: OfflineReason::Dropped
            })
        );
    }

    #[test]
    fn test_sink_drops_once_session_stopped() {
        let (sink, receiver) = EngineEventSink::channel();
        drop(receiver);

        assert!(!sink.user_joined(Uid(3), 0));
        assert!(!sink.user_offline(Uid(3), OfflineReason::Quit));
    }
}
