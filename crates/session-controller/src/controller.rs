//! `SessionController` - the session state machine.
//!
//! Owns the channel session, the recording session, the set of rendered
//! remote participants and the engine handle. All methods are synchronous;
//! the session actor calls them from its single task and performs the network
//! I/O around them.
//!
//! # Recording bookkeeping
//!
//! ```text
//! idle --begin_recording_start--> starting --recording_started--> active
//!   ^                                 |                             |
//!   +------recording_start_failed-----+                             |
//!   +--------------------------recording_stopped--------------------+
//! ```
//!
//! A failed stop leaves the session `active` with its stale identifiers so a
//! later stop retries with the same values.

use crate::clients::TokenGrant;
use crate::engine::{EngineEventSink, EngineFactory, EngineHandle, VideoEncoderConfig};
use crate::errors::SessionError;
use crate::platform::{DevicePermission, PermissionRequester, VideoSurfaces};
use crate::session::{ChannelSession, RecordingSession, SessionSnapshot};
use common::secret::SecretString;
use common::types::{ChannelName, Uid};
use std::collections::BTreeSet;
use tracing::{debug, error, info, instrument, warn};

/// Session state machine.
pub struct SessionController {
    session: ChannelSession,
    recording: Option<RecordingSession>,
    recording_start_pending: bool,
    remote_surfaces: BTreeSet<Uid>,
    audio_muted: bool,
    join_attempted: bool,
    engine: EngineHandle,
    surfaces: Box<dyn VideoSurfaces>,
}

impl SessionController {
    /// Create a controller for `channel`. No engine exists until
    /// [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(channel: ChannelName, surfaces: Box<dyn VideoSurfaces>) -> Self {
        Self {
            session: ChannelSession::new(channel),
            recording: None,
            recording_start_pending: false,
            remote_surfaces: BTreeSet::new(),
            audio_muted: false,
            join_attempted: false,
            engine: EngineHandle::empty(),
            surfaces,
        }
    }

    /// Channel this session joins.
    #[must_use]
    pub fn channel(&self) -> &ChannelName {
        &self.session.channel
    }

    /// Request permissions, create the engine and configure video.
    ///
    /// Denied permissions are logged and startup continues; the engine will
    /// typically fail to capture. If the engine cannot be created the handle
    /// stays empty and every later engine call reports
    /// `SessionError::EngineUnavailable`.
    ///
    /// # Errors
    ///
    /// Returns the engine error that stopped initialization.
    #[instrument(skip_all, name = "session.controller.initialize", fields(channel = %self.session.channel))]
    pub fn initialize(
        &mut self,
        permissions: &dyn PermissionRequester,
        factory: &dyn EngineFactory,
        app_id: &SecretString,
        events: EngineEventSink,
    ) -> Result<(), SessionError> {
        let granted = permissions.request(&DevicePermission::REQUIRED);
        for permission in DevicePermission::REQUIRED {
            if !granted.contains(&permission) {
                warn!(
                    target: "session.controller",
                    permission = %permission,
                    "Device permission denied, continuing"
                );
            }
        }

        match factory.create(app_id, events) {
            Ok(engine) => {
                self.engine = EngineHandle::new(engine);
                info!(target: "session.controller", "Media engine initialized");
            }
            Err(e) => {
                error!(
                    target: "session.controller",
                    error = %e,
                    "Failed to initialize media engine"
                );
                return Err(e.into());
            }
        }

        self.setup_video_profile()?;
        self.setup_local_video()
    }

    fn setup_video_profile(&mut self) -> Result<(), SessionError> {
        let engine = self.engine.get_mut()?;
        engine.enable_video()?;
        engine.set_video_encoder_configuration(&VideoEncoderConfig::DEMO_PROFILE)?;
        Ok(())
    }

    fn setup_local_video(&mut self) -> Result<(), SessionError> {
        let engine = self.engine.get_mut()?;
        self.surfaces.attach_local();
        engine.setup_local_video()?;
        Ok(())
    }

    /// Store the token and identity from a successful fetch.
    pub fn apply_token(&mut self, grant: TokenGrant) {
        self.session.token = Some(grant.token);
        self.session.local_uid = grant.uid;
        info!(
            target: "session.controller",
            uid = %self.session.local_uid,
            "Channel token received"
        );
    }

    /// Join the channel with whatever token and uid are currently held.
    ///
    /// The attempt is recorded before calling the engine, so a failed join
    /// still uses up this cycle's attempt.
    ///
    /// # Errors
    ///
    /// - `JoinAlreadyAttempted` on a second call before [`leave`](Self::leave)
    /// - `EngineUnavailable` if there is no engine
    /// - `Engine` if the engine rejects the join
    pub fn join_channel(&mut self) -> Result<(), SessionError> {
        if self.join_attempted {
            return Err(SessionError::JoinAlreadyAttempted);
        }
        self.join_attempted = true;

        let engine = self.engine.get_mut()?;
        engine.join_channel(
            self.session.token.as_ref(),
            &self.session.channel,
            self.session.local_uid,
        )?;

        info!(
            target: "session.controller",
            channel = %self.session.channel,
            uid = %self.session.local_uid,
            has_token = self.session.token.is_some(),
            "Joining channel"
        );
        Ok(())
    }

    /// Render a surface for a newly joined remote participant.
    ///
    /// Returns `Ok(false)` if `uid` already has a surface.
    ///
    /// # Errors
    ///
    /// `EngineUnavailable` or `Engine` if the stream cannot be bound.
    pub fn on_participant_joined(&mut self, uid: Uid) -> Result<bool, SessionError> {
        if self.remote_surfaces.contains(&uid) {
            debug!(
                target: "session.controller",
                uid = %uid,
                "Participant already rendered, ignoring join"
            );
            return Ok(false);
        }

        let engine = self.engine.get_mut()?;
        self.surfaces.attach_remote(uid);
        self.remote_surfaces.insert(uid);
        engine.setup_remote_video(uid)?;

        info!(target: "session.controller", uid = %uid, "Remote participant rendered");
        Ok(true)
    }

    /// Clear every remote surface when any participant leaves.
    ///
    /// Returns how many surfaces were removed.
    pub fn on_participant_left(&mut self, uid: Uid) -> usize {
        let cleared = self.remote_surfaces.len();
        self.surfaces.clear_remote();
        self.remote_surfaces.clear();

        info!(
            target: "session.controller",
            uid = %uid,
            cleared,
            "Remote participant left, cleared remote surfaces"
        );
        cleared
    }

    /// Check that a recording may start and mark one as starting.
    ///
    /// # Errors
    ///
    /// `RecordingAlreadyActive` if a recording exists or is starting.
    pub fn begin_recording_start(&mut self) -> Result<(), SessionError> {
        if self.recording.is_some() || self.recording_start_pending {
            return Err(SessionError::RecordingAlreadyActive);
        }
        self.recording_start_pending = true;
        Ok(())
    }

    /// Store the identifiers returned by a successful start.
    pub fn recording_started(&mut self, recording: RecordingSession) {
        self.recording_start_pending = false;
        info!(
            target: "session.controller",
            resource_id = %recording.resource_id,
            session_id = %recording.session_id,
            recording_uid = %recording.recording_uid,
            "Cloud recording active"
        );
        self.recording = Some(recording);
    }

    /// Clear the starting mark after a failed start. No session is created.
    pub fn recording_start_failed(&mut self) {
        self.recording_start_pending = false;
    }

    /// Identifiers to send with a stop request.
    ///
    /// # Errors
    ///
    /// `NoActiveRecording` if no recording session exists.
    pub fn recording_for_stop(&self) -> Result<RecordingSession, SessionError> {
        self.recording
            .clone()
            .ok_or(SessionError::NoActiveRecording)
    }

    /// Discard the recording session after a successful stop.
    ///
    /// Does nothing if the held session is not `stopped`.
    pub fn recording_stopped(&mut self, stopped: &RecordingSession) {
        if self.recording.as_ref() == Some(stopped) {
            self.recording = None;
            info!(
                target: "session.controller",
                session_id = %stopped.session_id,
                "Cloud recording stopped"
            );
        }
    }

    /// Stop or resume sending local audio.
    ///
    /// # Errors
    ///
    /// `EngineUnavailable` or `Engine`.
    pub fn mute_local_audio(&mut self, muted: bool) -> Result<(), SessionError> {
        self.engine.get_mut()?.mute_local_audio_stream(muted)?;
        self.audio_muted = muted;
        Ok(())
    }

    /// Switch between front and rear cameras.
    ///
    /// # Errors
    ///
    /// `EngineUnavailable` or `Engine`.
    pub fn switch_camera(&mut self) -> Result<(), SessionError> {
        self.engine.get_mut()?.switch_camera()?;
        Ok(())
    }

    /// Leave the channel and destroy the engine.
    ///
    /// Safe to call repeatedly; returns `false` when there was no engine.
    pub fn leave(&mut self) -> bool {
        let Some(mut engine) = self.engine.release() else {
            debug!(target: "session.controller", "No engine to release");
            return false;
        };

        if let Err(e) = engine.leave_channel() {
            warn!(
                target: "session.controller",
                error = %e,
                "Engine failed to leave channel"
            );
        }
        drop(engine);

        self.surfaces.clear_remote();
        self.remote_surfaces.clear();
        self.join_attempted = false;

        info!(
            target: "session.controller",
            channel = %self.session.channel,
            "Left channel and released engine"
        );
        true
    }

    /// Current state for display.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            channel: self.session.channel.clone(),
            local_uid: self.session.local_uid,
            has_token: self.session.token.is_some(),
            engine_available: self.engine.is_available(),
            join_attempted: self.join_attempted,
            audio_muted: self.audio_muted,
            recording: self.recording.clone(),
            recording_start_pending: self.recording_start_pending,
            remote_participants: self.remote_surfaces.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::MediaEngine;
    use crate::errors::EngineError;
    use common::secret::ExposeSecret;
    use std::sync::{Arc, Mutex};

    /// Calls observed by the fakes, in order.
    type CallLog = Arc<Mutex<Vec<String>>>;

    struct FakeEngine {
        log: CallLog,
        fail_join: bool,
    }

    impl FakeEngine {
        fn record(&self, call: String) {
            self.log.lock().unwrap().push(call);
        }
    }

    impl MediaEngine for FakeEngine {
        fn enable_video(&mut self) -> Result<(), EngineError> {
            self.record("enable_video".to_string());
            Ok(())
        }
        fn set_video_encoder_configuration(
            &mut self,
            config: &VideoEncoderConfig,
        ) -> Result<(), EngineError> {
            self.record(format!("encoder:{}fps", config.frame_rate));
            Ok(())
        }
        fn setup_local_video(&mut self) -> Result<(), EngineError> {
            self.record("setup_local_video".to_string());
            Ok(())
        }
        fn join_channel(
            &mut self,
            token: Option<&SecretString>,
            channel: &ChannelName,
            uid: Uid,
        ) -> Result<(), EngineError> {
            let token = token.map_or("none", |t| t.expose_secret());
            self.record(format!("join:{channel}:{uid}:{token}"));
            if self.fail_join {
                return Err(EngineError::Operation {
                    operation: "join_channel",
                    reason: "code -2".to_string(),
                });
            }
            Ok(())
        }
        fn leave_channel(&mut self) -> Result<(), EngineError> {
            self.record("leave_channel".to_string());
            Ok(())
        }
        fn mute_local_audio_stream(&mut self, muted: bool) -> Result<(), EngineError> {
            self.record(format!("mute:{muted}"));
            Ok(())
        }
        fn switch_camera(&mut self) -> Result<(), EngineError> {
            self.record("switch_camera".to_string());
            Ok(())
        }
        fn setup_remote_video(&mut self, uid: Uid) -> Result<(), EngineError> {
            self.record(format!("setup_remote_video:{uid}"));
            Ok(())
        }
    }

    struct FakeFactory {
        log: CallLog,
        fail: bool,
        fail_join: bool,
    }

    impl EngineFactory for FakeFactory {
        fn create(
            &self,
            _app_id: &SecretString,
            _events: EngineEventSink,
        ) -> Result<Box<dyn MediaEngine>, EngineError> {
            if self.fail {
                return Err(EngineError::Initialization("no native library".to_string()));
            }
            Ok(Box::new(FakeEngine {
                log: Arc::clone(&self.log),
                fail_join: self.fail_join,
            }))
        }
    }

    struct FakeSurfaces {
        log: CallLog,
    }

    impl VideoSurfaces for FakeSurfaces {
        fn attach_local(&mut self) {
            self.log.lock().unwrap().push("surface:local".to_string());
        }
        fn attach_remote(&mut self, uid: Uid) {
            self.log.lock().unwrap().push(format!("surface:remote:{uid}"));
        }
        fn clear_remote(&mut self) {
            self.log.lock().unwrap().push("surface:clear".to_string());
        }
    }

    struct FixedPermissions(Vec<DevicePermission>);

    impl PermissionRequester for FixedPermissions {
        fn request(&self, _permissions: &[DevicePermission]) -> Vec<DevicePermission> {
            self.0.clone()
        }
    }

    fn controller_with(fail_create: bool, fail_join: bool) -> (SessionController, CallLog) {
        let log = CallLog::default();
        let mut controller = SessionController::new(
            ChannelName::new("demo").unwrap(),
            Box::new(FakeSurfaces {
                log: Arc::clone(&log),
            }),
        );
        let factory = FakeFactory {
            log: Arc::clone(&log),
            fail: fail_create,
            fail_join,
        };
        let (sink, _receiver) = EngineEventSink::channel();
        let _ = controller.initialize(
            &FixedPermissions(DevicePermission::REQUIRED.to_vec()),
            &factory,
            &SecretString::from("app-id"),
            sink,
        );
        (controller, log)
    }

    fn controller() -> (SessionController, CallLog) {
        controller_with(false, false)
    }

    fn calls(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn grant(token: &str, uid: u32) -> TokenGrant {
        TokenGrant {
            token: SecretString::from(token),
            uid: Uid(uid),
        }
    }

    fn recording(rid: &str, sid: &str, uid: u32) -> RecordingSession {
        RecordingSession {
            resource_id: rid.to_string(),
            session_id: sid.to_string(),
            recording_uid: Uid(uid),
        }
    }

    #[test]
    fn test_initialize_configures_video_in_order() {
        let (controller, log) = controller();

        assert!(controller.snapshot().engine_available);
        assert_eq!(
            calls(&log),
            vec![
                "enable_video",
                "encoder:15fps",
                "surface:local",
                "setup_local_video"
            ]
        );
    }

    #[test]
    fn test_initialize_continues_when_permissions_denied() {
        let log = CallLog::default();
        let mut controller = SessionController::new(
            ChannelName::new("demo").unwrap(),
            Box::new(FakeSurfaces {
                log: Arc::clone(&log),
            }),
        );
        let factory = FakeFactory {
            log: Arc::clone(&log),
            fail: false,
            fail_join: false,
        };
        let (sink, _receiver) = EngineEventSink::channel();

        let result = controller.initialize(
            &FixedPermissions(vec![]),
            &factory,
            &SecretString::from("app-id"),
            sink,
        );

        assert!(result.is_ok());
        assert!(controller.snapshot().engine_available);
    }

    #[test]
    fn test_engine_creation_failure_leaves_checked_empty_handle() {
        let (mut controller, log) = controller_with(true, false);

        assert!(!controller.snapshot().engine_available);
        assert!(calls(&log).is_empty());
        assert!(matches!(
            controller.join_channel(),
            Err(SessionError::EngineUnavailable)
        ));
        assert!(matches!(
            controller.switch_camera(),
            Err(SessionError::EngineUnavailable)
        ));
        assert!(matches!(
            controller.mute_local_audio(true),
            Err(SessionError::EngineUnavailable)
        ));
        assert!(matches!(
            controller.on_participant_joined(Uid(3)),
            Err(SessionError::EngineUnavailable)
        ));
    }

    #[test]
    fn test_apply_token_sets_exact_values() {
        let (mut controller, _log) = controller();

        controller.apply_token(grant("abc123", 42));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.local_uid, Uid(42));
        assert!(snapshot.has_token);
        assert_eq!(
            controller
                .session
                .token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_join_uses_current_token_and_uid() {
        let (mut controller, log) = controller();
        controller.apply_token(grant("abc123", 42));

        controller.join_channel().unwrap();

        assert!(calls(&log).contains(&"join:demo:42:abc123".to_string()));
        assert!(controller.snapshot().join_attempted);
    }

    #[test]
    fn test_join_without_token_passes_none() {
        let (mut controller, log) = controller();

        controller.join_channel().unwrap();

        assert!(calls(&log).contains(&"join:demo:0:none".to_string()));
    }

    #[test]
    fn test_join_only_once_per_cycle() {
        let (mut controller, log) = controller();

        controller.join_channel().unwrap();
        assert!(matches!(
            controller.join_channel(),
            Err(SessionError::JoinAlreadyAttempted)
        ));

        let joins = calls(&log).iter().filter(|c| c.starts_with("join:")).count();
        assert_eq!(joins, 1);
    }

    #[test]
    fn test_failed_join_still_counts_as_attempt() {
        let (mut controller, _log) = controller_with(false, true);

        assert!(matches!(
            controller.join_channel(),
            Err(SessionError::Engine(_))
        ));
        assert!(matches!(
            controller.join_channel(),
            Err(SessionError::JoinAlreadyAttempted)
        ));
    }

    #[test]
    fn test_duplicate_participant_join_renders_once() {
        let (mut controller, log) = controller();

        assert!(controller.on_participant_joined(Uid(7)).unwrap());
        assert!(!controller.on_participant_joined(Uid(7)).unwrap());

        let remote = calls(&log)
            .iter()
            .filter(|c| c.as_str() == "surface:remote:7")
            .count();
        assert_eq!(remote, 1);
        assert_eq!(controller.snapshot().remote_participants, vec![Uid(7)]);
    }

    #[test]
    fn test_participant_left_clears_all_surfaces() {
        let (mut controller, log) = controller();
        controller.on_participant_joined(Uid(7)).unwrap();
        controller.on_participant_joined(Uid(8)).unwrap();

        let cleared = controller.on_participant_left(Uid(99));

        assert_eq!(cleared, 2);
        assert!(controller.snapshot().remote_participants.is_empty());
        assert_eq!(calls(&log).last().map(String::as_str), Some("surface:clear"));
    }

    #[test]
    fn test_rejoin_after_left_renders_again() {
        let (mut controller, _log) = controller();
        controller.on_participant_joined(Uid(7)).unwrap();
        controller.on_participant_left(Uid(7));

        assert!(controller.on_participant_joined(Uid(7)).unwrap());
    }

    #[test]
    fn test_recording_lifecycle() {
        let (mut controller, _log) = controller();

        controller.begin_recording_start().unwrap();
        assert!(controller.snapshot().recording_start_pending);

        controller.recording_started(recording("R1", "S1", 7));
        let for_stop = controller.recording_for_stop().unwrap();
        assert_eq!(for_stop, recording("R1", "S1", 7));

        controller.recording_stopped(&for_stop);
        assert!(controller.snapshot().recording.is_none());
        assert!(matches!(
            controller.recording_for_stop(),
            Err(SessionError::NoActiveRecording)
        ));
    }

    #[test]
    fn test_stop_without_recording_is_precondition_violation() {
        let (controller, _log) = controller();

        let err = controller.recording_for_stop().unwrap_err();
        assert!(err.is_precondition_violation());
    }

    #[test]
    fn test_overlapping_start_rejected() {
        let (mut controller, _log) = controller();

        controller.begin_recording_start().unwrap();
        assert!(matches!(
            controller.begin_recording_start(),
            Err(SessionError::RecordingAlreadyActive)
        ));

        controller.recording_started(recording("R1", "S1", 7));
        assert!(matches!(
            controller.begin_recording_start(),
            Err(SessionError::RecordingAlreadyActive)
        ));
    }

    #[test]
    fn test_failed_start_leaves_no_session() {
        let (mut controller, _log) = controller();

        controller.begin_recording_start().unwrap();
        controller.recording_start_failed();

        let snapshot = controller.snapshot();
        assert!(snapshot.recording.is_none());
        assert!(!snapshot.recording_start_pending);
        assert!(controller.begin_recording_start().is_ok());
    }

    #[test]
    fn test_stale_session_kept_until_matching_stop() {
        let (mut controller, _log) = controller();
        controller.begin_recording_start().unwrap();
        controller.recording_started(recording("R1", "S1", 7));

        controller.recording_stopped(&recording("R0", "S0", 1));

        assert_eq!(
            controller.snapshot().recording,
            Some(recording("R1", "S1", 7))
        );
    }

    #[test]
    fn test_mute_and_switch_camera() {
        let (mut controller, log) = controller();

        controller.mute_local_audio(true).unwrap();
        assert!(controller.snapshot().audio_muted);
        controller.mute_local_audio(false).unwrap();
        assert!(!controller.snapshot().audio_muted);
        controller.switch_camera().unwrap();

        let log = calls(&log);
        assert!(log.contains(&"mute:true".to_string()));
        assert!(log.contains(&"mute:false".to_string()));
        assert!(log.contains(&"switch_camera".to_string()));
    }

    #[test]
    fn test_leave_is_idempotent() {
        let (mut controller, log) = controller();
        controller.join_channel().unwrap();
        controller.on_participant_joined(Uid(7)).unwrap();

        assert!(controller.leave());
        assert!(!controller.leave());

        let leaves = calls(&log)
            .iter()
            .filter(|c| c.as_str() == "leave_channel")
            .count();
        assert_eq!(leaves, 1);

        let snapshot = controller.snapshot();
        assert!(!snapshot.engine_available);
        assert!(!snapshot.join_attempted);
        assert!(snapshot.remote_participants.is_empty());
    }

    #[test]
    fn test_leave_without_engine_is_noop() {
        let (mut controller, _log) = controller_with(true, false);
        assert!(!controller.leave());
    }
}
