//! Logging stand-ins for the media SDK and the platform views.
//!
//! Used by the binary when no native SDK is linked. The engine accepts every
//! operation and traces it; surfaces and permissions behave as on a device
//! where everything is granted.

use crate::engine::{EngineEventSink, EngineFactory, MediaEngine, VideoEncoderConfig};
use crate::errors::EngineError;
use crate::platform::{DevicePermission, PermissionRequester, VideoSurfaces};
use common::secret::SecretString;
use common::types::{ChannelName, Uid};
use tracing::{debug, info};

/// Creates [`HeadlessEngine`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessEngineFactory;

impl EngineFactory for HeadlessEngineFactory {
    fn create(
        &self,
        _app_id: &SecretString,
        events: EngineEventSink,
    ) -> Result<Box<dyn MediaEngine>, EngineError> {
        info!(target: "session.headless", "Creating headless media engine");
        Ok(Box::new(HeadlessEngine::new(events)))
    }
}

/// Engine that traces every call and never produces media.
#[derive(Debug)]
pub struct HeadlessEngine {
    // Kept so callbacks have somewhere to go if a transport is wired in.
    _events: EngineEventSink,
    joined: Option<(ChannelName, Uid)>,
}

impl HeadlessEngine {
    #[must_use]
    pub fn new(events: EngineEventSink) -> Self {
        Self {
            _events: events,
            joined: None,
        }
    }

    /// Channel and uid of the current join, if any.
    #[must_use]
    pub fn joined(&self) -> Option<&(ChannelName, Uid)> {
        self.joined.as_ref()
    }
}

impl MediaEngine for HeadlessEngine {
    fn enable_video(&mut self) -> Result<(), EngineError> {
        debug!(target: "session.headless", "enable_video");
        Ok(())
    }

    fn set_video_encoder_configuration(
        &mut self,
        config: &VideoEncoderConfig,
    ) -> Result<(), EngineError> {
        debug!(
            target: "session.headless",
            width = config.dimensions.width,
            height = config.dimensions.height,
            frame_rate = config.frame_rate,
            bitrate = ?config.bitrate,
            orientation = ?config.orientation,
            "set_video_encoder_configuration"
        );
        Ok(())
    }

    fn setup_local_video(&mut self) -> Result<(), EngineError> {
        debug!(target: "session.headless", "setup_local_video");
        Ok(())
    }

    fn join_channel(
        &mut self,
        token: Option<&SecretString>,
        channel: &ChannelName,
        uid: Uid,
    ) -> Result<(), EngineError> {
        info!(
            target: "session.headless",
            channel = %channel,
            uid = %uid,
            has_token = token.is_some(),
            "join_channel"
        );
        self.joined = Some((channel.clone(), uid));
        Ok(())
    }

    fn leave_channel(&mut self) -> Result<(), EngineError> {
        info!(target: "session.headless", "leave_channel");
        self.joined = None;
        Ok(())
    }

    fn mute_local_audio_stream(&mut self, muted: bool) -> Result<(), EngineError> {
        info!(target: "session.headless", muted, "mute_local_audio_stream");
        Ok(())
    }

    fn switch_camera(&mut self) -> Result<(), EngineError> {
        info!(target: "session.headless", "switch_camera");
        Ok(())
    }

    fn setup_remote_video(&mut self, uid: Uid) -> Result<(), EngineError> {
        debug!(target: "session.headless", uid = %uid, "setup_remote_video");
        Ok(())
    }
}

/// Surfaces that only count what is attached.
#[derive(Debug, Default)]
pub struct HeadlessSurfaces {
    local: bool,
    remote: Vec<Uid>,
}

impl HeadlessSurfaces {
    #[must_use]
    pub fn has_local(&self) -> bool {
        self.local
    }

    #[must_use]
    pub fn remote(&self) -> &[Uid] {
        &self.remote
    }
}

impl VideoSurfaces for HeadlessSurfaces {
    fn attach_local(&mut self) {
        self.local = true;
        debug!(target: "session.headless", "Local surface attached");
    }

    fn attach_remote(&mut self, uid: Uid) {
        self.remote.push(uid);
        debug!(target: "session.headless", uid = %uid, "Remote surface attached");
    }

    fn clear_remote(&mut self) {
        debug!(
            target: "session.headless",
            count = self.remote.len(),
            "Remote surfaces cleared"
        );
        self.remote.clear();
    }
}

/// Grants whatever is asked.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrantAllPermissions;

impl PermissionRequester for GrantAllPermissions {
    fn request(&self, permissions: &[DevicePermission]) -> Vec<DevicePermission> {
        permissions.to_vec()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creates_engine() {
        let (sink, _receiver) = EngineEventSink::channel();
        let engine = HeadlessEngineFactory.create(&SecretString::from("app"), sink);
        assert!(engine.is_ok());
    }

    #[test]
    fn test_engine_tracks_join_and_leave() {
        let (sink, _receiver) = EngineEventSink::channel();
        let mut engine = HeadlessEngine::new(sink);
        let channel = ChannelName::new("demo").unwrap();

        engine.join_channel(None, &channel, Uid(42)).unwrap();
        assert_eq!(engine.joined(), Some(&(channel, Uid(42))));

        engine.leave_channel().unwrap();
        assert!(engine.joined().is_none());
    }

    #[test]
    fn test_surfaces_clear_all_remote() {
        let mut surfaces = HeadlessSurfaces::default();
        surfaces.attach_local();
        surfaces.attach_remote(Uid(7));
        surfaces.attach_remote(Uid(8));

        surfaces.clear_remote();

        assert!(surfaces.has_local());
        assert!(surfaces.remote().is_empty());
    }

    #[test]
    fn test_grant_all() {
        let granted = GrantAllPermissions.request(&DevicePermission::REQUIRED);
        assert_eq!(granted, DevicePermission::REQUIRED.to_vec());
    }
}
