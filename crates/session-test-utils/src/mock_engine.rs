//! Mock media engine.
//!
//! [`MockEngineFactory`] hands out engines that record every call into a shared
//! [`EngineProbe`]. The probe also keeps the event sink the session gave the
//! engine, so tests can play the SDK and report remote participants.
//!
//! # Example
//!
//! ```rust,ignore
//! let (factory, probe) = MockEngineFactory::new();
//! // ... spawn a session with `factory` ...
//! probe.user_joined(Uid(7));
//! assert_eq!(probe.remote_setups(), vec![Uid(7)]);
//! ```

use common::secret::{ExposeSecret, SecretString};
use common::types::{ChannelName, Uid};
use session_controller::engine::{
    EngineEventSink, EngineFactory, MediaEngine, OfflineReason, VideoEncoderConfig,
};
use session_controller::errors::EngineError;
use std::sync::{Arc, Mutex};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    EnableVideo,
    SetVideoEncoderConfiguration(VideoEncoderConfig),
    SetupLocalVideo,
    JoinChannel {
        /// Token as exposed at call time, `None` if the session held none.
        token: Option<String>,
        channel: String,
        uid: Uid,
    },
    LeaveChannel,
    MuteLocalAudioStream(bool),
    SwitchCamera,
    SetupRemoteVideo(Uid),
}

#[derive(Debug, Default)]
struct ProbeState {
    calls: Vec<EngineCall>,
    created: usize,
    events: Option<EngineEventSink>,
}

/// Shared view of what the mock engine saw.
#[derive(Debug, Clone, Default)]
pub struct EngineProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl EngineProbe {
    /// All calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// How many engines were created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    /// Only the join calls.
    #[must_use]
    pub fn joins(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, EngineCall::JoinChannel { .. }))
            .collect()
    }

    #[must_use]
    pub fn join_count(&self) -> usize {
        self.joins().len()
    }

    /// Uids bound with `setup_remote_video`, in order.
    #[must_use]
    pub fn remote_setups(&self) -> Vec<Uid> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::SetupRemoteVideo(uid) => Some(uid),
                _ => None,
            })
            .collect()
    }

    /// Number of calls equal to `call`.
    #[must_use]
    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Report a remote participant joining, as the SDK would.
    ///
    /// # Panics
    ///
    /// Panics if no engine has been created yet.
    pub fn user_joined(&self, uid: Uid) -> bool {
        self.sink().user_joined(uid, 0)
    }

    /// Report a remote participant leaving, as the SDK would.
    ///
    /// # Panics
    ///
    /// Panics if no engine has been created yet.
    pub fn user_offline(&self, uid: Uid) -> bool {
        self.sink().user_offline(uid, OfflineReason::Quit)
    }

    fn sink(&self) -> EngineEventSink {
        self.state
            .lock()
            .unwrap()
            .events
            .clone()
            .expect("engine has not been created")
    }

    fn record(&self, call: EngineCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

/// Engine that records calls into an [`EngineProbe`].
#[derive(Debug)]
pub struct MockEngine {
    probe: EngineProbe,
}

impl MediaEngine for MockEngine {
    fn enable_video(&mut self) -> Result<(), EngineError> {
        self.probe.record(EngineCall::EnableVideo);
        Ok(())
    }

    fn set_video_encoder_configuration(
        &mut self,
        config: &VideoEncoderConfig,
    ) -> Result<(), EngineError> {
        self.probe
            .record(EngineCall::SetVideoEncoderConfiguration(*config));
        Ok(())
    }

    fn setup_local_video(&mut self) -> Result<(), EngineError> {
        self.probe.record(EngineCall::SetupLocalVideo);
        Ok(())
    }

    fn join_channel(
        &mut self,
        token: Option<&SecretString>,
        channel: &ChannelName,
        uid: Uid,
    ) -> Result<(), EngineError> {
        self.probe.record(EngineCall::JoinChannel {
            token: token.map(|t| t.expose_secret().to_string()),
            channel: channel.to_string(),
            uid,
        });
        Ok(())
    }

    fn leave_channel(&mut self) -> Result<(), EngineError> {
        self.probe.record(EngineCall::LeaveChannel);
        Ok(())
    }

    fn mute_local_audio_stream(&mut self, muted: bool) -> Result<(), EngineError> {
        self.probe.record(EngineCall::MuteLocalAudioStream(muted));
        Ok(())
    }

    fn switch_camera(&mut self) -> Result<(), EngineError> {
        self.probe.record(EngineCall::SwitchCamera);
        Ok(())
    }

    fn setup_remote_video(&mut self, uid: Uid) -> Result<(), EngineError> {
        self.probe.record(EngineCall::SetupRemoteVideo(uid));
        Ok(())
    }
}

/// Factory for [`MockEngine`]s, or one that always fails.
#[derive(Debug)]
pub struct MockEngineFactory {
    probe: EngineProbe,
    fail: bool,
}

impl MockEngineFactory {
    /// Factory whose engines record into the returned probe.
    #[must_use]
    pub fn new() -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        (
            Self {
                probe: probe.clone(),
                fail: false,
            },
            probe,
        )
    }

    /// Factory that fails like an SDK that cannot load.
    #[must_use]
    pub fn failing() -> (Self, EngineProbe) {
        let (mut factory, probe) = Self::new();
        factory.fail = true;
        (factory, probe)
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(
        &self,
        _app_id: &SecretString,
        events: EngineEventSink,
    ) -> Result<Box<dyn MediaEngine>, EngineError> {
        if self.fail {
            return Err(EngineError::Initialization(
                "mock engine configured to fail".to_string(),
            ));
        }

        {
            let mut state = self.probe.state.lock().unwrap();
            state.created += 1;
            state.events = Some(events);
        }

        Ok(Box::new(MockEngine {
            probe: self.probe.clone(),
        }))
    }
}
