//! Session data model.

use common::secret::SecretString;
use common::types::{ChannelName, Uid};
use serde::{Deserialize, Serialize};

/// The local user's membership in the channel.
///
/// Created at launch with no token and [`Uid::UNASSIGNED`]; the token fetch
/// fills both in. There is no renewal once the token expires.
#[derive(Debug)]
pub struct ChannelSession {
    /// Fixed channel name for this build.
    pub channel: ChannelName,
    /// Identity assigned by the token server.
    pub local_uid: Uid,
    /// Access credential, absent until a fetch succeeds.
    pub token: Option<SecretString>,
}

impl ChannelSession {
    /// A session that has not fetched a token yet.
    #[must_use]
    pub fn new(channel: ChannelName) -> Self {
        Self {
            channel,
            local_uid: Uid::UNASSIGNED,
            token: None,
        }
    }
}

/// Identifiers of a running cloud recording job.
///
/// Returned by a successful start call and sent back unchanged on stop.
/// Field names on the wire are `rid`, `sid` and `uid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSession {
    /// Recording resource id.
    #[serde(rename = "rid")]
    pub resource_id: String,
    /// Recording session id.
    #[serde(rename = "sid")]
    pub session_id: String,
    /// Identity the recorder joined the channel with.
    #[serde(rename = "uid")]
    pub recording_uid: Uid,
}

/// Point-in-time view of the session for the UI.
///
/// Carries no credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub channel: ChannelName,
    pub local_uid: Uid,
    pub has_token: bool,
    pub engine_available: bool,
    pub join_attempted: bool,
    pub audio_muted: bool,
    pub recording: Option<RecordingSession>,
    pub recording_start_pending: bool,
    /// Remote participants with a rendered surface, ascending.
    pub remote_participants: Vec<Uid>,
}
