//! Channel and identity types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest channel name the media engine accepts, in bytes.
pub const MAX_CHANNEL_NAME_LEN: usize = 64;

/// Rejected channel name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelNameError {
    /// Name is empty or only whitespace.
    #[error("channel name must not be empty")]
    Empty,

    /// Name exceeds [`MAX_CHANNEL_NAME_LEN`].
    #[error("channel name is {0} bytes, limit is {MAX_CHANNEL_NAME_LEN}")]
    TooLong(usize),
}

/// Name of a real-time audio/video channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    /// Validate and wrap a channel name.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelNameError`] when the name is blank or too long.
    pub fn new(name: impl Into<String>) -> Result<Self, ChannelNameError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ChannelNameError::Empty);
        }
        if name.len() > MAX_CHANNEL_NAME_LEN {
            return Err(ChannelNameError::TooLong(name.len()));
        }
        Ok(Self(name))
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChannelName {
    type Error = ChannelNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelName> for String {
    fn from(name: ChannelName) -> Self {
        name.0
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric identity of a channel member.
///
/// Issued by the token server for the local user, by the recording service
/// for the recorder, and reported by the engine for remote participants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u32);

impl Uid {
    /// Joining with this uid lets the engine pick one.
    pub const UNASSIGNED: Uid = Uid(0);

    /// Whether this is [`Uid::UNASSIGNED`].
    #[must_use]
    pub fn is_unassigned(self) -> bool {
        self == Self::UNASSIGNED
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_accepts_plain_name() {
        let name = ChannelName::new("demo").unwrap();
        assert_eq!(name.as_str(), "demo");
        assert_eq!(name.to_string(), "demo");
    }

    #[test]
    fn test_channel_name_rejects_blank() {
        assert_eq!(ChannelName::new(""), Err(ChannelNameError::Empty));
        assert_eq!(ChannelName::new("   "), Err(ChannelNameError::Empty));
    }

    #[test]
    fn test_channel_name_rejects_too_long() {
        let long = "c".repeat(MAX_CHANNEL_NAME_LEN + 1);
        assert_eq!(
            ChannelName::new(long),
            Err(ChannelNameError::TooLong(MAX_CHANNEL_NAME_LEN + 1))
        );
    }

    #[test]
    fn test_channel_name_serializes_as_string() {
        let name = ChannelName::new("demo").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), r#""demo""#);
    }

    #[test]
    fn test_channel_name_deserialize_validates() {
        assert!(serde_json::from_str::<ChannelName>(r#""""#).is_err());
        let name: ChannelName = serde_json::from_str(r#""demo""#).unwrap();
        assert_eq!(name.as_str(), "demo");
    }

    #[test]
    fn test_uid_is_transparent_integer() {
        let uid: Uid = serde_json::from_str("42").unwrap();
        assert_eq!(uid, Uid(42));
        assert_eq!(serde_json::to_string(&Uid(7)).unwrap(), "7");
    }

    #[test]
    fn test_uid_unassigned() {
        assert!(Uid::UNASSIGNED.is_unassigned());
        assert!(Uid::default().is_unassigned());
        assert!(!Uid(42).is_unassigned());
    }
}
