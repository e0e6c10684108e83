//! Platform boundaries: video surfaces and device permissions.

use common::types::Uid;
use std::fmt;

/// The view layer hosting local and remote video.
///
/// The session decides when surfaces exist; implementations only create and
/// remove the platform views.
pub trait VideoSurfaces: Send {
    /// Create the local preview surface.
    fn attach_local(&mut self);

    /// Create a surface for remote participant `uid`.
    fn attach_remote(&mut self, uid: Uid);

    /// Remove every remote surface.
    fn clear_remote(&mut self);
}

/// Device permissions the session needs before creating the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevicePermission {
    Camera,
    Microphone,
}

impl DevicePermission {
    /// Everything the session asks for at startup.
    pub const REQUIRED: [DevicePermission; 2] =
        [DevicePermission::Camera, DevicePermission::Microphone];
}

impl fmt::Display for DevicePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePermission::Camera => f.write_str("camera"),
            DevicePermission::Microphone => f.write_str("microphone"),
        }
    }
}

/// Asks the platform for device permissions.
pub trait PermissionRequester: Send {
    /// Request `permissions` and return the ones granted.
    fn request(&self, permissions: &[DevicePermission]) -> Vec<DevicePermission>;
}
