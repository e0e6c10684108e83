//! Mock video surfaces and permissions.

use common::types::Uid;
use session_controller::platform::{DevicePermission, PermissionRequester, VideoSurfaces};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct SurfaceState {
    local: bool,
    remote: Vec<Uid>,
    clears: usize,
}

/// Shared view of the surfaces the session created.
#[derive(Debug, Clone, Default)]
pub struct SurfaceProbe {
    state: Arc<Mutex<SurfaceState>>,
}

impl SurfaceProbe {
    #[must_use]
    pub fn has_local(&self) -> bool {
        self.state.lock().unwrap().local
    }

    /// Remote surfaces currently shown, in attach order.
    #[must_use]
    pub fn remote(&self) -> Vec<Uid> {
        self.state.lock().unwrap().remote.clone()
    }

    /// Number of surfaces currently shown for `uid`.
    #[must_use]
    pub fn remote_count(&self, uid: Uid) -> usize {
        self.state
            .lock()
            .unwrap()
            .remote
            .iter()
            .filter(|u| **u == uid)
            .count()
    }

    /// How many times the remote surfaces were cleared.
    #[must_use]
    pub fn clears(&self) -> usize {
        self.state.lock().unwrap().clears
    }
}

/// Surfaces that record into a [`SurfaceProbe`].
#[derive(Debug)]
pub struct MockSurfaces {
    probe: SurfaceProbe,
}

impl MockSurfaces {
    #[must_use]
    pub fn new() -> (Self, SurfaceProbe) {
        let probe = SurfaceProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl VideoSurfaces for MockSurfaces {
    fn attach_local(&mut self) {
        self.probe.state.lock().unwrap().local = true;
    }

    fn attach_remote(&mut self, uid: Uid) {
        self.probe.state.lock().unwrap().remote.push(uid);
    }

    fn clear_remote(&mut self) {
        let mut state = self.probe.state.lock().unwrap();
        state.remote.clear();
        state.clears += 1;
    }
}

/// Permission requester with a fixed answer.
#[derive(Debug, Clone)]
pub struct MockPermissions {
    granted: Vec<DevicePermission>,
    requested: Arc<Mutex<Vec<DevicePermission>>>,
}

impl MockPermissions {
    /// Grant whatever is requested.
    #[must_use]
    pub fn granting_all() -> Self {
        Self::granting(&DevicePermission::REQUIRED)
    }

    /// Grant nothing.
    #[must_use]
    pub fn denying_all() -> Self {
        Self::granting(&[])
    }

    /// Grant only `granted`.
    #[must_use]
    pub fn granting(granted: &[DevicePermission]) -> Self {
        Self {
            granted: granted.to_vec(),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Everything asked for so far.
    #[must_use]
    pub fn requested(&self) -> Vec<DevicePermission> {
        self.requested.lock().unwrap().clone()
    }
}

impl PermissionRequester for MockPermissions {
    fn request(&self, permissions: &[DevicePermission]) -> Vec<DevicePermission> {
        self.requested
            .lock()
            .unwrap()
            .extend_from_slice(permissions);
        permissions
            .iter()
            .copied()
            .filter(|p| self.granted.contains(p))
            .collect()
    }
}
