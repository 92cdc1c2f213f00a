// SPDX-License-Identifier: GPL-3.0-only

//! Camera stream arbitration
//!
//! The manager owns the single live camera stream of the process. Tabs and
//! scan sessions never hold a stream directly; they hold a [`StreamLease`]
//! that stays valid until the stream is released or superseded. Acquiring a
//! new stream always stops the current one first, whichever tab owns it.

use super::enumeration::order_devices;
use super::types::*;
use super::{CameraBackend, MediaStream};
use crate::app::Tab;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Handle to the stream a caller acquired
///
/// Leases are never reused: once released, every call made with the lease
/// reports [`BackendError::StreamClosed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamLease {
    id: u64,
    owner: Tab,
}

impl StreamLease {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> Tab {
        self.owner
    }
}

struct ActiveStream {
    lease: StreamLease,
    stream: Box<dyn MediaStream>,
}

impl ActiveStream {
    fn stop(mut self, reason: &str) {
        info!(
            lease = self.lease.id,
            owner = %self.lease.owner,
            device = %self.stream.device_id(),
            reason,
            "Stopping camera stream"
        );
        self.stream.stop();
    }
}

/// Internal manager state
struct ManagerState {
    next_lease: u64,
    active: Option<ActiveStream>,
}

impl Drop for ManagerState {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop("manager dropped");
        }
    }
}

/// Camera manager
///
/// Cheap to clone; all clones share one stream slot.
#[derive(Clone)]
pub struct CameraManager {
    backend: Arc<dyn CameraBackend>,
    state: Arc<Mutex<ManagerState>>,
}

impl CameraManager {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        info!(backend = %backend.backend_type(), "Creating camera manager");

        Self {
            backend,
            state: Arc::new(Mutex::new(ManagerState {
                next_lease: 1,
                active: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the backend type
    pub fn backend_type(&self) -> CameraBackendType {
        self.backend.backend_type()
    }

    /// Enumerate cameras, rear-facing first
    pub fn list_cameras(&self) -> BackendResult<Vec<CameraDevice>> {
        let devices = order_devices(self.backend.enumerate_cameras()?);
        debug!(count = devices.len(), "Enumerated cameras");
        Ok(devices)
    }

    /// Open a stream on `device_id` for `owner`
    ///
    /// Any live stream is stopped before the device is opened. The id must
    /// match an enumerated device exactly.
    pub fn acquire(&self, owner: Tab, device_id: &str) -> BackendResult<StreamLease> {
        let mut state = self.lock();

        if let Some(previous) = state.active.take() {
            previous.stop("superseded");
        }

        let known = self.backend.enumerate_cameras()?;
        if !known.iter().any(|device| device.id == device_id) {
            return Err(BackendError::DeviceUnavailable(device_id.to_string()));
        }

        let stream = self.backend.open_stream(device_id)?;
        let lease = StreamLease {
            id: state.next_lease,
            owner,
        };
        state.next_lease += 1;

        info!(lease = lease.id, owner = %owner, device = device_id, "Camera stream acquired");
        state.active = Some(ActiveStream { lease, stream });
        Ok(lease)
    }

    /// Latest frame of the leased stream
    pub fn latest_frame(&self, lease: &StreamLease) -> BackendResult<Option<Arc<CameraFrame>>> {
        let state = self.lock();
        match &state.active {
            Some(active) if active.lease == *lease => Ok(active.stream.latest_frame()),
            _ => Err(BackendError::StreamClosed),
        }
    }

    /// Whether the lease still refers to the live stream
    pub fn is_live(&self, lease: &StreamLease) -> bool {
        self.lock()
            .active
            .as_ref()
            .is_some_and(|active| active.lease == *lease)
    }

    /// Release the leased stream; returns false if it was already gone
    pub fn release(&self, lease: &StreamLease) -> bool {
        self.release_where(|active| active == lease, "released")
    }

    /// Release whatever stream `owner` holds
    pub fn release_owner(&self, owner: Tab) -> bool {
        self.release_where(|active| active.owner == owner, "owner teardown")
    }

    /// Release the live stream regardless of owner
    pub fn release_all(&self) -> bool {
        self.release_where(|_| true, "shutdown")
    }

    fn release_where(&self, matches: impl Fn(&StreamLease) -> bool, reason: &str) -> bool {
        let mut state = self.lock();
        let should_release = state
            .active
            .as_ref()
            .is_some_and(|active| matches(&active.lease));

        if should_release && let Some(active) = state.active.take() {
            active.stop(reason);
            return true;
        }
        false
    }

    /// Tab owning the live stream, if any
    pub fn active_owner(&self) -> Option<Tab> {
        self.lock().active.as_ref().map(|active| active.lease.owner)
    }

    /// Number of open streams (0 or 1)
    pub fn live_streams(&self) -> usize {
        usize::from(self.lock().active.is_some())
    }
}

impl std::fmt::Debug for CameraManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CameraManager")
            .field("backend", &self.backend.backend_type())
            .field("active", &state.active.as_ref().map(|a| a.lease))
            .finish()
    }
}
