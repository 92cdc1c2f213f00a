// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Tabs / ScanSession │
//! └──────────┬──────────┘
//!            │ leases
//!            ▼
//! ┌─────────────────────┐
//! │    CameraManager    │  ← one live stream process-wide
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← enumeration + stream opening
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!    ┌──────┐  ┌─────────┐
//!    │ V4L2 │  │ Virtual │
//!    └──────┘  └─────────┘
//! ```

pub mod enumeration;
pub mod frame_loop;
pub mod manager;
pub mod types;
#[cfg(target_os = "linux")]
pub mod v4l2;

pub use enumeration::{default_camera, order_devices};
pub use manager::{CameraManager, StreamLease};
pub use types::*;

use std::sync::Arc;

/// A live camera stream
///
/// Implementations keep the most recent frame available for preview, decoding
/// and still capture. `stop()` releases every capture resource; the manager
/// calls it exactly once per stream.
pub trait MediaStream: Send {
    /// Most recent frame, if the device has produced one yet
    fn latest_frame(&self) -> Option<Arc<CameraFrame>>;

    /// Stop capture and release the device
    fn stop(&mut self);

    /// Device id this stream was opened for
    fn device_id(&self) -> &str;
}

/// Camera backend trait
///
/// Backends enumerate devices and open streams. They hold no stream state of
/// their own; ownership of the live stream belongs to [`CameraManager`].
pub trait CameraBackend: Send + Sync {
    /// Enumerate available cameras in backend order
    fn enumerate_cameras(&self) -> BackendResult<Vec<CameraDevice>>;

    /// Open a stream on the device whose id matches exactly
    fn open_stream(&self, device_id: &str) -> BackendResult<Box<dyn MediaStream>>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;
}

/// Get the platform camera backend
#[cfg(target_os = "linux")]
pub fn get_backend() -> Arc<dyn CameraBackend> {
    Arc::new(v4l2::V4l2Backend::new())
}

/// Get the platform camera backend
#[cfg(not(target_os = "linux"))]
pub fn get_backend() -> Arc<dyn CameraBackend> {
    Arc::new(crate::backends::virtual_camera::VirtualBackend::unsupported())
}
