// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! Serves still frames as if they came from a camera. The CLI uses it to scan
//! image files with `--image`; tests use it in place of hardware and read its
//! counters to check stream lifecycle guarantees.
//!
//! Each call to `latest_frame()` advances to the next frame of the device
//! (wrapping around) and stamps it with a fresh sequence number.

mod file_source;

pub use file_source::load_image_as_frame;

use crate::backends::camera::types::*;
use crate::backends::camera::{CameraBackend, MediaStream};
use image::{Rgb, RgbImage};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// A simulated camera
#[derive(Debug, Clone)]
pub struct VirtualDevice {
    pub device: CameraDevice,
    frames: Vec<Arc<CameraFrame>>,
    deny_access: bool,
}

impl VirtualDevice {
    pub fn new(id: &str, label: &str, frames: Vec<CameraFrame>) -> Self {
        Self {
            device: CameraDevice::new(id, label),
            frames: frames.into_iter().map(Arc::new).collect(),
            deny_access: false,
        }
    }

    /// A device showing a single solid-colour 64x48 frame
    pub fn solid(id: &str, label: &str, color: [u8; 3]) -> Self {
        let image = RgbImage::from_pixel(64, 48, Rgb(color));
        Self::new(id, label, vec![CameraFrame::from_rgb(image, 0)])
    }

    /// Make opening this device fail with a permission error
    pub fn denied(mut self) -> Self {
        self.deny_access = true;
        self
    }
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    stopped: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    double_stops: AtomicUsize,
    frames_served: AtomicU64,
}

struct Inner {
    devices: Mutex<Vec<VirtualDevice>>,
    supported: bool,
    counters: Counters,
}

/// Virtual backend; clones share devices and counters
#[derive(Clone)]
pub struct VirtualBackend {
    inner: Arc<Inner>,
}

impl VirtualBackend {
    pub fn new(devices: Vec<VirtualDevice>) -> Self {
        Self {
            inner: Arc::new(Inner {
                devices: Mutex::new(devices),
                supported: true,
                counters: Counters::default(),
            }),
        }
    }

    /// Backend reporting that no camera API exists
    pub fn unsupported() -> Self {
        Self {
            inner: Arc::new(Inner {
                devices: Mutex::new(Vec::new()),
                supported: false,
                counters: Counters::default(),
            }),
        }
    }

    /// One device per image file; the file path is the device id
    pub fn from_image_files(paths: &[PathBuf]) -> BackendResult<Self> {
        let devices = paths
            .iter()
            .map(|path| {
                let frame = load_image_as_frame(path)?;
                let id = path.to_string_lossy();
                let label = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(VirtualDevice::new(&id, &label, vec![frame]))
            })
            .collect::<BackendResult<Vec<_>>>()?;

        info!(count = devices.len(), "Virtual camera devices loaded from files");
        Ok(Self::new(devices))
    }

    /// Unplug a device; later opens of its id fail
    pub fn remove_device(&self, id: &str) {
        self.lock_devices().retain(|d| d.device.id != id);
    }

    fn lock_devices(&self) -> std::sync::MutexGuard<'_, Vec<VirtualDevice>> {
        self.inner
            .devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn streams_opened(&self) -> usize {
        self.inner.counters.opened.load(Ordering::SeqCst)
    }

    pub fn streams_stopped(&self) -> usize {
        self.inner.counters.stopped.load(Ordering::SeqCst)
    }

    pub fn live_streams(&self) -> usize {
        self.inner.counters.live.load(Ordering::SeqCst)
    }

    /// Highest number of streams that were open at the same time
    pub fn max_concurrent_streams(&self) -> usize {
        self.inner.counters.max_live.load(Ordering::SeqCst)
    }

    /// Calls to `stop()` on an already stopped stream
    pub fn double_stops(&self) -> usize {
        self.inner.counters.double_stops.load(Ordering::SeqCst)
    }

    pub fn frames_served(&self) -> u64 {
        self.inner.counters.frames_served.load(Ordering::SeqCst)
    }
}

impl CameraBackend for VirtualBackend {
    fn enumerate_cameras(&self) -> BackendResult<Vec<CameraDevice>> {
        if !self.inner.supported {
            return Err(BackendError::Unsupported(
                "no camera backend available on this platform".to_string(),
            ));
        }

        let devices = self.lock_devices();
        if !devices.is_empty() && devices.iter().all(|d| d.deny_access) {
            return Err(BackendError::PermissionDenied(
                "all virtual devices deny access".to_string(),
            ));
        }
        Ok(devices.iter().map(|d| d.device.clone()).collect())
    }

    fn open_stream(&self, device_id: &str) -> BackendResult<Box<dyn MediaStream>> {
        let device = self
            .lock_devices()
            .iter()
            .find(|d| d.device.id == device_id)
            .cloned()
            .ok_or_else(|| BackendError::DeviceUnavailable(device_id.to_string()))?;

        if device.deny_access {
            return Err(BackendError::PermissionDenied(device_id.to_string()));
        }

        let counters = &self.inner.counters;
        counters.opened.fetch_add(1, Ordering::SeqCst);
        let live = counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_live.fetch_max(live, Ordering::SeqCst);
        debug!(device = device_id, live, "Virtual stream opened");

        Ok(Box::new(VirtualStream {
            device_id: device_id.to_string(),
            frames: device.frames,
            cursor: AtomicUsize::new(0),
            sequence: AtomicU64::new(0),
            stopped: false,
            inner: Arc::clone(&self.inner),
        }))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }
}

struct VirtualStream {
    device_id: String,
    frames: Vec<Arc<CameraFrame>>,
    cursor: AtomicUsize,
    sequence: AtomicU64,
    stopped: bool,
    inner: Arc<Inner>,
}

impl MediaStream for VirtualStream {
    fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        if self.stopped || self.frames.is_empty() {
            return None;
        }

        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.frames.len();
        let mut frame = CameraFrame::clone(&self.frames[index]);
        frame.sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .counters
            .frames_served
            .fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(frame))
    }

    fn stop(&mut self) {
        let counters = &self.inner.counters;
        if self.stopped {
            warn!(device = %self.device_id, "Virtual stream stopped twice");
            counters.double_stops.fetch_add(1, Ordering::SeqCst);
            return;
        }
        self.stopped = true;
        counters.stopped.fetch_add(1, Ordering::SeqCst);
        counters.live.fetch_sub(1, Ordering::SeqCst);
        debug!(device = %self.device_id, "Virtual stream stopped");
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop();
        }
    }
}
