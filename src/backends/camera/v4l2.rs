// SPDX-License-Identifier: GPL-3.0-only

//! Video4Linux2 camera backend
//!
//! Devices are discovered by scanning `/dev/video*` and querying their
//! capabilities; the card name becomes the label. Each stream runs a capture
//! thread on a memory-mapped buffer queue and keeps only the newest frame.

use super::types::*;
use super::{CameraBackend, MediaStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Requested capture size; devices may answer with their nearest mode
const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;

/// How long to wait for the capture thread to get the device streaming
const START_TIMEOUT: Duration = Duration::from_secs(3);

const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(500);
/// Pause after a failed dequeue
const DEQUEUE_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Consecutive dequeue failures before the device is treated as gone
const MAX_DEQUEUE_FAILURES: u32 = 20;

/// Consecutive dequeue failure tracking for the capture loop
#[derive(Debug, Default)]
struct DequeueFailures {
    consecutive: u32,
}

impl DequeueFailures {
    /// Record a failure; false once the loop should give up
    fn record(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive < MAX_DEQUEUE_FAILURES
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }
}

/// FourCCs tried in order of preference
const PREFERRED_FOURCCS: [&[u8; 4]; 2] = [b"MJPG", b"YUYV"];

type LatestFrame = Arc<Mutex<Option<Arc<CameraFrame>>>>;

/// V4L2 backend
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

/// Sorted `/dev/videoN` node paths
fn video_nodes() -> Vec<String> {
    let mut nodes: Vec<(u32, String)> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = name.strip_prefix("video")?.parse::<u32>().ok()?;
            Some((index, entry.path().to_string_lossy().into_owned()))
        })
        .collect();
    nodes.sort();
    nodes.into_iter().map(|(_, path)| path).collect()
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> BackendResult<Vec<CameraDevice>> {
        let nodes = video_nodes();
        if nodes.is_empty() && !Path::new("/sys/class/video4linux").exists() {
            return Err(BackendError::Unsupported(
                "no video4linux devices on this system".to_string(),
            ));
        }

        let mut cameras = Vec::new();
        let mut denied = 0usize;

        for path in &nodes {
            let dev = match Device::with_path(path) {
                Ok(dev) => dev,
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        denied += 1;
                    }
                    debug!(path = %path, error = %e, "Skipping video node");
                    continue;
                }
            };

            match dev.query_caps() {
                Ok(caps) if caps.capabilities.contains(Flags::VIDEO_CAPTURE) => {
                    debug!(path = %path, card = %caps.card, driver = %caps.driver, "Found capture device");
                    cameras.push(CameraDevice::new(path.clone(), caps.card));
                }
                Ok(_) => debug!(path = %path, "Not a capture device"),
                Err(e) => debug!(path = %path, error = %e, "Capability query failed"),
            }
        }

        if cameras.is_empty() && denied > 0 {
            return Err(BackendError::PermissionDenied(format!(
                "{} video device(s) not accessible",
                denied
            )));
        }

        info!(count = cameras.len(), "Enumerated V4L2 cameras");
        Ok(cameras)
    }

    fn open_stream(&self, device_id: &str) -> BackendResult<Box<dyn MediaStream>> {
        let stream = V4l2Stream::open(device_id)?;
        Ok(Box::new(stream))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

/// Live V4L2 capture
pub struct V4l2Stream {
    device_id: String,
    running: Arc<AtomicBool>,
    latest: LatestFrame,
    thread_handle: Option<JoinHandle<()>>,
}

impl V4l2Stream {
    fn open(device_id: &str) -> BackendResult<Self> {
        info!(device = device_id, "Opening V4L2 stream");

        let running = Arc::new(AtomicBool::new(true));
        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_handle = {
            let path = device_id.to_string();
            let running = Arc::clone(&running);
            let latest = Arc::clone(&latest);
            std::thread::Builder::new()
                .name("v4l2-capture".to_string())
                .spawn(move || capture_loop(&path, running, latest, ready_tx))
                .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
        };

        let mut stream = Self {
            device_id: device_id.to_string(),
            running,
            latest,
            thread_handle: Some(thread_handle),
        };

        match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(Ok(())) => Ok(stream),
            Ok(Err(e)) => {
                stream.stop();
                Err(e)
            }
            Err(_) => {
                stream.stop();
                Err(BackendError::InitializationFailed(format!(
                    "{} did not start streaming",
                    device_id
                )))
            }
        }
    }
}

impl MediaStream for V4l2Stream {
    fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(()) => debug!(device = %self.device_id, "Capture thread stopped"),
                Err(_) => warn!(device = %self.device_id, "Capture thread panicked"),
            }
        }
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

/// Pick a capture format the frame converters understand
fn negotiate_format(dev: &Device) -> BackendResult<(Format, PixelFormat)> {
    for fourcc in PREFERRED_FOURCCS {
        let requested = Format::new(CAPTURE_WIDTH, CAPTURE_HEIGHT, FourCC::new(fourcc));
        match dev.set_format(&requested) {
            Ok(actual) => {
                if let Some(pixel_format) = PixelFormat::from_fourcc(&actual.fourcc.repr) {
                    return Ok((actual, pixel_format));
                }
            }
            Err(e) => debug!(fourcc = ?FourCC::new(fourcc), error = %e, "Format rejected"),
        }
    }

    let current = dev
        .format()
        .map_err(|e| BackendError::InitializationFailed(format!("Failed to query format: {}", e)))?;
    PixelFormat::from_fourcc(&current.fourcc.repr)
        .map(|pixel_format| (current, pixel_format))
        .ok_or_else(|| {
            BackendError::InitializationFailed(format!(
                "unsupported pixel format {:?}",
                current.fourcc
            ))
        })
}

/// Capture thread body; readiness (or the setup error) is sent once over `ready`
fn capture_loop(
    path: &str,
    running: Arc<AtomicBool>,
    latest: LatestFrame,
    ready: mpsc::Sender<BackendResult<()>>,
) {
    let dev = match Device::with_path(path) {
        Ok(dev) => dev,
        Err(e) => {
            let _ = ready.send(Err(BackendError::from_open_error(path, &e)));
            return;
        }
    };

    let (format, pixel_format) = match negotiate_format(&dev) {
        Ok(negotiated) => negotiated,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    info!(
        path,
        width = format.width,
        height = format.height,
        fourcc = ?format.fourcc,
        "V4L2 format configured"
    );

    let mut stream = match MmapStream::with_buffers(&dev, Type::VideoCapture, 4) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(BackendError::from_open_error(path, &e)));
            return;
        }
    };

    // Bounded wait so a stalled device cannot block stop()
    stream.set_timeout(DEQUEUE_TIMEOUT);

    let _ = ready.send(Ok(()));
    let mut sequence = 0u64;
    let mut failures = DequeueFailures::default();

    while running.load(Ordering::SeqCst) {
        let (buf, meta) = match stream.next() {
            Ok(frame) => {
                failures.reset();
                frame
            }
            Err(e) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if !failures.record() {
                    warn!(path, error = %e, "Device stopped delivering frames, giving up");
                    break;
                }
                debug!(path, error = %e, attempts = failures.consecutive, "Failed to dequeue frame");
                std::thread::sleep(DEQUEUE_RETRY_DELAY);
                continue;
            }
        };

        let used = (meta.bytesused as usize).min(buf.len());
        let payload = if used > 0 { &buf[..used] } else { buf };
        sequence += 1;

        let frame = CameraFrame {
            width: format.width,
            height: format.height,
            data: Arc::from(payload),
            format: pixel_format,
            stride: format.stride,
            sequence,
            captured_at: Instant::now(),
        };

        *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(frame));
    }

    debug!(path, frames = sequence, "V4L2 capture loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dequeue_failures_give_up_when_persistent() {
        let mut failures = DequeueFailures::default();
        for _ in 1..MAX_DEQUEUE_FAILURES {
            assert!(failures.record());
        }
        assert!(!failures.record());
    }

    #[test]
    fn test_dequeue_failures_reset_on_frame() {
        let mut failures = DequeueFailures::default();
        for _ in 1..MAX_DEQUEUE_FAILURES {
            failures.record();
        }
        failures.reset();
        assert!(failures.record());
        assert_eq!(failures.consecutive, 1);
    }
}
