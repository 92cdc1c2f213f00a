// SPDX-License-Identifier: GPL-3.0-only

//! Camera-backed scan sessions
//!
//! A session owns one camera stream (through a [`StreamLease`]) for one scan
//! attempt:
//!
//! ```text
//! Idle ──start──▶ Starting ──▶ Active ──▶ Decoded | Captured
//!                    │           │
//!                    ▼           ▼
//!                  Error      Stopped  (cancel, teardown, superseded)
//! ```
//!
//! In decode mode a paced worker feeds frames to the decoder and reports the
//! first hit over the session event channel. In snapshot mode the caller
//! shows the preview and calls [`ScanSession::capture`]. Either way the
//! stream is released exactly once, by the camera manager.

pub mod decoder;
pub mod snapshot;

pub use decoder::{DecodeError, LinearDecoder, MultiDecoder, QrDecoder, SymbolDecoder, Symbology};
pub use snapshot::{SnapshotError, encode_snapshot};

use crate::app::Tab;
use crate::backends::camera::frame_loop::{FrameLoop, LoopAction};
use crate::backends::camera::{BackendError, CameraFrame, CameraManager, StreamLease};
use crate::constants::{CAMERA_ACCESS_FAILED, MAX_DECODE_FPS, SNAPSHOT_SIZE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// What an active session does with its frames
#[derive(Clone)]
pub enum ScanMode {
    /// Continuous decode with a decoder built for these symbologies
    Decode(Vec<Symbology>),
    /// Continuous decode with a ready-made decoder
    DecodeWith(Arc<dyn SymbolDecoder>),
    /// Live preview; a still is taken on [`ScanSession::capture`]
    Snapshot { size: u32 },
}

impl ScanMode {
    /// Retail barcode decoding
    pub fn barcode() -> Self {
        Self::Decode(Symbology::RETAIL.to_vec())
    }

    pub fn snapshot() -> Self {
        Self::Snapshot {
            size: SNAPSHOT_SIZE,
        }
    }

    pub fn is_decode(&self) -> bool {
        !matches!(self, Self::Snapshot { .. })
    }
}

impl std::fmt::Debug for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(symbologies) => f.debug_tuple("Decode").field(symbologies).finish(),
            Self::DecodeWith(_) => f.write_str("DecodeWith(..)"),
            Self::Snapshot { size } => f.debug_struct("Snapshot").field("size", size).finish(),
        }
    }
}

/// Why a session failed to become active
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("{}", CAMERA_ACCESS_FAILED)]
    PermissionDenied,
    #[error("Camera is not available")]
    DeviceUnavailable,
    #[error("Barcode decoder could not be initialised")]
    DecoderInitFailed,
}

impl From<&BackendError> for ScanError {
    fn from(err: &BackendError) -> Self {
        match err {
            BackendError::PermissionDenied(_) => ScanError::PermissionDenied,
            _ => ScanError::DeviceUnavailable,
        }
    }
}

/// Session lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting { device_id: String },
    Active,
    Decoded,
    Captured,
    Stopped,
    Error(ScanError),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Decoded | Self::Captured | Self::Stopped | Self::Error(_)
        )
    }
}

/// Output of a successful scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    Decoded { text: String },
    Captured { image_bytes: Vec<u8> },
}

/// Asynchronous session notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session_id: u64,
    pub owner: Tab,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    /// The decode loop found a symbol; the stream is already released
    Decoded(ScanResult),
    /// Another session took the camera
    Superseded,
}

/// Still capture failures; the session stays active unless stated otherwise
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("Session is not capturing")]
    NotActive,
    #[error("No camera frame available yet")]
    NoFrame,
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

struct Shared {
    state: Mutex<SessionState>,
    lease: Mutex<Option<StreamLease>>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lease(&self) -> Option<StreamLease> {
        *self.lease.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Release the stream; the manager ignores leases it no longer holds
    fn release(&self, camera: &CameraManager) {
        let lease = self
            .lease
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(lease) = lease {
            camera.release(&lease);
        }
    }
}

/// One scan attempt on one camera
pub struct ScanSession {
    id: u64,
    owner: Tab,
    mode: ScanMode,
    decode_interval: Duration,
    camera: CameraManager,
    shared: Arc<Shared>,
    events: UnboundedSender<SessionEvent>,
    decode_loop: Option<FrameLoop>,
}

impl ScanSession {
    pub fn new(
        owner: Tab,
        mode: ScanMode,
        camera: CameraManager,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            owner,
            mode,
            decode_interval: decode_interval(MAX_DECODE_FPS),
            camera,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                lease: Mutex::new(None),
            }),
            events,
            decode_loop: None,
        }
    }

    /// Lower the decode rate; values above the maximum are clamped
    pub fn with_decode_fps(mut self, fps: u32) -> Self {
        self.decode_interval = decode_interval(fps);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> Tab {
        self.owner
    }

    pub fn mode(&self) -> &ScanMode {
        &self.mode
    }

    pub fn state(&self) -> SessionState {
        let mut state = self.shared.state();
        // Snapshot sessions have no loop watching the lease
        if matches!(self.mode, ScanMode::Snapshot { .. })
            && *state == SessionState::Active
            && !self.shared.lease().is_some_and(|lease| self.camera.is_live(&lease))
        {
            debug!(session = self.id, "Snapshot stream superseded");
            *state = SessionState::Stopped;
            self.shared.release(&self.camera);
        }
        state.clone()
    }

    /// Acquire the camera and begin scanning
    ///
    /// Only valid from `Idle`; any other state is returned unchanged. Any
    /// stream held elsewhere in the app is stopped before this one opens.
    pub fn start(&mut self, device_id: &str) -> SessionState {
        {
            let mut state = self.shared.state();
            if *state != SessionState::Idle {
                warn!(session = self.id, state = ?*state, "Session already started");
                return state.clone();
            }
            *state = SessionState::Starting {
                device_id: device_id.to_string(),
            };
        }
        info!(session = self.id, owner = %self.owner, device = device_id, mode = ?self.mode, "Starting scan session");

        let decoder: Option<Arc<dyn SymbolDecoder>> = match &self.mode {
            ScanMode::Decode(symbologies) => match MultiDecoder::new(symbologies) {
                Ok(decoder) => Some(Arc::new(decoder)),
                Err(e) => {
                    warn!(session = self.id, error = %e, "Decoder initialisation failed");
                    return self.fail(ScanError::DecoderInitFailed);
                }
            },
            ScanMode::DecodeWith(decoder) => Some(Arc::clone(decoder)),
            ScanMode::Snapshot { .. } => None,
        };

        let lease = match self.camera.acquire(self.owner, device_id) {
            Ok(lease) => lease,
            Err(e) => {
                warn!(session = self.id, device = device_id, error = %e, "Camera acquisition failed");
                return self.fail(ScanError::from(&e));
            }
        };

        {
            let mut state = self.shared.state();
            if *state != (SessionState::Starting { device_id: device_id.to_string() }) {
                // Cancelled while the device was opening
                drop(state);
                self.camera.release(&lease);
                return self.state();
            }
            *self.shared.lease.lock().unwrap_or_else(PoisonError::into_inner) = Some(lease);
            *state = SessionState::Active;
        }

        if let Some(decoder) = decoder {
            self.decode_loop = Some(self.spawn_decode_loop(lease, decoder));
        }
        SessionState::Active
    }

    fn fail(&self, reason: ScanError) -> SessionState {
        let mut state = self.shared.state();
        *state = SessionState::Error(reason);
        state.clone()
    }

    fn spawn_decode_loop(&self, lease: StreamLease, decoder: Arc<dyn SymbolDecoder>) -> FrameLoop {
        let session_id = self.id;
        let owner = self.owner;
        let camera = self.camera.clone();
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let mut last_sequence = None;

        FrameLoop::start(
            &format!("decode-{}", session_id),
            self.decode_interval,
            move |stop| {
                let frame = match camera.latest_frame(&lease) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => return LoopAction::Continue,
                    Err(_) => {
                        let mut state = shared.state();
                        if *state == SessionState::Active {
                            debug!(session = session_id, "Stream superseded");
                            *state = SessionState::Stopped;
                            drop(state);
                            shared.release(&camera);
                            let _ = events.send(SessionEvent {
                                session_id,
                                owner,
                                kind: SessionEventKind::Superseded,
                            });
                        }
                        return LoopAction::Stop;
                    }
                };

                if last_sequence == Some(frame.sequence) {
                    return LoopAction::Continue;
                }
                last_sequence = Some(frame.sequence);

                let text = match decoder.decode(&frame) {
                    Ok(Some(text)) => text,
                    Ok(None) => return LoopAction::Continue,
                    Err(e) => {
                        trace!(session = session_id, error = %e, "Decode attempt failed");
                        return LoopAction::Continue;
                    }
                };

                if stop.load(Ordering::SeqCst) {
                    return LoopAction::Stop;
                }

                let mut state = shared.state();
                if *state != SessionState::Active {
                    debug!(session = session_id, "Discarding decode after session ended");
                    return LoopAction::Stop;
                }
                *state = SessionState::Decoded;
                drop(state);

                info!(session = session_id, text = %text, "Symbol decoded");
                shared.release(&camera);
                let _ = events.send(SessionEvent {
                    session_id,
                    owner,
                    kind: SessionEventKind::Decoded(ScanResult::Decoded { text }),
                });
                LoopAction::Stop
            },
        )
    }

    /// Newest frame for preview, while the session is active
    pub fn preview_frame(&self) -> Option<Arc<CameraFrame>> {
        if *self.shared.state() != SessionState::Active {
            return None;
        }
        let lease = self.shared.lease()?;
        self.camera.latest_frame(&lease).ok().flatten()
    }

    /// Take the still for a snapshot session
    ///
    /// On success the session becomes `Captured` and the stream is released.
    pub fn capture(&mut self) -> Result<ScanResult, CaptureError> {
        let size = match self.mode {
            ScanMode::Snapshot { size } => size,
            _ => return Err(CaptureError::NotActive),
        };

        let mut state = self.shared.state();
        if *state != SessionState::Active {
            return Err(CaptureError::NotActive);
        }
        let lease = self.shared.lease().ok_or(CaptureError::NotActive)?;

        let frame = match self.camera.latest_frame(&lease) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Err(CaptureError::NoFrame),
            Err(_) => {
                *state = SessionState::Stopped;
                drop(state);
                self.shared.release(&self.camera);
                return Err(CaptureError::NotActive);
            }
        };

        let image_bytes = encode_snapshot(&frame, size)?;
        *state = SessionState::Captured;
        drop(state);

        info!(session = self.id, bytes = image_bytes.len(), "Snapshot captured");
        self.shared.release(&self.camera);
        Ok(ScanResult::Captured { image_bytes })
    }

    /// Stop the session and release its stream
    ///
    /// Moves any non-terminal state to `Stopped`. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        {
            let mut state = self.shared.state();
            if !state.is_terminal() {
                debug!(session = self.id, from = ?*state, "Cancelling scan session");
                *state = SessionState::Stopped;
            }
        }

        self.shared.release(&self.camera);
        if let Some(mut decode_loop) = self.decode_loop.take() {
            decode_loop.stop();
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish()
    }
}

fn decode_interval(fps: u32) -> Duration {
    let fps = fps.clamp(1, MAX_DECODE_FPS);
    Duration::from_millis(1000 / fps as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::{VirtualBackend, VirtualDevice};
    use tokio::sync::mpsc;

    fn camera() -> (CameraManager, VirtualBackend) {
        let backend = VirtualBackend::new(vec![VirtualDevice::solid("cam", "Back Camera", [90, 90, 90])]);
        (CameraManager::new(Arc::new(backend.clone())), backend)
    }

    #[test]
    fn test_decode_interval_is_capped() {
        assert_eq!(decode_interval(30), Duration::from_millis(100));
        assert_eq!(decode_interval(0), Duration::from_millis(1000));
        assert_eq!(decode_interval(5), Duration::from_millis(200));
    }

    #[test]
    fn test_empty_symbologies_is_decoder_init_failure() {
        let (camera, backend) = camera();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = ScanSession::new(Tab::Barcode, ScanMode::Decode(vec![]), camera, tx);

        assert_eq!(
            session.start("cam"),
            SessionState::Error(ScanError::DecoderInitFailed)
        );
        assert_eq!(backend.streams_opened(), 0);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (camera, backend) = camera();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = ScanSession::new(Tab::Ingredients, ScanMode::snapshot(), camera, tx);

        assert_eq!(session.start("cam"), SessionState::Active);
        assert_eq!(session.start("cam"), SessionState::Active);
        assert_eq!(backend.streams_opened(), 1);
    }

    #[test]
    fn test_missing_device_is_unavailable() {
        let (camera, _) = camera();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = ScanSession::new(Tab::Ingredients, ScanMode::snapshot(), camera, tx);
        assert_eq!(
            session.start("other"),
            SessionState::Error(ScanError::DeviceUnavailable)
        );
    }

    #[test]
    fn test_snapshot_capture_releases_stream() {
        let (camera, backend) = camera();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = ScanSession::new(Tab::Ingredients, ScanMode::snapshot(), camera, tx);
        session.start("cam");
        assert!(session.preview_frame().is_some());

        let result = session.capture().unwrap();
        let ScanResult::Captured { image_bytes } = result else {
            panic!("expected a captured image");
        };
        assert!(!image_bytes.is_empty());
        assert_eq!(session.state(), SessionState::Captured);
        assert_eq!(backend.live_streams(), 0);
        assert_eq!(session.capture(), Err(CaptureError::NotActive));

        drop(session);
        assert_eq!(backend.streams_stopped(), 1);
        assert_eq!(backend.double_stops(), 0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (camera, backend) = camera();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = ScanSession::new(Tab::Ingredients, ScanMode::snapshot(), camera, tx);
        session.start("cam");

        session.cancel();
        session.cancel();
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.preview_frame().is_none());
        assert_eq!(backend.streams_stopped(), 1);
        assert_eq!(backend.double_stops(), 0);
    }
}
