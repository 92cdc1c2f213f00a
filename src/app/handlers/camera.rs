// SPDX-License-Identifier: GPL-3.0-only

//! Camera handlers
//!
//! Tab switching, camera selection and the lifecycle of the per-tab scan
//! sessions. Any session is torn down before its replacement starts.

use crate::app::{App, Effect, Tab};
use crate::scanner::{ScanError, ScanMode, ScanSession, SessionState};
use tracing::{debug, info, warn};

impl App {
    // =========================================================================
    // Tabs
    // =========================================================================

    pub(crate) fn handle_select_tab(&mut self, tab: Tab) -> Vec<Effect> {
        if !self.tabs.select(tab, &mut self.sessions) {
            return Vec::new();
        }
        self.enter_tab(tab)
    }

    /// Entry actions of `tab`
    pub(crate) fn enter_tab(&mut self, tab: Tab) -> Vec<Effect> {
        match tab {
            Tab::Barcode => {
                // Auto-start only when there is nothing to show
                if self.config.auto_start_decode && self.barcode.result.is_idle() {
                    self.start_session(Tab::Barcode);
                }
                Vec::new()
            }
            Tab::Ingredients => Vec::new(),
            Tab::Earthquake => {
                if self.earthquake.result.data().is_none() && !self.earthquake.result.is_loading() {
                    self.fetch_earthquakes(false)
                } else {
                    Vec::new()
                }
            }
        }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    fn scan_mode(&self, tab: Tab) -> Option<ScanMode> {
        match tab {
            Tab::Barcode => Some(self.barcode_mode.clone()),
            Tab::Ingredients => Some(ScanMode::Snapshot {
                size: self.config.snapshot_size,
            }),
            Tab::Earthquake => None,
        }
    }

    /// Start a fresh camera session for `tab` on the selected camera
    ///
    /// Failures are shown in the tab's result slot.
    pub(crate) fn start_session(&mut self, tab: Tab) {
        let Some(mode) = self.scan_mode(tab) else {
            return;
        };
        if self.sessions.teardown(tab) {
            debug!(tab = %tab, "Replaced previous scan session");
        }

        let Some(device_id) = self.selected_camera().map(|c| c.id.clone()) else {
            let reason = self.enumeration_error.unwrap_or(ScanError::DeviceUnavailable);
            warn!(tab = %tab, %reason, "No camera to scan with");
            self.fail_tab(tab, reason.to_string());
            return;
        };

        let mut session = ScanSession::new(tab, mode, self.camera.clone(), self.session_events.clone())
            .with_decode_fps(self.config.decode_fps);

        match session.start(&device_id) {
            SessionState::Active => {
                info!(tab = %tab, session = session.id(), device = %device_id, "Scan session active");
                self.sessions.replace(tab, session);
            }
            SessionState::Error(reason) => {
                warn!(tab = %tab, device = %device_id, %reason, "Scan session failed to start");
                if reason == ScanError::DeviceUnavailable {
                    // Stale device id; the next attempt uses the fresh default
                    self.enumerate_cameras(Some(device_id));
                }
                self.fail_tab(tab, reason.to_string());
            }
            state => {
                debug!(tab = %tab, ?state, "Scan session ended while starting");
            }
        }
    }

    fn fail_tab(&mut self, tab: Tab, message: String) {
        match tab {
            Tab::Barcode => self.barcode.result.fail(message),
            Tab::Ingredients => self.ingredients.result.fail(message),
            Tab::Earthquake => self.earthquake.result.fail(message),
        }
    }

    /// Restart the active tab's session if it is live, e.g. on camera change
    fn restart_active_session(&mut self) {
        let tab = self.active_tab();
        if self.is_scanning(tab) {
            info!(tab = %tab, "Restarting scan session on new camera");
            self.start_session(tab);
        }
    }

    // =========================================================================
    // Camera selection
    // =========================================================================

    pub(crate) fn handle_next_camera(&mut self) -> Vec<Effect> {
        if self.cameras.len() < 2 {
            debug!("Only one camera available, cannot switch");
            return Vec::new();
        }
        let next = self.selected_camera.map_or(0, |i| (i + 1) % self.cameras.len());
        self.handle_select_camera(next)
    }

    pub(crate) fn handle_select_camera(&mut self, index: usize) -> Vec<Effect> {
        if index >= self.cameras.len() {
            warn!(index, count = self.cameras.len(), "Camera index out of range");
            return Vec::new();
        }
        if self.selected_camera == Some(index) {
            return Vec::new();
        }

        self.selected_camera = Some(index);
        info!(camera = %self.cameras[index].label, "Selected camera");
        self.restart_active_session();
        Vec::new()
    }

    pub(crate) fn handle_refresh_cameras(&mut self) -> Vec<Effect> {
        let keep = self.selected_camera().map(|c| c.id.clone());
        self.enumerate_cameras(keep.clone());

        if self.selected_camera().map(|c| &c.id) != keep.as_ref() {
            self.restart_active_session();
        }
        Vec::new()
    }
}
