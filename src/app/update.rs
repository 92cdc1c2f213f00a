// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` only dispatches; the handlers live in `handlers`, grouped by
//! concern:
//!
//! - `handlers::camera`: Camera selection, session start and teardown
//! - `handlers::capture`: Scan actions and session events
//! - `handlers::system`: Preferences, lookups and the earthquake list

use super::{App, Effect, Message};
use tracing::trace;

impl App {
    /// Apply `message`; returns the effects the front end must run
    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        trace!(?message, "update");
        match message {
            // ===== Navigation =====
            Message::SelectTab(tab) => self.handle_select_tab(tab),
            Message::NextTab => self.handle_select_tab(self.active_tab().next()),

            // ===== Scanning =====
            Message::StartScan => self.handle_start_scan(),
            Message::Capture => self.handle_capture(),
            Message::Retry => self.handle_retry(),
            Message::Refresh => self.handle_refresh(),
            Message::CancelScan => self.handle_cancel_scan(),

            // ===== Preferences =====
            Message::NextLanguage => {
                let next = crate::constants::next_language(self.language());
                self.handle_set_language(next.to_string())
            }
            Message::SetLanguage(code) => self.handle_set_language(code),
            Message::ToggleTheme => self.handle_toggle_theme(),

            // ===== Camera =====
            Message::NextCamera => self.handle_next_camera(),
            Message::SelectCamera(index) => self.handle_select_camera(index),
            Message::RefreshCameras => self.handle_refresh_cameras(),

            // ===== Earthquake list =====
            Message::ToggleQuake(index) => {
                self.earthquake.toggle(index);
                Vec::new()
            }

            // ===== Asynchronous completions =====
            Message::Session(event) => self.handle_session_event(event),
            Message::LookupDone { ticket, result } => self.handle_lookup_done(ticket, result),
        }
    }
}
