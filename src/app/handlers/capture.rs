// SPDX-License-Identifier: GPL-3.0-only

//! Scan action handlers
//!
//! Start, capture, retry and cancel, plus the events camera sessions send
//! back. Each finished scan becomes a lookup effect carrying a fresh ticket.

use crate::app::{App, Effect, Tab, Ticket};
use crate::lookup::LookupRequest;
use crate::scanner::{CaptureError, ScanResult, SessionEvent, SessionEventKind};
use tracing::{debug, info, warn};

impl App {
    pub(crate) fn handle_start_scan(&mut self) -> Vec<Effect> {
        match self.active_tab() {
            Tab::Barcode => {
                self.barcode.result.reset();
                self.barcode.scanned_code = None;
                self.start_session(Tab::Barcode);
                Vec::new()
            }
            Tab::Ingredients => {
                if self.is_scanning(Tab::Ingredients) {
                    // Camera already open: the primary action takes the picture
                    return self.handle_capture();
                }
                self.ingredients.result.reset();
                self.start_session(Tab::Ingredients);
                Vec::new()
            }
            Tab::Earthquake => self.fetch_earthquakes(false),
        }
    }

    pub(crate) fn handle_retry(&mut self) -> Vec<Effect> {
        match self.active_tab() {
            Tab::Barcode | Tab::Ingredients => {
                self.handle_cancel_scan();
                self.handle_start_scan()
            }
            Tab::Earthquake => self.fetch_earthquakes(false),
        }
    }

    pub(crate) fn handle_cancel_scan(&mut self) -> Vec<Effect> {
        let tab = self.active_tab();
        if self.sessions.teardown(tab) {
            info!(tab = %tab, "Scan cancelled");
        }
        Vec::new()
    }

    pub(crate) fn handle_capture(&mut self) -> Vec<Effect> {
        if self.active_tab() != Tab::Ingredients {
            return Vec::new();
        }
        let Some(session) = self.sessions.get_mut(Tab::Ingredients) else {
            debug!("Capture requested without an open camera");
            return Vec::new();
        };

        let image = match session.capture() {
            Ok(ScanResult::Captured { image_bytes }) => image_bytes,
            Ok(ScanResult::Decoded { .. }) => return Vec::new(),
            Err(CaptureError::NoFrame) => {
                debug!("No frame to capture yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Capture failed");
                self.sessions.teardown(Tab::Ingredients);
                self.ingredients.result.fail(e.to_string());
                return Vec::new();
            }
        };
        self.sessions.teardown(Tab::Ingredients);

        let seq = self.ingredients.result.begin();
        vec![Effect::Lookup {
            ticket: Ticket {
                tab: Tab::Ingredients,
                seq,
            },
            request: LookupRequest::Ingredients {
                image,
                language: self.prefs.language.clone(),
            },
        }]
    }

    pub(crate) fn handle_session_event(&mut self, event: SessionEvent) -> Vec<Effect> {
        let current = self.sessions.get(event.owner).map(|s| s.id());
        if current != Some(event.session_id) {
            debug!(session = event.session_id, owner = %event.owner, "Ignoring event from ended session");
            return Vec::new();
        }

        match event.kind {
            SessionEventKind::Decoded(ScanResult::Decoded { text }) if event.owner == Tab::Barcode => {
                self.sessions.teardown(Tab::Barcode);
                info!(code = %text, "Barcode scanned");

                let seq = self.barcode.result.begin();
                self.barcode.scanned_code = Some(text.clone());
                vec![Effect::Lookup {
                    ticket: Ticket {
                        tab: Tab::Barcode,
                        seq,
                    },
                    request: LookupRequest::Barcode {
                        code: text,
                        language: self.prefs.language.clone(),
                    },
                }]
            }
            SessionEventKind::Decoded(result) => {
                warn!(owner = %event.owner, ?result, "Unexpected scan result");
                Vec::new()
            }
            SessionEventKind::Superseded => {
                debug!(owner = %event.owner, "Scan session lost the camera");
                self.sessions.teardown(event.owner);
                Vec::new()
            }
        }
    }
}
