// SPDX-License-Identifier: GPL-3.0-only

//! Preference and lookup handlers

use crate::app::{App, Effect, Tab, Ticket};
use crate::constants::language;
use crate::lookup::{LookupError, LookupRequest, LookupResponse};
use tracing::{debug, info, warn};

impl App {
    // =========================================================================
    // Preferences
    // =========================================================================

    pub(crate) fn handle_set_language(&mut self, code: String) -> Vec<Effect> {
        if language(&code).is_none() {
            warn!(language = %code, "Unknown language");
            return Vec::new();
        }
        if code == self.prefs.language {
            return Vec::new();
        }

        info!(from = %self.prefs.language, to = %code, "Language changed");
        self.prefs.language = code;
        self.persist_preferences();

        // The feed is translated by the service
        if self.active_tab() == Tab::Earthquake {
            self.fetch_earthquakes(false)
        } else {
            Vec::new()
        }
    }

    pub(crate) fn handle_toggle_theme(&mut self) -> Vec<Effect> {
        self.prefs.theme = self.prefs.theme.toggled();
        debug!(theme = ?self.prefs.theme, "Theme toggled");
        self.persist_preferences();
        Vec::new()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub(crate) fn handle_refresh(&mut self) -> Vec<Effect> {
        if self.active_tab() == Tab::Earthquake {
            self.fetch_earthquakes(true)
        } else {
            Vec::new()
        }
    }

    pub(crate) fn fetch_earthquakes(&mut self, force_refresh: bool) -> Vec<Effect> {
        self.earthquake.expanded.clear();
        let seq = self.earthquake.result.begin();
        vec![Effect::Lookup {
            ticket: Ticket {
                tab: Tab::Earthquake,
                seq,
            },
            request: LookupRequest::Earthquake {
                language: self.prefs.language.clone(),
                force_refresh,
            },
        }]
    }

    pub(crate) fn handle_lookup_done(
        &mut self,
        ticket: Ticket,
        result: Result<LookupResponse, LookupError>,
    ) -> Vec<Effect> {
        let result = result.map_err(|e| e.to_string());
        let applied = match (ticket.tab, result) {
            (Tab::Barcode, Ok(LookupResponse::Product(product))) => {
                self.barcode.result.complete(ticket.seq, Ok(product))
            }
            (Tab::Barcode, Err(message)) => self.barcode.result.complete(ticket.seq, Err(message)),
            (Tab::Ingredients, Ok(LookupResponse::Ingredients(info))) => {
                self.ingredients.result.complete(ticket.seq, Ok(info))
            }
            (Tab::Ingredients, Err(message)) => {
                self.ingredients.result.complete(ticket.seq, Err(message))
            }
            (Tab::Earthquake, Ok(LookupResponse::Earthquakes(feed))) => {
                self.earthquake.result.complete(ticket.seq, Ok(feed))
            }
            (Tab::Earthquake, Err(message)) => {
                self.earthquake.result.complete(ticket.seq, Err(message))
            }
            (tab, Ok(response)) => {
                warn!(tab = %tab, ?response, "Lookup response does not match its tab");
                false
            }
        };

        if !applied {
            debug!(tab = %ticket.tab, seq = ticket.seq, "Dropped superseded lookup result");
        }
        Vec::new()
    }
}
