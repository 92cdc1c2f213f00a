// SPDX-License-Identifier: GPL-3.0-only

//! Top-level tabs and camera teardown on tab change

use crate::backends::camera::CameraManager;
use crate::scanner::ScanSession;
use tracing::{debug, info};

/// Top-level tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Barcode,
    Ingredients,
    Earthquake,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Barcode, Tab::Ingredients, Tab::Earthquake];

    pub fn index(self) -> usize {
        match self {
            Tab::Barcode => 0,
            Tab::Ingredients => 1,
            Tab::Earthquake => 2,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::Barcode => "BARCODE",
            Tab::Ingredients => "INGREDIENTS",
            Tab::Earthquake => "EARTHQUAKE",
        }
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    /// Whether the tab uses the camera at all
    pub fn uses_camera(self) -> bool {
        self != Tab::Earthquake
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tab::Barcode => "barcode",
            Tab::Ingredients => "ingredients",
            Tab::Earthquake => "earthquake",
        };
        f.write_str(name)
    }
}

/// Scan session slot per tab
#[derive(Debug, Default)]
pub struct SessionSlots {
    slots: [Option<ScanSession>; 3],
}

impl SessionSlots {
    pub fn get(&self, tab: Tab) -> Option<&ScanSession> {
        self.slots[tab.index()].as_ref()
    }

    pub fn get_mut(&mut self, tab: Tab) -> Option<&mut ScanSession> {
        self.slots[tab.index()].as_mut()
    }

    /// Install a session for `tab`, cancelling the one it replaces
    pub fn replace(&mut self, tab: Tab, session: ScanSession) {
        if let Some(mut previous) = self.slots[tab.index()].replace(session) {
            previous.cancel();
        }
    }

    /// Cancel and drop the session of `tab`; true if there was one
    pub fn teardown(&mut self, tab: Tab) -> bool {
        match self.slots[tab.index()].take() {
            Some(mut session) => {
                session.cancel();
                true
            }
            None => false,
        }
    }
}

/// Holds the active tab and enforces camera teardown before a switch
#[derive(Debug)]
pub struct TabController {
    active: Tab,
    camera: CameraManager,
}

impl TabController {
    pub fn new(camera: CameraManager) -> Self {
        Self {
            active: Tab::default(),
            camera,
        }
    }

    pub fn active(&self) -> Tab {
        self.active
    }

    /// Switch to `tab`
    ///
    /// Every other tab's session is cancelled and any stream they still own is
    /// released before the switch takes effect. Returns false when `tab` is
    /// already active.
    pub fn select(&mut self, tab: Tab, sessions: &mut SessionSlots) -> bool {
        if tab == self.active {
            return false;
        }

        for other in Tab::ALL.into_iter().filter(|t| *t != tab) {
            if sessions.teardown(other) {
                debug!(tab = %other, "Tore down scan session");
            }
            self.camera.release_owner(other);
        }

        info!(from = %self.active, to = %tab, "Switching tab");
        self.active = tab;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_cycle() {
        assert_eq!(Tab::Barcode.next(), Tab::Ingredients);
        assert_eq!(Tab::Ingredients.next(), Tab::Earthquake);
        assert_eq!(Tab::Earthquake.next(), Tab::Barcode);
    }

    #[test]
    fn test_tab_names() {
        assert_eq!(Tab::Ingredients.to_string(), "ingredients");
        assert_eq!(Tab::Earthquake.title(), "EARTHQUAKE");
        assert!(!Tab::Earthquake.uses_camera());
    }
}
