// SPDX-License-Identifier: GPL-3.0-only

//! Application core for the scanner
//!
//! The app is a message-driven state machine independent of any UI toolkit.
//! Front ends feed it [`Message`]s and carry out the [`Effect`]s it returns;
//! camera sessions report back through the session event channel.
//!
//! # Architecture
//!
//! - `tab`: Tabs and camera teardown on tab change
//! - `state`: Per-tab result slots
//! - `presenter`: Pure tab state to [`View`] rendering
//! - `update`: Message dispatcher
//! - `handlers`: Message handlers grouped by concern

mod handlers;
pub mod presenter;
pub mod state;
pub mod tab;
mod update;

pub use presenter::{ActionHint, Line, Presentation, View};
pub use state::{BarcodeTab, EarthquakeTab, IngredientsTab, ResultSlot};
pub use tab::{SessionSlots, Tab, TabController};

use crate::backends::camera::{CameraDevice, CameraFrame, CameraManager, default_camera};
use crate::config::{AppTheme, Config, PreferenceStore, Preferences};
use crate::lookup::{LookupClient, LookupError, LookupRequest, LookupResponse};
use crate::scanner::{ScanError, ScanMode, SessionEvent, SessionState};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Identifies one lookup request of one tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub tab: Tab,
    pub seq: u64,
}

/// Work the front end must carry out on the app's behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Submit `request`, then send back [`Message::LookupDone`] with `ticket`
    Lookup {
        ticket: Ticket,
        request: LookupRequest,
    },
}

impl Effect {
    /// Run the effect on `runtime`; the outcome is sent on `done`
    pub fn spawn(
        self,
        runtime: &tokio::runtime::Handle,
        client: &LookupClient,
        done: UnboundedSender<Message>,
    ) {
        match self {
            Effect::Lookup { ticket, request } => {
                let client = client.clone();
                debug!(tab = %ticket.tab, seq = ticket.seq, kind = request.kind(), "Dispatching lookup");
                runtime.spawn(async move {
                    let result = client.submit(request).await;
                    // The receiver is gone only when the app is shutting down
                    let _ = done.send(Message::LookupDone { ticket, result });
                });
            }
        }
    }
}

/// Everything the app reacts to
#[derive(Debug, Clone)]
pub enum Message {
    // ===== Navigation =====
    SelectTab(Tab),
    NextTab,

    // ===== Scanning =====
    /// Primary action of the active tab
    StartScan,
    /// Take the still on the ingredients tab
    Capture,
    Retry,
    /// Earthquake feed refresh, bypassing the service cache
    Refresh,
    CancelScan,

    // ===== Preferences =====
    NextLanguage,
    SetLanguage(String),
    ToggleTheme,

    // ===== Camera =====
    NextCamera,
    SelectCamera(usize),
    RefreshCameras,

    // ===== Earthquake list =====
    ToggleQuake(usize),

    // ===== Asynchronous completions =====
    Session(SessionEvent),
    LookupDone {
        ticket: Ticket,
        result: Result<LookupResponse, LookupError>,
    },
}

/// Application state
pub struct App {
    config: Config,
    prefs: Preferences,
    store: Option<PreferenceStore>,
    camera: CameraManager,
    cameras: Vec<CameraDevice>,
    selected_camera: Option<usize>,
    /// Why enumeration produced no cameras, if it failed
    enumeration_error: Option<ScanError>,
    barcode_mode: ScanMode,
    tabs: TabController,
    sessions: SessionSlots,
    session_events: UnboundedSender<SessionEvent>,
    pub barcode: BarcodeTab,
    pub ingredients: IngredientsTab,
    pub earthquake: EarthquakeTab,
}

impl App {
    /// Create the app; the receiver carries session events for [`Message::Session`]
    pub fn new(
        config: Config,
        prefs: Preferences,
        store: Option<PreferenceStore>,
        camera: CameraManager,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (session_events, session_rx) = mpsc::unbounded_channel();
        let mut app = Self {
            config,
            prefs,
            store,
            tabs: TabController::new(camera.clone()),
            camera,
            cameras: Vec::new(),
            selected_camera: None,
            enumeration_error: None,
            barcode_mode: ScanMode::barcode(),
            sessions: SessionSlots::default(),
            session_events,
            barcode: BarcodeTab::default(),
            ingredients: IngredientsTab::default(),
            earthquake: EarthquakeTab::default(),
        };
        app.enumerate_cameras(None);
        (app, session_rx)
    }

    /// Replace the decoder used by barcode sessions
    pub fn set_barcode_mode(&mut self, mode: ScanMode) {
        self.barcode_mode = mode;
    }

    /// Run the entry actions of the initial tab
    pub fn start(&mut self) -> Vec<Effect> {
        info!(tab = %self.active_tab(), cameras = self.cameras.len(), "Application started");
        self.enter_tab(self.active_tab())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn language(&self) -> &str {
        &self.prefs.language
    }

    pub fn theme(&self) -> AppTheme {
        self.prefs.theme
    }

    pub fn active_tab(&self) -> Tab {
        self.tabs.active()
    }

    pub fn cameras(&self) -> &[CameraDevice] {
        &self.cameras
    }

    pub fn selected_camera(&self) -> Option<&CameraDevice> {
        self.selected_camera.and_then(|i| self.cameras.get(i))
    }

    pub fn camera_manager(&self) -> &CameraManager {
        &self.camera
    }

    /// State of the session held by `tab`, if any
    pub fn session_state(&self, tab: Tab) -> Option<SessionState> {
        self.sessions.get(tab).map(|session| session.state())
    }

    /// Whether `tab` has a live camera session
    pub fn is_scanning(&self, tab: Tab) -> bool {
        self.session_state(tab) == Some(SessionState::Active)
    }

    /// Newest camera frame of the active tab's session
    pub fn preview_frame(&self) -> Option<Arc<CameraFrame>> {
        self.sessions.get(self.active_tab())?.preview_frame()
    }

    /// Render the active tab
    pub fn view(&self, today: NaiveDate) -> View {
        let language = self.language();
        match self.active_tab() {
            Tab::Barcode => {
                presenter::render_barcode(&self.barcode, self.is_scanning(Tab::Barcode), language, today)
            }
            Tab::Ingredients => presenter::render_ingredients(
                &self.ingredients,
                self.is_scanning(Tab::Ingredients),
                language,
                today,
            ),
            Tab::Earthquake => presenter::render_earthquakes(&self.earthquake, language),
        }
    }

    /// Re-read the camera list, keeping `keep` selected if it is still present
    fn enumerate_cameras(&mut self, keep: Option<String>) {
        match self.camera.list_cameras() {
            Ok(cameras) => {
                self.enumeration_error = None;
                self.cameras = cameras;
            }
            Err(e) => {
                warn!(error = %e, "Camera enumeration failed");
                self.enumeration_error = Some(ScanError::from(&e));
                self.cameras.clear();
            }
        }

        self.selected_camera = keep
            .and_then(|id| self.cameras.iter().position(|c| c.id == id))
            .or_else(|| {
                let default = default_camera(&self.cameras)?;
                self.cameras.iter().position(|c| c.id == default.id)
            });

        if let Some(camera) = self.selected_camera() {
            info!(count = self.cameras.len(), selected = %camera.label, "Cameras enumerated");
        }
    }

    fn persist_preferences(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(&self.prefs) {
            warn!(error = %e, "Failed to save preferences");
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        for tab in Tab::ALL {
            self.sessions.teardown(tab);
        }
        self.camera.release_all();
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("active_tab", &self.active_tab())
            .field("language", &self.prefs.language)
            .field("cameras", &self.cameras.len())
            .field("selected_camera", &self.selected_camera)
            .field("sessions", &self.sessions)
            .finish()
    }
}
