// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Scanning a barcode and looking the product up
//! - Analysing an ingredient label
//! - Showing the earthquake feed
//! - Reading and changing saved preferences

use scan_japan::app::presenter::{self, Line, View};
use scan_japan::app::state::{BarcodeTab, EarthquakeTab, IngredientsTab};
use scan_japan::app::Tab;
use scan_japan::backends::camera::{CameraBackend, CameraManager, default_camera, get_backend};
use scan_japan::backends::virtual_camera::VirtualBackend;
use scan_japan::config::{AppTheme, Config, PreferenceStore, Preferences};
use scan_japan::constants::{language, language_name};
use scan_japan::errors::AppResult;
use scan_japan::lookup::LookupClient;
use scan_japan::scanner::{
    CaptureError, ScanMode, ScanResult, ScanSession, SessionEventKind, SessionState,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Camera warm-up before a still is taken
const WARMUP: Duration = Duration::from_millis(500);
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// List all available cameras
pub fn list_cameras() -> AppResult<()> {
    let manager = CameraManager::new(get_backend());
    let cameras = manager.list_cameras()?;

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let default_id = default_camera(&cameras).map(|c| c.id.clone());
    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let marker = if Some(&camera.id) == default_id.as_ref() {
            " (default)"
        } else {
            ""
        };
        println!("  [{}] {}{}", index, camera.label, marker);
        println!("      Device: {}", camera.id);
    }

    Ok(())
}

/// Scan one barcode from a camera or a still image
pub fn scan_barcode(
    config: &Config,
    camera_index: Option<usize>,
    image: Option<PathBuf>,
    wait: Duration,
    lookup: bool,
) -> AppResult<()> {
    let manager = CameraManager::new(open_backend(image)?);
    let device_id = pick_camera(&manager, camera_index)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = ScanSession::new(Tab::Barcode, ScanMode::barcode(), manager, tx)
        .with_decode_fps(config.decode_fps);
    if let SessionState::Error(reason) = session.start(&device_id) {
        return Err(reason.into());
    }

    println!("Scanning... (press Ctrl+C to stop)");
    let stop_flag = install_stop_handler()?;
    let start = Instant::now();

    let code = loop {
        if stop_flag.load(Ordering::SeqCst) {
            session.cancel();
            return Err("Scan cancelled".into());
        }
        if start.elapsed() > wait {
            session.cancel();
            return Err("No barcode found".into());
        }

        match rx.try_recv() {
            Ok(event) => match event.kind {
                SessionEventKind::Decoded(ScanResult::Decoded { text }) => break text,
                SessionEventKind::Decoded(_) => continue,
                SessionEventKind::Superseded => return Err("Camera was taken over".into()),
            },
            Err(_) => std::thread::sleep(POLL_INTERVAL),
        }
    };

    println!("Scanned code: {}", code);
    if lookup {
        lookup_product(config, &code)?;
    }
    Ok(())
}

/// Look up a product and print it
pub fn lookup_product(config: &Config, code: &str) -> AppResult<()> {
    let client = LookupClient::new(&config.api_base_url, config.request_timeout)?;
    let prefs = load_preferences();

    let rt = tokio::runtime::Runtime::new()?;
    let product = rt.block_on(client.product(code, &prefs.language))?;

    let mut tab = BarcodeTab::default();
    let seq = tab.result.begin();
    tab.scanned_code = Some(code.to_string());
    tab.result.complete(seq, Ok(product));

    print_view(&presenter::render_barcode(
        &tab,
        false,
        &prefs.language,
        chrono::Local::now().date_naive(),
    ));
    Ok(())
}

/// Capture an ingredient label and print the analysis
pub fn analyze_ingredients(
    config: &Config,
    camera_index: Option<usize>,
    image: Option<PathBuf>,
) -> AppResult<()> {
    let client = LookupClient::new(&config.api_base_url, config.request_timeout)?;
    let prefs = load_preferences();

    let manager = CameraManager::new(open_backend(image)?);
    let device_id = pick_camera(&manager, camera_index)?;

    let (tx, _rx) = mpsc::unbounded_channel();
    let mode = ScanMode::Snapshot {
        size: config.snapshot_size,
    };
    let mut session = ScanSession::new(Tab::Ingredients, mode, manager, tx);
    if let SessionState::Error(reason) = session.start(&device_id) {
        return Err(reason.into());
    }

    println!("Capturing...");
    let start = Instant::now();
    std::thread::sleep(WARMUP);
    let image_bytes = loop {
        match session.capture() {
            Ok(ScanResult::Captured { image_bytes }) => break image_bytes,
            Ok(ScanResult::Decoded { .. }) => return Err("Unexpected decode result".into()),
            Err(CaptureError::NoFrame) if start.elapsed() < CAPTURE_TIMEOUT => {
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(e.into()),
        }
    };
    println!("Analysing {} bytes...", image_bytes.len());

    let rt = tokio::runtime::Runtime::new()?;
    let info = rt.block_on(client.ingredients(image_bytes, &prefs.language))?;

    let mut tab = IngredientsTab::default();
    let seq = tab.result.begin();
    tab.result.complete(seq, Ok(info));
    print_view(&presenter::render_ingredients(
        &tab,
        false,
        &prefs.language,
        chrono::Local::now().date_naive(),
    ));
    Ok(())
}

/// Fetch and print the earthquake feed, with every entry expanded
pub fn show_earthquakes(config: &Config, force: bool) -> AppResult<()> {
    let client = LookupClient::new(&config.api_base_url, config.request_timeout)?;
    let prefs = load_preferences();

    let rt = tokio::runtime::Runtime::new()?;
    let feed = rt.block_on(client.earthquakes(&prefs.language, force))?;

    let mut tab = EarthquakeTab::default();
    tab.expanded = (0..presenter::merge_quakes(&feed).len()).collect();
    let seq = tab.result.begin();
    tab.result.complete(seq, Ok(feed));

    print_view(&presenter::render_earthquakes(&tab, &prefs.language));
    Ok(())
}

/// Print saved preferences, applying any changes first
pub fn preferences(
    new_language: Option<String>,
    new_theme: Option<AppTheme>,
) -> AppResult<()> {
    let store = PreferenceStore::default_location()?;
    let mut prefs = store.try_load()?;

    let changed = new_language.is_some() || new_theme.is_some();
    if let Some(code) = new_language {
        if language(&code).is_none() {
            return Err(format!("Unknown language: {}", code).into());
        }
        prefs.language = code;
    }
    if let Some(theme) = new_theme {
        prefs.theme = theme;
    }
    if changed {
        store.save(&prefs)?;
    }

    println!("Preferences: {}", store.path().display());
    println!("  Language: {} ({})", language_name(&prefs.language), prefs.language);
    println!("  Theme:    {:?}", prefs.theme);
    Ok(())
}

fn open_backend(image: Option<PathBuf>) -> AppResult<Arc<dyn CameraBackend>> {
    match image {
        Some(path) => Ok(Arc::new(VirtualBackend::from_image_files(&[path])?)),
        None => Ok(get_backend()),
    }
}

/// Device id of the camera at `index`, or of the default camera
fn pick_camera(
    manager: &CameraManager,
    index: Option<usize>,
) -> AppResult<String> {
    let cameras = manager.list_cameras()?;
    if cameras.is_empty() {
        return Err("No cameras found".into());
    }

    let camera = match index {
        Some(index) => cameras.get(index).ok_or_else(|| {
            format!("Camera index {} out of range (0-{})", index, cameras.len() - 1)
        })?,
        None => default_camera(&cameras).ok_or("No cameras found")?,
    };
    println!("Using camera: {}", camera.label);
    Ok(camera.id.clone())
}

fn load_preferences() -> Preferences {
    PreferenceStore::default_location()
        .map(|store| store.load())
        .unwrap_or_default()
}

fn install_stop_handler() -> AppResult<Arc<AtomicBool>> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| format!("Failed to set Ctrl+C handler: {}", e))?;
    Ok(stop_flag)
}

/// Plain-text rendering of a view
fn print_view(view: &View) {
    for line in &view.body {
        match line {
            Line::Heading(text) => println!("{}", text),
            Line::Text(text) => println!("  {}", text),
            Line::Field { label, value } => println!("  {}: {}", label, value),
            Line::Badge { label, on } => println!("  {}: {}", label, presenter::badge_text(*on)),
            Line::Bullet { depth, text } => {
                println!("  {}- {}", "  ".repeat(*depth as usize), text)
            }
            Line::Warning(text) => println!("  ! {}", text),
            Line::Entry { title, .. } => println!("{}", title),
            Line::Blank => println!(),
        }
    }
    if view.body.is_empty() {
        println!("{}", view.message);
    }
}
