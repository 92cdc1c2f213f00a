// SPDX-License-Identifier: MPL-2.0

//! Scan Japan - camera barcode, ingredient-label and earthquake-feed scanner
//!
//! This library provides the core of the `scan-japan` terminal application:
//! camera access, barcode decoding, still capture and the lookup service
//! client, tied together by a message-driven application core.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Tabs, result state, message handling and presentation
//! - [`backends`]: Camera backend abstraction (V4L2 and virtual)
//! - [`scanner`]: Scan sessions, symbol decoding and snapshots
//! - [`lookup`]: HTTP client for the product, ingredient and earthquake service
//! - [`config`]: Runtime configuration and persisted preferences
//! - [`terminal`]: ratatui front end
//!
//! # Example
//!
//! ```ignore
//! // Interactive use, typically run via:
//! // scan-japan
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod lookup;
pub mod scanner;
pub mod terminal;

// Re-export commonly used types
pub use app::{App, Effect, Message, Tab};
pub use config::{AppTheme, Config, PreferenceStore, Preferences};
pub use errors::{AppError, AppResult};
pub use lookup::{LookupClient, LookupError};
pub use scanner::{ScanMode, ScanSession, SessionState};
