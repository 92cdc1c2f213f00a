// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Default lookup service
pub const DEFAULT_API_BASE_URL: &str = "https://apishop.mohil.dev";

/// Upper bound on decode attempts per second
pub const MAX_DECODE_FPS: u32 = 10;

/// Side of the square still sent for ingredient analysis
pub const SNAPSHOT_SIZE: u32 = 640;

/// Default HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Terminal redraw and event poll interval
pub const UI_TICK: Duration = Duration::from_millis(50);

pub const PRODUCT_FETCH_FAILED: &str = "Failed to fetch product";
pub const INGREDIENTS_ANALYSIS_FAILED: &str = "Failed to analyze ingredients";
pub const EARTHQUAKE_FETCH_FAILED: &str = "Failed to fetch earthquake data";
pub const CAMERA_ACCESS_FAILED: &str = "Failed to access camera. Please check permissions.";

/// Default output language
pub const DEFAULT_LANGUAGE: &str = "en";

/// A selectable output language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

const fn lang(code: &'static str, name: &'static str) -> Language {
    Language { code, name }
}

/// Languages offered by the service, in menu order
pub const LANGUAGES: [Language; 38] = [
    lang("ar", "Arabic"),
    lang("bn", "Bengali"),
    lang("bg", "Bulgarian"),
    lang("zh", "Chinese"),
    lang("hr", "Croatian"),
    lang("cs", "Czech"),
    lang("da", "Danish"),
    lang("nl", "Dutch"),
    lang("en", "English"),
    lang("et", "Estonian"),
    lang("fi", "Finnish"),
    lang("fr", "French"),
    lang("de", "German"),
    lang("el", "Greek"),
    lang("iw", "Hebrew"),
    lang("hi", "Hindi"),
    lang("hu", "Hungarian"),
    lang("id", "Indonesian"),
    lang("it", "Italian"),
    lang("ja", "Japanese"),
    lang("ko", "Korean"),
    lang("lv", "Latvian"),
    lang("lt", "Lithuanian"),
    lang("no", "Norwegian"),
    lang("pl", "Polish"),
    lang("pt", "Portuguese"),
    lang("ro", "Romanian"),
    lang("ru", "Russian"),
    lang("sr", "Serbian"),
    lang("sk", "Slovak"),
    lang("sl", "Slovenian"),
    lang("es", "Spanish"),
    lang("sw", "Swahili"),
    lang("sv", "Swedish"),
    lang("th", "Thai"),
    lang("tr", "Turkish"),
    lang("uk", "Ukrainian"),
    lang("vi", "Vietnamese"),
];

/// Look up a language by code
pub fn language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code == code)
}

/// Display name for `code`, falling back to the code itself
pub fn language_name(code: &str) -> &str {
    language(code).map(|l| l.name).unwrap_or(code)
}

/// The language after `code` in menu order, wrapping around
pub fn next_language(code: &str) -> &'static str {
    let index = LANGUAGES
        .iter()
        .position(|l| l.code == code)
        .map(|i| (i + 1) % LANGUAGES.len())
        .unwrap_or(0);
    LANGUAGES[index].code
}

/// Application version (git-derived)
pub fn app_info() -> String {
    format!("scan-japan {}", env!("GIT_VERSION"))
}
