// SPDX-License-Identifier: GPL-3.0-only

//! Result presentation
//!
//! Pure functions from tab state to a [`View`]. Nothing here touches the
//! camera, the network or the clock; callers pass in today's date.

use super::state::{BarcodeTab, EarthquakeTab, IngredientsTab, ResultSlot};
use crate::constants::language_name;
use crate::lookup::{DisplayValue, EarthquakeFeed, IngredientsInfo, ProductInfo, ReviewSummary};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// What a result slot should show, highest precedence first
#[derive(Debug, PartialEq)]
pub enum Presentation<'a, T> {
    Loading,
    Error(&'a str),
    Data(&'a T),
    Idle,
}

pub fn present<T>(slot: &ResultSlot<T>) -> Presentation<'_, T> {
    if slot.is_loading() {
        Presentation::Loading
    } else if let Some(error) = slot.error() {
        Presentation::Error(error)
    } else if let Some(data) = slot.data() {
        Presentation::Data(data)
    } else {
        Presentation::Idle
    }
}

/// The action offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionHint {
    InitiateScan,
    ScanAgain,
    TakePicture,
    CaptureImage,
    TryAgain,
    AnalyzeAgain,
    Refresh,
}

impl ActionHint {
    pub fn label(self) -> &'static str {
        match self {
            ActionHint::InitiateScan => "INITIATE SCAN",
            ActionHint::ScanAgain => "SCAN AGAIN",
            ActionHint::TakePicture => "TAKE PICTURE",
            ActionHint::CaptureImage => "CAPTURE IMAGE",
            ActionHint::TryAgain => "TRY AGAIN",
            ActionHint::AnalyzeAgain => "ANALYZE AGAIN",
            ActionHint::Refresh => "REFRESH",
        }
    }
}

/// One line of a rendered view
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Heading(String),
    Text(String),
    Field { label: String, value: String },
    Badge { label: String, on: bool },
    Bullet { depth: u8, text: String },
    Warning(String),
    /// Header of an expandable earthquake entry
    Entry { index: usize, expanded: bool, title: String },
    Blank,
}

impl Line {
    fn field(label: &str, value: impl ToString) -> Self {
        Line::Field {
            label: label.to_string(),
            value: value.to_string(),
        }
    }

    fn badge(label: &str, on: bool) -> Self {
        Line::Badge {
            label: label.to_string(),
            on,
        }
    }
}

/// A rendered tab
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// SYSTEM status word
    pub status: &'static str,
    /// Line under the status: the error, or a hint
    pub message: String,
    pub body: Vec<Line>,
    pub action: Option<ActionHint>,
}

/// Badge text for a boolean flag
pub fn badge_text(on: bool) -> &'static str {
    if on { "YES" } else { "NO" }
}

/// Rating with one decimal, e.g. `4.3/5.0`
pub fn format_rating(average: f64) -> String {
    format!("{:.1}/5.0", average)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateStyle {
    /// 2024/01/02
    YearFirst,
    /// Jan 2, 2024
    MonthName,
    /// 02/01/2024
    DayFirst,
}

fn date_style(language: &str) -> DateStyle {
    match language {
        "ja" | "zh" | "ko" => DateStyle::YearFirst,
        "en" => DateStyle::MonthName,
        _ => DateStyle::DayFirst,
    }
}

pub fn format_date(date: NaiveDate, language: &str) -> String {
    let pattern = match date_style(language) {
        DateStyle::YearFirst => "%Y/%m/%d",
        DateStyle::MonthName => "%b %-d, %Y",
        DateStyle::DayFirst => "%d/%m/%Y",
    };
    date.format(pattern).to_string()
}

pub fn format_datetime(datetime: NaiveDateTime, language: &str) -> String {
    let pattern = match date_style(language) {
        DateStyle::YearFirst => "%Y/%m/%d %H:%M",
        DateStyle::MonthName => "%b %-d, %Y, %H:%M",
        DateStyle::DayFirst => "%d/%m/%Y %H:%M",
    };
    datetime.format(pattern).to_string()
}

/// Parse a service timestamp; the wall-clock time is kept as sent
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.naive_local());
    }
    [
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ]
    .iter()
    .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
}

/// Timestamp for display, or the raw text when it cannot be parsed
fn display_timestamp(text: &str, language: &str) -> String {
    parse_timestamp(text)
        .map(|datetime| format_datetime(datetime, language))
        .unwrap_or_else(|| text.to_string())
}

/// Barcode tab
///
/// `scanning` is true while a decode session is live.
pub fn render_barcode(tab: &BarcodeTab, scanning: bool, language: &str, today: NaiveDate) -> View {
    let status = if tab.result.is_loading() {
        "PROCESSING"
    } else {
        "READY"
    };

    match present(&tab.result) {
        Presentation::Loading => View {
            status,
            message: "Press the button to initiate scanning".to_string(),
            body: vec![Line::Text("LOOKING UP PRODUCT...".to_string())],
            action: None,
        },
        Presentation::Error(error) => View {
            status,
            message: error.to_string(),
            body: vec![Line::Text(error.to_string())],
            action: Some(ActionHint::ScanAgain),
        },
        Presentation::Data(product) => View {
            status,
            message: "Press the button to initiate scanning".to_string(),
            body: product_lines(
                product,
                tab.scanned_code.as_deref().unwrap_or_default(),
                language,
                today,
            ),
            action: Some(ActionHint::ScanAgain),
        },
        Presentation::Idle if scanning => View {
            status,
            message: "Position barcode within the frame".to_string(),
            body: Vec::new(),
            action: None,
        },
        Presentation::Idle => View {
            status,
            message: "Press the button to initiate scanning".to_string(),
            body: Vec::new(),
            action: Some(ActionHint::InitiateScan),
        },
    }
}

fn review_line(source: &str, summary: &ReviewSummary) -> Line {
    Line::field(
        source,
        format!("{} reviews  {}", summary.count, format_rating(summary.average)),
    )
}

fn product_lines(product: &ProductInfo, code: &str, language: &str, today: NaiveDate) -> Vec<Line> {
    let mut lines = vec![
        Line::Heading("SCAN RESULT".to_string()),
        Line::Text(format_date(today, language)),
        Line::Blank,
        Line::field("Product Name", &product.name),
        Line::field("Description", &product.description),
        Line::field("Scanned Code", code),
        Line::Blank,
        Line::field("Language", language_name(language)),
    ];

    if let Some(reviews) = product.reviews.as_ref().filter(|r| !r.is_empty()) {
        lines.push(Line::Blank);
        lines.push(Line::Heading("REVIEWS".to_string()));
        if let Some(rakuten) = &reviews.rakuten {
            lines.push(review_line("Rakuten", rakuten));
        }
        if let Some(yahoo) = &reviews.yahoo {
            lines.push(review_line("Yahoo", yahoo));
        }
    }
    lines
}

/// Ingredients tab
///
/// `previewing` is true while a snapshot session shows the camera.
pub fn render_ingredients(
    tab: &IngredientsTab,
    previewing: bool,
    language: &str,
    today: NaiveDate,
) -> View {
    let status = if tab.result.is_loading() {
        "ANALYZING"
    } else {
        "READY"
    };
    let hint = "Take a picture of the ingredients label".to_string();

    match present(&tab.result) {
        Presentation::Loading => View {
            status,
            message: hint,
            body: vec![Line::Text("ANALYZING INGREDIENTS...".to_string())],
            action: None,
        },
        Presentation::Error(error) => View {
            status,
            message: error.to_string(),
            body: vec![Line::Text(error.to_string())],
            action: Some(ActionHint::TryAgain),
        },
        Presentation::Data(info) => View {
            status,
            message: hint,
            body: ingredient_lines(info, language, today),
            action: Some(ActionHint::AnalyzeAgain),
        },
        Presentation::Idle => View {
            status,
            message: hint,
            body: Vec::new(),
            action: Some(if previewing {
                ActionHint::CaptureImage
            } else {
                ActionHint::TakePicture
            }),
        },
    }
}

fn ingredient_lines(info: &IngredientsInfo, language: &str, today: NaiveDate) -> Vec<Line> {
    let mut lines = vec![
        Line::Heading("INGREDIENTS ANALYSIS".to_string()),
        Line::Text(format_date(today, language)),
        Line::Blank,
        Line::Heading("Ingredients:".to_string()),
    ];
    lines.extend(info.ingredients.iter().map(|ingredient| Line::Bullet {
        depth: 0,
        text: ingredient.clone(),
    }));
    lines.push(Line::Blank);
    lines.push(Line::badge("Vegan", info.is_vegan));
    lines.push(Line::badge("Contains Meat", info.contains_meat));
    lines.push(Line::badge("Vegetarian", info.vegetarian));
    lines.push(Line::badge("Contains Fish", info.contains_fish));

    if !info.note.is_empty() {
        lines.push(Line::Blank);
        lines.push(Line::Heading("Note:".to_string()));
        lines.push(Line::Text(info.note.clone()));
    }
    lines
}

/// Affected area with its cities
#[derive(Debug, Clone, PartialEq)]
pub struct AreaEntry {
    pub area: String,
    pub cities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionEntry {
    pub prefecture: String,
    pub areas: Vec<AreaEntry>,
}

/// A detailed or basic quake, flattened for display
#[derive(Debug, Clone, PartialEq)]
pub struct QuakeEntry {
    pub time: String,
    pub magnitude: String,
    pub location: String,
    pub coordinate: String,
    /// Only detailed reports carry intensity and regions
    pub max_intensity: Option<String>,
    pub tsunami_warning: bool,
    pub regions: Vec<RegionEntry>,
}

impl QuakeEntry {
    pub fn is_detailed(&self) -> bool {
        self.max_intensity.is_some()
    }
}

fn text(value: &DisplayValue) -> String {
    value.to_string()
}

/// Detailed and basic quakes in one list, newest first
///
/// Entries whose time cannot be parsed go last, in feed order.
pub fn merge_quakes(feed: &EarthquakeFeed) -> Vec<QuakeEntry> {
    let detailed = feed.data.detailed.iter().map(|quake| QuakeEntry {
        time: quake.time.clone(),
        magnitude: text(&quake.magnitude),
        location: text(&quake.location.code),
        coordinate: text(&quake.location.coordinate),
        max_intensity: Some(text(&quake.max_int)),
        tsunami_warning: quake.comments.has_tsunami_warning,
        regions: quake
            .regions
            .iter()
            .map(|region| RegionEntry {
                prefecture: region.prefecture.clone(),
                areas: region
                    .areas
                    .iter()
                    .map(|area| AreaEntry {
                        area: text(&area.area_code),
                        cities: area.cities.iter().map(|c| text(&c.city_code)).collect(),
                    })
                    .collect(),
            })
            .collect(),
    });
    let basic = feed.data.basic.iter().map(|quake| QuakeEntry {
        time: quake.time.clone(),
        magnitude: text(&quake.magnitude),
        location: text(&quake.location.code),
        coordinate: text(&quake.location.coordinate),
        max_intensity: None,
        tsunami_warning: quake.comments.has_tsunami_warning,
        regions: Vec::new(),
    });

    let mut entries: Vec<(Option<NaiveDateTime>, QuakeEntry)> = detailed
        .chain(basic)
        .map(|entry| (parse_timestamp(&entry.time), entry))
        .collect();
    // None sorts below Some, so reversing puts unparseable times last
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    entries.into_iter().map(|(_, entry)| entry).collect()
}

/// Earthquake tab
pub fn render_earthquakes(tab: &EarthquakeTab, language: &str) -> View {
    let status = if tab.result.is_loading() {
        "FETCHING"
    } else if tab.result.data().is_some() {
        "READY"
    } else {
        "IDLE"
    };

    let last_updated = tab
        .result
        .data()
        .and_then(|feed| feed.last_updated.as_deref())
        .map(|time| display_timestamp(time, language))
        .unwrap_or_else(|| "N/A".to_string());
    let updated_message = format!("Last updated: {}", last_updated);

    match present(&tab.result) {
        Presentation::Loading => View {
            status,
            message: updated_message,
            body: vec![Line::Text("FETCHING EARTHQUAKE DATA...".to_string())],
            action: None,
        },
        Presentation::Error(error) => View {
            status,
            message: error.to_string(),
            body: vec![Line::Text(error.to_string())],
            action: Some(ActionHint::Refresh),
        },
        Presentation::Data(feed) => View {
            status,
            message: updated_message,
            body: quake_lines(&merge_quakes(feed), tab, language),
            action: Some(ActionHint::Refresh),
        },
        Presentation::Idle => View {
            status,
            message: updated_message,
            body: Vec::new(),
            action: Some(ActionHint::Refresh),
        },
    }
}

fn quake_lines(entries: &[QuakeEntry], tab: &EarthquakeTab, language: &str) -> Vec<Line> {
    let mut lines = Vec::new();

    for (index, quake) in entries.iter().enumerate() {
        let expanded = tab.expanded.contains(&index);
        if index > 0 {
            lines.push(Line::Blank);
        }
        lines.push(Line::Entry {
            index,
            expanded,
            title: format!("EARTHQUAKE  {}", display_timestamp(&quake.time, language)),
        });
        lines.push(Line::field("Magnitude", &quake.magnitude));
        lines.push(Line::field("Location", &quake.location));
        if let Some(max_intensity) = &quake.max_intensity {
            lines.push(Line::field("Max Intensity", max_intensity));
        }
        if quake.tsunami_warning {
            lines.push(Line::Warning("Tsunami Warning Issued".to_string()));
        }

        if !expanded {
            continue;
        }
        lines.push(Line::field("Location Code", &quake.location));
        lines.push(Line::field("Coordinates", &quake.coordinate));
        if quake.is_detailed() {
            lines.push(Line::Heading("Affected Areas:".to_string()));
            for region in &quake.regions {
                lines.push(Line::Bullet {
                    depth: 0,
                    text: region.prefecture.clone(),
                });
                for area in &region.areas {
                    let text = if area.cities.is_empty() {
                        area.area.clone()
                    } else {
                        format!("{} ({})", area.area, area.cities.join(", "))
                    };
                    lines.push(Line::Bullet { depth: 1, text });
                }
            }
        }
    }
    lines
}
