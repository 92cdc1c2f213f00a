// SPDX-License-Identifier: GPL-3.0-only

//! Request and response types of the lookup service

use serde::{Deserialize, Serialize};

/// Review summary from one marketplace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub count: u64,
    pub average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reviews {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rakuten: Option<ReviewSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yahoo: Option<ReviewSummary>,
}

impl Reviews {
    pub fn is_empty(&self) -> bool {
        self.rakuten.is_none() && self.yahoo.is_none()
    }
}

/// Product returned by a barcode lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Reviews>,
}

/// Result of an ingredient-label analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientsInfo {
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub contains_meat: bool,
    #[serde(default)]
    pub contains_fish: bool,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub note: String,
}

/// A field the service sends either as a JSON number or a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Number(f64),
    Text(String),
}

impl Default for DisplayValue {
    fn default() -> Self {
        DisplayValue::Text(String::new())
    }
}

impl std::fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayValue::Number(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{}", *n as i64),
            DisplayValue::Number(n) => write!(f, "{}", n),
            DisplayValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuakeLocation {
    /// Place name, already translated by the service
    #[serde(default)]
    pub code: DisplayValue,
    #[serde(default)]
    pub coordinate: DisplayValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuakeComments {
    #[serde(default, alias = "hasTsunamiWarning")]
    pub has_tsunami_warning: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub city_code: DisplayValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Area {
    #[serde(default)]
    pub area_code: DisplayValue,
    #[serde(default)]
    pub cities: Vec<City>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub prefecture: String,
    #[serde(default)]
    pub areas: Vec<Area>,
}

/// Earthquake with intensity and affected regions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedQuake {
    pub time: String,
    #[serde(default)]
    pub magnitude: DisplayValue,
    #[serde(default)]
    pub location: QuakeLocation,
    #[serde(default, alias = "maxInt")]
    pub max_int: DisplayValue,
    #[serde(default)]
    pub comments: QuakeComments,
    #[serde(default)]
    pub regions: Vec<Region>,
}

/// Earthquake with epicentre information only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicQuake {
    pub time: String,
    #[serde(default)]
    pub magnitude: DisplayValue,
    #[serde(default)]
    pub location: QuakeLocation,
    #[serde(default)]
    pub comments: QuakeComments,
}

/// Earthquake feed as the service sends it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeFeed {
    pub data: QuakeLists,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuakeLists {
    #[serde(default)]
    pub detailed: Vec<DetailedQuake>,
    #[serde(default)]
    pub basic: Vec<BasicQuake>,
}

/// Outbound request to the lookup service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupRequest {
    Barcode { code: String, language: String },
    Ingredients { image: Vec<u8>, language: String },
    Earthquake { language: String, force_refresh: bool },
}

impl LookupRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            LookupRequest::Barcode { .. } => "barcode",
            LookupRequest::Ingredients { .. } => "ingredients",
            LookupRequest::Earthquake { .. } => "earthquake",
        }
    }
}

/// Parsed service response
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResponse {
    Product(ProductInfo),
    Ingredients(IngredientsInfo),
    Earthquakes(EarthquakeFeed),
}

/// Lookup failures; the display text is what the user sees
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Product not found")]
    NotFound,
    #[error("Failed to analyze ingredients")]
    AnalysisFailed,
    #[error("{0}")]
    Network(String),
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredients_camel_case() {
        let info: IngredientsInfo = serde_json::from_str(
            r#"{"ingredients":["water","soy"],"vegetarian":true,"containsMeat":false,
                "containsFish":true,"isVegan":false,"note":"contains bonito"}"#,
        )
        .unwrap();
        assert_eq!(info.ingredients, vec!["water", "soy"]);
        assert!(info.contains_fish);
        assert!(!info.is_vegan);
        assert_eq!(info.note, "contains bonito");
    }

    #[test]
    fn test_product_without_reviews() {
        let product: ProductInfo =
            serde_json::from_str(r#"{"name":"Tea","description":"Green tea"}"#).unwrap();
        assert_eq!(product.name, "Tea");
        assert!(product.reviews.is_none());
    }

    #[test]
    fn test_quake_fields_accept_numbers_and_strings() {
        let feed: EarthquakeFeed = serde_json::from_str(
            r#"{"data":{"detailed":[{"time":"2024/01/01 16:10:00","magnitude":7.6,
                "location":{"code":"Noto","coordinate":"37.5N 137.2E"},"maxInt":"7",
                "comments":{"hasTsunamiWarning":true},
                "regions":[{"prefecture":"Ishikawa","areas":[{"area_code":390,"cities":[{"city_code":"Wajima"}]}]}]}],
                "basic":[{"time":"2024/01/02 08:00:00","magnitude":"3.1","location":{"code":"Chiba","coordinate":35}}]},
                "last_updated":"2024-01-02T09:00:00Z"}"#,
        )
        .unwrap();

        let quake = &feed.data.detailed[0];
        assert_eq!(quake.magnitude.to_string(), "7.6");
        assert_eq!(quake.max_int.to_string(), "7");
        assert!(quake.comments.has_tsunami_warning);
        assert_eq!(quake.regions[0].areas[0].area_code.to_string(), "390");
        assert_eq!(feed.data.basic[0].location.coordinate.to_string(), "35");
        assert_eq!(feed.last_updated.as_deref(), Some("2024-01-02T09:00:00Z"));
    }

    #[test]
    fn test_error_texts() {
        assert_eq!(LookupError::NotFound.to_string(), "Product not found");
        assert_eq!(
            LookupError::AnalysisFailed.to_string(),
            "Failed to analyze ingredients"
        );
        assert_eq!(
            LookupError::Network("Failed to fetch earthquake data".into()).to_string(),
            "Failed to fetch earthquake data"
        );
    }
}
