// SPDX-License-Identifier: GPL-3.0-only

//! HTTP client for the product, ingredient and earthquake service
//!
//! Every call is a single attempt. Failures come back as [`LookupError`]
//! whose text is shown to the user as is; the underlying cause is logged.

pub mod types;

pub use types::*;

use crate::constants::{
    EARTHQUAKE_FETCH_FAILED, INGREDIENTS_ANALYSIS_FAILED, PRODUCT_FETCH_FAILED,
};
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("scan-japan/", env!("GIT_VERSION"));

/// Lookup service client; clones share the connection pool
#[derive(Debug, Clone)]
pub struct LookupClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LookupClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let base_url =
            Url::parse(base_url).map_err(|e| LookupError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LookupError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        info!(base_url = %base_url, "Lookup client ready");
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issue `request` and parse the matching response
    pub async fn submit(&self, request: LookupRequest) -> Result<LookupResponse, LookupError> {
        match request {
            LookupRequest::Barcode { code, language } => {
                self.product(&code, &language).await.map(LookupResponse::Product)
            }
            LookupRequest::Ingredients { image, language } => self
                .ingredients(image, &language)
                .await
                .map(LookupResponse::Ingredients),
            LookupRequest::Earthquake {
                language,
                force_refresh,
            } => self
                .earthquakes(&language, force_refresh)
                .await
                .map(LookupResponse::Earthquakes),
        }
    }

    /// `GET /barcode/{code}/{language}`
    pub async fn product(&self, code: &str, language: &str) -> Result<ProductInfo, LookupError> {
        let url = self.endpoint(&["barcode", code, language]);
        debug!(url = %url, "Looking up product");

        let network = |e: &dyn std::fmt::Display| {
            warn!(code, error = %e, "Product lookup failed");
            LookupError::Network(PRODUCT_FETCH_FAILED.to_string())
        };

        let response = self.http.get(url).send().await.map_err(|e| network(&e))?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                info!(code, "Product not found");
                Err(LookupError::NotFound)
            }
            status if !status.is_success() => Err(network(&status)),
            _ => parse_json(response).await.map_err(|e| network(&e)),
        }
    }

    /// `POST /ingredients` with the label photo as multipart `file`
    pub async fn ingredients(
        &self,
        image: Vec<u8>,
        language: &str,
    ) -> Result<IngredientsInfo, LookupError> {
        let url = self.endpoint(&["ingredients"]);
        debug!(url = %url, bytes = image.len(), "Submitting label for analysis");

        let network = |e: &dyn std::fmt::Display| {
            warn!(error = %e, "Ingredient analysis request failed");
            LookupError::Network(INGREDIENTS_ANALYSIS_FAILED.to_string())
        };

        let file = Part::bytes(image)
            .file_name("image.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| network(&e))?;
        let form = Form::new().part("file", file).text("lang", language.to_string());

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| network(&e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Ingredient analysis rejected");
            return Err(LookupError::AnalysisFailed);
        }
        parse_json(response).await.map_err(|e| network(&e))
    }

    /// `GET /earthquakes/{language}`, with `?force=true` to bypass the service cache
    pub async fn earthquakes(
        &self,
        language: &str,
        force_refresh: bool,
    ) -> Result<EarthquakeFeed, LookupError> {
        let mut url = self.endpoint(&["earthquakes", language]);
        if force_refresh {
            url.query_pairs_mut().append_pair("force", "true");
        }
        debug!(url = %url, "Fetching earthquake feed");

        let network = |e: &dyn std::fmt::Display| {
            warn!(error = %e, "Earthquake feed request failed");
            LookupError::Network(EARTHQUAKE_FETCH_FAILED.to_string())
        };

        let response = self.http.get(url).send().await.map_err(|e| network(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(network(&status));
        }
        parse_json(response).await.map_err(|e| network(&e))
    }
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
    let body = response.bytes().await.map_err(|e| e.to_string())?;
    serde_json::from_slice(&body).map_err(|e| format!("invalid response body: {}", e))
}
