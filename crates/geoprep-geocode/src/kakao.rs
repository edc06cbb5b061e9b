use std::time::Duration;

use async_trait::async_trait;
use geoprep_core::error::{GeoprepError, Result};
use serde::Deserialize;

use crate::ports::{GeocodeOutcome, Geocoder, LatLng};

const ADDRESS_SEARCH_PATH: &str = "/v2/local/search/address.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Kakao Local address search geocoder
pub struct KakaoGeocoder {
    /// Base URL for the Kakao API (e.g., "https://dapi.kakao.com")
    base_url: String,

    /// REST API key, sent as `Authorization: KakaoAK {key}`
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl KakaoGeocoder {
    /// Create a new Kakao geocoder
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(|e| {
            GeoprepError::ConfigInvalid {
                key: "geocoder_url".to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            }
        })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create against the public Kakao endpoint
    pub fn with_key(api_key: impl Into<String>) -> Result<Self> {
        Self::new("https://dapi.kakao.com", api_key)
    }

    fn search_url(&self, address: &str) -> std::result::Result<reqwest::Url, String> {
        reqwest::Url::parse_with_params(
            &format!("{}{}", self.base_url, ADDRESS_SEARCH_PATH),
            &[("query", address)],
        )
        .map_err(|e| format!("Invalid geocoder URL '{}': {}", self.base_url, e))
    }
}

#[async_trait]
impl Geocoder for KakaoGeocoder {
    async fn geocode(&self, address: &str) -> GeocodeOutcome {
        let url = match self.search_url(address) {
            Ok(url) => url,
            Err(reason) => return GeocodeOutcome::Failed(reason),
        };

        let response = match self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("KakaoAK {}", self.api_key))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return GeocodeOutcome::Failed(format!("Failed to reach Kakao: {}", e)),
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return GeocodeOutcome::Failed(format!("Kakao API error ({}): {}", status, error_text));
        }

        match response.text().await {
            Ok(body) => parse_response(&body),
            Err(e) => GeocodeOutcome::Failed(format!("Failed to read Kakao response: {}", e)),
        }
    }

    fn service_name(&self) -> &str {
        "Kakao"
    }
}

/// Response from the Kakao address search API
#[derive(Debug, Deserialize)]
struct AddressSearchResponse {
    documents: Vec<AddressDocument>,
}

/// Kakao returns coordinates as decimal strings
#[derive(Debug, Deserialize)]
struct AddressDocument {
    x: String,
    y: String,
}

/// Interpret an address search response body
pub fn parse_response(body: &str) -> GeocodeOutcome {
    let response: AddressSearchResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => return GeocodeOutcome::Failed(format!("Failed to parse Kakao response: {}", e)),
    };

    let Some(first) = response.documents.first() else {
        return GeocodeOutcome::NotFound;
    };

    match (first.y.trim().parse::<f64>(), first.x.trim().parse::<f64>()) {
        (Ok(lat), Ok(lng)) => GeocodeOutcome::Found(LatLng { lat, lng }),
        _ => GeocodeOutcome::Failed(format!(
            "Kakao returned non-numeric coordinates x='{}' y='{}'",
            first.x, first.y
        )),
    }
}
