use crate::config::GeocoderConfig;
use crate::domain::model::Geocode;
use crate::domain::ports::Geocoder;
use crate::utils::error::{RegistryError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    location: LatLng,
    #[serde(default)]
    accuracy: f64,
    #[serde(default)]
    accuracy_type: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Geocodio forward geocoding (`GET {base_url}/geocode?q=..&api_key=..`).
pub struct GeocodioClient {
    client: Client,
    base_url: String,
    api_key: String,
    min_accuracy: f64,
}

impl GeocodioClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            min_accuracy: config.min_accuracy,
        })
    }
}

#[async_trait]
impl Geocoder for GeocodioClient {
    fn provider(&self) -> &str {
        "Geocodio"
    }

    async fn geocode(&self, full_address: &str) -> Result<Option<Geocode>> {
        let endpoint = format!("{}/geocode", self.base_url);
        tracing::debug!("Geocoding '{}' via {}", full_address, endpoint);

        let response = self
            .client
            .get(&endpoint)
            .query(&[("q", full_address), ("api_key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::GeocodingError {
                message: format!("Geocodio returned {status}: {body}"),
            });
        }

        let parsed: GeocodeResponse = response.json().await?;
        let best = parsed
            .results
            .into_iter()
            .find(|result| result.accuracy >= self.min_accuracy);

        let Some(best) = best else {
            tracing::debug!("No result above accuracy {} for '{}'", self.min_accuracy, full_address);
            return Ok(None);
        };

        let properties = serde_json::json!({
            "accuracy": best.accuracy,
            "accuracy_type": best.accuracy_type,
            "formatted_address": best.formatted_address,
            "source": best.source,
            "geocoder": "geocodio",
        });

        Ok(Some(Geocode {
            latitude: best.location.lat,
            longitude: best.location.lng,
            properties: properties.to_string(),
        }))
    }
}
