use crate::config::CartoConfig;
use crate::utils::error::{RegistryError, Result};
use crate::utils::validation::validate_required_field;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct CartoResponse {
    #[serde(default)]
    pub total_rows: Option<u64>,
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    error: Vec<String>,
}

/// Client for Carto's SQL API (`POST {base_url}/api/v2/sql`).
pub struct CartoClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl CartoClient {
    pub fn new(config: &CartoConfig) -> Result<Self> {
        let api_key = validate_required_field("carto.api_key", &config.api_key)?.clone();

        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/v2/sql", config.base_url.trim_end_matches('/')),
            api_key,
        })
    }

    pub async fn execute(&self, query: &str) -> Result<CartoResponse> {
        tracing::debug!("Sending {} byte query to {}", query.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query), ("api_key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: CartoResponse = serde_json::from_str(&body).unwrap_or_default();

        if !status.is_success() || !parsed.error.is_empty() {
            let detail = if parsed.error.is_empty() {
                body
            } else {
                parsed.error.join("; ")
            };
            return Err(RegistryError::CartoError {
                message: format!("Carto returned {status}: {detail}"),
            });
        }

        tracing::info!(
            "Carto query affected {} rows",
            parsed.total_rows.unwrap_or_default()
        );
        Ok(parsed)
    }
}
