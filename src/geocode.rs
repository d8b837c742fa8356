//! Reverse geocoding (coordinates -> street address) via Google Geocoding

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::GeocodingConfig;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Network(String),

    #[error("Geocoding API returned HTTP {0}")]
    Status(u16),

    #[error("Malformed geocoding payload: {0}")]
    Payload(String),
}

/// Address reply of `POST /api/location`
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAddress {
    #[schema(example = "1234 Rue Sainte-Catherine O, Montréal, QC H3G 1P1, Canada")]
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
}

impl ResolvedAddress {
    pub fn empty() -> Self {
        Self {
            address: String::new(),
            place_id: None,
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best street-level address for the coordinates, or an empty address
    /// when the geocoder has nothing precise enough.
    async fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
        language: &str,
    ) -> Result<ResolvedAddress, GeocodeError>;
}

#[derive(Deserialize)]
struct GeocodeReply {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    place_id: Option<String>,
}

impl GeocodeReply {
    fn into_address(self) -> ResolvedAddress {
        if self.status != "OK" {
            return ResolvedAddress::empty();
        }
        match self.results.into_iter().next() {
            Some(first) => ResolvedAddress {
                address: first.formatted_address,
                place_id: first.place_id,
            },
            None => ResolvedAddress::empty(),
        }
    }
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(client: reqwest::Client, config: &GeocodingConfig) -> Self {
        Self {
            client,
            url: format!(
                "{}/maps/api/geocode/json",
                config.api_base.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
        language: &str,
    ) -> Result<ResolvedAddress, GeocodeError> {
        let latlng = format!("{},{}", latitude, longitude);
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("latlng", latlng.as_str()),
                ("result_type", "street_address|locality|postal_code"),
                ("location_type", "ROOFTOP"),
                ("language", language),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let reply: GeocodeReply = response
            .json()
            .await
            .map_err(|e| GeocodeError::Payload(e.to_string()))?;

        if reply.status != "OK" && reply.status != "ZERO_RESULTS" {
            tracing::warn!(status = %reply.status, "Reverse geocoding returned no address");
        }
        Ok(reply.into_address())
    }
}
