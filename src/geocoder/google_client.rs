//! Google Geocoding API client, standing in for `geopy`'s `GoogleV3`
//! (`init_async_geolocator_google` in `geocoding.py`) — no Rust equivalent
//! exists in the pack, so this talks to the plain HTTP API directly.

use super::{GeocoderError, RemoteGeocoder};
use crate::config::GeocoderConfig;
use crate::models::{GeoPoint, GeocodedLocation};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub struct GoogleGeocoder {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleGeocoder {
    pub fn new(config: GeocoderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key,
            base_url: config.base_url,
        }
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[async_trait]
impl RemoteGeocoder for GoogleGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedLocation>, GeocoderError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("address", query), ("key", &self.api_key)])
            .send()
            .await?
            .error_for_status()?;

        let raw: Value = response
            .json()
            .await
            .map_err(|e| GeocoderError::Malformed(e.to_string()))?;

        let parsed: GeocodeResponse = serde_json::from_value(raw.clone())
            .map_err(|e| GeocoderError::Malformed(e.to_string()))?;

        if parsed.status != "OK" {
            return Ok(None);
        }

        let Some(first) = parsed.results.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(GeocodedLocation {
            name: query.to_string(),
            address: first.formatted_address,
            location: GeoPoint::new(first.geometry.location.lng, first.geometry.location.lat),
            raw,
        }))
    }
}
