//! Geocoder (§4.5), ground truth `geocoding.py`'s
//! `geocode_location_with_retry` / `geocode_location`: try-with-fallback over
//! port → sea → ocean, backed by the `KnownLocation` cache (§3, I6).

pub mod google_client;

use crate::models::{GeocodedLocation, Location};
use crate::store::Store;
use async_trait::async_trait;
use thiserror::Error;

pub use google_client::GoogleGeocoder;

#[derive(Debug, Error)]
pub enum GeocoderError {
    #[error("geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder returned a malformed response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// The remote name→coordinate service, with no knowledge of the cache.
#[async_trait]
pub trait RemoteGeocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedLocation>, GeocoderError>;
}

/// Resolve `location` to a `GeocodedLocation`, trying `port`, then `sea`,
/// then `ocean`, consulting and populating the `KnownLocation` cache at
/// each step (§4.5 algorithm).
pub async fn geocode(
    store: &Store,
    remote: &dyn RemoteGeocoder,
    location: &Location,
) -> Result<Option<GeocodedLocation>, GeocoderError> {
    let port = location.port.as_deref().unwrap_or("");
    let sea = location.sea.as_deref().unwrap_or("");
    let ocean = location.ocean.as_deref().unwrap_or("");

    if !port.is_empty() {
        if let Some(found) = lookup_or_fetch(store, remote, port).await? {
            return Ok(Some(found));
        }
    }

    if !sea.is_empty() {
        if let Some(found) = lookup_or_fetch(store, remote, sea).await? {
            // If the port was present but failed to geocode, cache a copy of
            // the sea-level result under the port name too, so future
            // requests for that port short-circuit to this broader result.
            if !port.is_empty() {
                store
                    .insert_known_location(port, &found.address, &found.location, &found.raw)
                    .await?;
            }
            return Ok(Some(found));
        }
    }

    if !ocean.is_empty() {
        if let Some(found) = lookup_or_fetch(store, remote, ocean).await? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

async fn lookup_or_fetch(
    store: &Store,
    remote: &dyn RemoteGeocoder,
    name: &str,
) -> Result<Option<GeocodedLocation>, GeocoderError> {
    if let Some(cached) = store.get_known_location(name).await? {
        return Ok(Some(GeocodedLocation {
            name: cached.name,
            address: cached.address,
            location: cached.location.0,
            raw: cached.raw.0,
        }));
    }

    match remote.geocode(name).await? {
        Some(result) => {
            store
                .insert_known_location(&result.name, &result.address, &result.location, &result.raw)
                .await?;
            Ok(Some(result))
        }
        None => Ok(None),
    }
}
