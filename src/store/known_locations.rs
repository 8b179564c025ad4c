//! KnownLocation collection (§3 KnownLocation, §4.5 Geocoder cache).

use super::Store;
use crate::models::{GeoPoint, KnownLocation};
use sqlx::types::Json;

impl Store {
    /// Cache lookup by exact, case-sensitive name (§4.5 step 1/2/3).
    pub async fn get_known_location(
        &self,
        name: &str,
    ) -> Result<Option<KnownLocation>, sqlx::Error> {
        sqlx::query_as::<_, KnownLocation>(
            "SELECT id, name, address, location, raw FROM known_locations WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert a freshly-geocoded result under `name` (I6: at most once per
    /// name). A concurrent insert of the same name is treated as a cache hit
    /// rather than an error — two Extraction workers can race to geocode the
    /// same port.
    pub async fn insert_known_location(
        &self,
        name: &str,
        address: &str,
        location: &GeoPoint,
        raw: &serde_json::Value,
    ) -> Result<KnownLocation, sqlx::Error> {
        sqlx::query_as::<_, KnownLocation>(
            r#"
            INSERT INTO known_locations (name, address, location, raw, longitude, latitude)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, address, location, raw
            "#,
        )
        .bind(name)
        .bind(address)
        .bind(Json(location))
        .bind(Json(raw))
        .bind(location.longitude())
        .bind(location.latitude())
        .fetch_one(&self.pool)
        .await
    }
}
