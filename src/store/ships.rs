//! Ship collection (§3 Ship, §4.6 Matching Engine vessel side).

use super::Store;
use crate::models::Ship;
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};

impl Store {
    /// Vessels with no pair list set yet (I5: `pairs_with == []` and
    /// `timestamp_pairs_updated IS NULL` distinguishes "unmatched" from
    /// "matched with zero"), oldest first — the Match Producer's scan order
    /// (§4.6, §5 "priority-sort order of the Match Producer's scan").
    pub async fn ships_awaiting_match(&self, limit: i64) -> Result<Vec<Ship>, sqlx::Error> {
        sqlx::query_as::<_, Ship>(
            r#"
            SELECT id, name, status, month, capacity, location, keyword_data,
                   capacity_int, month_int, location_geocoded,
                   email, timestamp_created, pairs_with, timestamp_pairs_updated
            FROM ships
            WHERE pairs_with = '[]'::jsonb AND timestamp_pairs_updated IS NULL
            ORDER BY timestamp_created ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Write the matching engine's result back onto the vessel (§4.6
    /// "Persistence after matching").
    pub async fn set_pairs(&self, ship_id: i64, cargo_ids: &[i64]) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE ships SET pairs_with = $2, timestamp_pairs_updated = now() WHERE id = $1",
        )
        .bind(ship_id)
        .bind(Json(cargo_ids))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_ship(&self, id: i64) -> Result<Option<Ship>, sqlx::Error> {
        sqlx::query_as::<_, Ship>(
            r#"
            SELECT id, name, status, month, capacity, location, keyword_data,
                   capacity_int, month_int, location_geocoded,
                   email, timestamp_created, pairs_with, timestamp_pairs_updated
            FROM ships WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Insert one validated ship inside the caller's extraction transaction,
/// returning its new id.
pub(crate) async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    ship: &Ship,
) -> Result<i64, sqlx::Error> {
    let (lon, lat) = ship
        .location_geocoded
        .0
        .as_ref()
        .map(|g| (g.location.longitude(), g.location.latitude()))
        .unzip();

    sqlx::query_scalar(
        r#"
        INSERT INTO ships
            (name, status, month, capacity, location, keyword_data,
             capacity_int, month_int, location_geocoded, geo_longitude, geo_latitude,
             email)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING id
        "#,
    )
    .bind(&ship.name)
    .bind(&ship.status)
    .bind(&ship.month)
    .bind(&ship.capacity)
    .bind(&ship.location)
    .bind(&ship.keyword_data)
    .bind(ship.capacity_int)
    .bind(ship.month_int)
    .bind(&ship.location_geocoded)
    .bind(lon)
    .bind(lat)
    .bind(&ship.email)
    .fetch_one(&mut **tx)
    .await
}
