//! Cargo collection (§3 Cargo, §4.6 Matching Engine hard filter).

use super::Store;
use crate::models::{Cargo, Ship};
use sqlx::{Postgres, QueryBuilder, Transaction};

/// Radius cap for the `$near` predicate (§4.6), in meters.
const MATCH_RADIUS_METERS: f64 = 1_500_000.0;
/// Recency cutoff for candidate cargoes (§4.6).
const RECENCY_DAYS: i64 = 31;
/// Commission ceiling (§4.6).
const COMMISSION_CAP: f64 = 5.00;

impl Store {
    /// Stage-one hard filter (§4.6): every predicate the store can apply
    /// before in-process scoring/dedup takes over. Returns candidates
    /// already ordered by ascending distance from `ship`'s geocoded
    /// location, since `$near` both filters and orders.
    ///
    /// A ship with no geocoded location cannot be matched against — the
    /// `$near` predicate has nothing to anchor on — so this returns an empty
    /// list rather than an unfiltered one.
    pub async fn hard_filter_candidates(&self, ship: &Ship) -> Result<Vec<Cargo>, sqlx::Error> {
        let Some(geocoded) = ship.location_geocoded.0.as_ref() else {
            return Ok(Vec::new());
        };
        let (ship_lon, ship_lat) = (geocoded.location.longitude(), geocoded.location.latitude());

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT id, name, quantity, location_from, location_to, month, commission,
                   keyword_data, quantity_min_int, quantity_max_int, month_int,
                   commission_float, location_from_geocoded, location_to_geocoded,
                   email, timestamp_created, pairs_with
            FROM cargos
            WHERE timestamp_created >= now() - interval '31 days'
              AND commission_float <=
            "#,
        );
        builder.push_bind(COMMISSION_CAP);
        builder.push(" AND location_from_geocoded IS NOT NULL AND location_to_geocoded IS NOT NULL");
        builder.push(" AND from_latitude IS NOT NULL AND from_longitude IS NOT NULL");

        if let Some(capacity) = ship.capacity_int {
            builder.push(" AND quantity_max_int >= ");
            builder.push_bind(0.80 * capacity as f64);
            builder.push(" AND quantity_min_int <= ");
            builder.push_bind(1.20 * capacity as f64);
        }

        if let Some(month) = ship.month_int {
            builder.push(" AND month_int IS NOT NULL AND abs(month_int - ");
            builder.push_bind(month);
            builder.push(") <= 1");
        }

        builder.push(" AND earth_distance(ll_to_earth(from_latitude, from_longitude), ll_to_earth(");
        builder.push_bind(ship_lat);
        builder.push(", ");
        builder.push_bind(ship_lon);
        builder.push(")) <= ");
        builder.push_bind(MATCH_RADIUS_METERS);

        builder.push(" ORDER BY earth_distance(ll_to_earth(from_latitude, from_longitude), ll_to_earth(");
        builder.push_bind(ship_lat);
        builder.push(", ");
        builder.push_bind(ship_lon);
        builder.push(")) ASC");

        builder.build_query_as::<Cargo>().fetch_all(&self.pool).await
    }

    /// Recency constant exposed for scoring/tests that want to reproduce the
    /// hard filter's window without duplicating the literal.
    pub const fn recency_days() -> i64 {
        RECENCY_DAYS
    }

    /// Resolve a vessel's `pairs_with` id list back into full cargo rows,
    /// for the Outbound Mail Producer's template parameter bag (§4.7).
    pub async fn get_cargos_by_ids(&self, ids: &[i64]) -> Result<Vec<Cargo>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Cargo>(
            r#"
            SELECT id, name, quantity, location_from, location_to, month, commission,
                   keyword_data, quantity_min_int, quantity_max_int, month_int,
                   commission_float, location_from_geocoded, location_to_geocoded,
                   email, timestamp_created, pairs_with
            FROM cargos
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }
}

pub(crate) async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    cargo: &Cargo,
) -> Result<i64, sqlx::Error> {
    let (lon, lat) = cargo
        .location_from_geocoded
        .0
        .as_ref()
        .map(|g| (g.location.longitude(), g.location.latitude()))
        .unzip();

    sqlx::query_scalar(
        r#"
        INSERT INTO cargos
            (name, quantity, location_from, location_to, month, commission, keyword_data,
             quantity_min_int, quantity_max_int, month_int, commission_float,
             location_from_geocoded, location_to_geocoded, from_longitude, from_latitude,
             email)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING id
        "#,
    )
    .bind(&cargo.name)
    .bind(&cargo.quantity)
    .bind(&cargo.location_from)
    .bind(&cargo.location_to)
    .bind(&cargo.month)
    .bind(&cargo.commission)
    .bind(&cargo.keyword_data)
    .bind(cargo.quantity_min_int)
    .bind(cargo.quantity_max_int)
    .bind(cargo.month_int)
    .bind(cargo.commission_float)
    .bind(&cargo.location_from_geocoded)
    .bind(&cargo.location_to_geocoded)
    .bind(lon)
    .bind(lat)
    .bind(&cargo.email)
    .fetch_one(&mut **tx)
    .await
}
