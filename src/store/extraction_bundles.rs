//! ExtractionBundle collection (§3 ExtractionBundle: one row per processed
//! email, bundling everything it produced for audit and replay).

use super::Store;
use crate::models::ExtractionBundle;
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};

impl Store {
    pub async fn get_extraction_bundle(
        &self,
        email_id: i64,
    ) -> Result<Option<ExtractionBundle>, sqlx::Error> {
        sqlx::query_as::<_, ExtractionBundle>(
            r#"
            SELECT id, email_id, ship_ids, cargo_ids, failed_entry_ids, timestamp_created
            FROM extraction_bundles
            WHERE email_id = $1
            "#,
        )
        .bind(email_id)
        .fetch_optional(&self.pool)
        .await
    }
}

pub(crate) async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    email_id: i64,
    ship_ids: &[i64],
    cargo_ids: &[i64],
    failed_entry_ids: &[i64],
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO extraction_bundles (email_id, ship_ids, cargo_ids, failed_entry_ids)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(email_id)
    .bind(Json(ship_ids))
    .bind(Json(cargo_ids))
    .bind(Json(failed_entry_ids))
    .fetch_one(&mut **tx)
    .await
}
