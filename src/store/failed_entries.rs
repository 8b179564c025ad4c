//! FailedEntry collection (§3 FailedEntry, §4.4 step 4 validation failures).

use super::{Store, entry_kind_str};
use crate::models::FailedEntry;
use sqlx::{Postgres, Transaction};

impl Store {
    pub async fn recent_failed_entries(&self, limit: i64) -> Result<Vec<FailedEntry>, sqlx::Error> {
        sqlx::query_as::<_, FailedEntry>(
            r#"
            SELECT id, entry_type, reason, raw_entry, email, timestamp_created
            FROM failed_entries
            ORDER BY timestamp_created DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

pub(crate) async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    entry: &FailedEntry,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO failed_entries (entry_type, reason, raw_entry, email)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(entry_kind_str(entry.entry_type))
    .bind(&entry.reason)
    .bind(&entry.raw_entry)
    .bind(&entry.email)
    .fetch_one(&mut **tx)
    .await
}
