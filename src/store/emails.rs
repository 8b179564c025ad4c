//! Email collection (§3 Email, §4.3 Dedup & Persist Consumer).

use super::Store;
use crate::models::Email;
use sha2::{Digest, Sha256};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

/// Hex sha256 digest of an email body, used as the secondary dedup key (I1)
/// so the uniqueness index doesn't have to index the full text.
pub fn body_hash(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    format!("{digest:x}")
}

impl Store {
    /// Look up an existing email sharing `provider_message_id` or `body`
    /// (§4.3 step 1). Either key alone is sufficient grounds to call it a
    /// duplicate.
    pub async fn find_duplicate_email(
        &self,
        provider_message_id: Option<&str>,
        body: &str,
    ) -> Result<Option<Email>, sqlx::Error> {
        find_duplicate(&self.pool, provider_message_id, body).await
    }

    /// Insert a newly-accepted email with `timestamp_added_to_db := now()`
    /// (§4.3 step 2).
    pub async fn insert_email(
        &self,
        provider_message_id: Option<&str>,
        body: &str,
        subject: &str,
        sender: &str,
        recipients: &str,
        date_received: &str,
    ) -> Result<Email, sqlx::Error> {
        let hash = body_hash(body);
        sqlx::query_as::<_, Email>(
            r#"
            INSERT INTO emails
                (provider_message_id, body, body_hash, subject, sender, recipients, date_received)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, provider_message_id, body, subject, sender, recipients, date_received,
                      timestamp_added_to_db, timestamp_entities_extracted,
                      extracted_ship_ids, extracted_cargo_ids
            "#,
        )
        .bind(provider_message_id)
        .bind(body)
        .bind(hash)
        .bind(subject)
        .bind(sender)
        .bind(recipients)
        .bind(date_received)
        .fetch_one(&self.pool)
        .await
    }
}

async fn find_duplicate(
    pool: &PgPool,
    provider_message_id: Option<&str>,
    body: &str,
) -> Result<Option<Email>, sqlx::Error> {
    let hash = body_hash(body);
    sqlx::query_as::<_, Email>(
        r#"
        SELECT id, provider_message_id, body, subject, sender, recipients, date_received,
               timestamp_added_to_db, timestamp_entities_extracted,
               extracted_ship_ids, extracted_cargo_ids
        FROM emails
        WHERE (provider_message_id IS NOT NULL AND provider_message_id <> '' AND provider_message_id = $1)
           OR body_hash = $2
        LIMIT 1
        "#,
    )
    .bind(provider_message_id)
    .bind(hash)
    .fetch_optional(pool)
    .await
}

/// Append the ids produced by one extraction run and mark the email's
/// extraction timestamp, inside the caller's transaction (§4.4 step 5).
pub(crate) async fn append_extraction_result_tx(
    tx: &mut Transaction<'_, Postgres>,
    email_id: i64,
    ship_ids: &[i64],
    cargo_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE emails
        SET extracted_ship_ids = extracted_ship_ids || $2,
            extracted_cargo_ids = extracted_cargo_ids || $3,
            timestamp_entities_extracted = now()
        WHERE id = $1
        "#,
    )
    .bind(email_id)
    .bind(Json(ship_ids))
    .bind(Json(cargo_ids))
    .execute(&mut **tx)
    .await?;

    Ok(())
}
