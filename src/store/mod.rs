//! Entity Store (§3): the six logical document collections, realized as
//! Postgres tables with `sqlx`. Each submodule owns the queries for one
//! collection; this module owns the shared pool handle, migrations, and the
//! one cross-collection write that must be atomic — the Extraction Consumer
//! Pool's per-email commit (§4.4 step 5).

pub mod cargos;
pub mod emails;
pub mod extraction_bundles;
pub mod failed_entries;
pub mod known_locations;
pub mod ships;

use crate::models::{Cargo, EntryKind, FailedEntry, Ship};
use serde_json::Value;
use sqlx::PgPool;

/// Run pending migrations. Failure here is a fatal startup condition (§6):
/// the caller turns an `Err` into a failed Rocket ignition.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    log::info!("running entity store migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("entity store migrations complete");
    Ok(())
}

/// Thin handle around the pool, cloned into every pipeline task. Mirrors the
/// teacher's `JobQueue`/`RefreshTokenStore` shape: one small struct per
/// concern, constructed once and cloned freely (`PgPool` is an `Arc` inside).
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// One normalized, validated ship or cargo entry, ready for the
    /// atomic per-email write.
    pub fn persisted_ship(ship: Ship) -> PersistedEntry {
        PersistedEntry::Ship(Box::new(ship))
    }

    pub fn persisted_cargo(cargo: Cargo) -> PersistedEntry {
        PersistedEntry::Cargo(Box::new(cargo))
    }

    /// Persist everything one email's extraction produced in a single
    /// transaction (§4.4 step 5): every ship/cargo, every failed entry, the
    /// bundle row, and the email's updated id lists and extraction
    /// timestamp. Either the whole unit lands or none of it does — the
    /// matching requirement of B3 (never half-committed).
    pub async fn persist_extraction(
        &self,
        email_id: i64,
        entries: Vec<PersistedEntry>,
        failed: Vec<FailedEntry>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let mut ship_ids = Vec::new();
        let mut cargo_ids = Vec::new();

        for entry in entries {
            match entry {
                PersistedEntry::Ship(ship) => {
                    ship_ids.push(ships::insert_tx(&mut tx, &ship).await?);
                }
                PersistedEntry::Cargo(cargo) => {
                    cargo_ids.push(cargos::insert_tx(&mut tx, &cargo).await?);
                }
            }
        }

        let mut failed_ids = Vec::new();
        for entry in &failed {
            failed_ids.push(failed_entries::insert_tx(&mut tx, entry).await?);
        }

        emails::append_extraction_result_tx(&mut tx, email_id, &ship_ids, &cargo_ids).await?;
        extraction_bundles::insert_tx(&mut tx, email_id, &ship_ids, &cargo_ids, &failed_ids)
            .await?;

        tx.commit().await
    }
}

/// A single extracted, normalized, geocoded entry awaiting the atomic write.
pub enum PersistedEntry {
    Ship(Box<Ship>),
    Cargo(Box<Cargo>),
}

pub(crate) fn entry_kind_str(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Ship => "ship",
        EntryKind::Cargo => "cargo",
        EntryKind::Unknown => "unknown",
    }
}

pub(crate) fn json_or_null(value: &Value) -> Value {
    if value.is_null() {
        Value::Object(Default::default())
    } else {
        value.clone()
    }
}
