//! Extraction Consumer Pool (§4.4), ground truth `gpt_email_consumer` /
//! `_gpt_email_consumer` / `insert_gpt_entries_into_db`.

use crate::geocoder::{self, RemoteGeocoder};
use crate::models::{Cargo, EmailSnapshot, EntryKind, Email, FailedEntry, Location, RawOracleEntry, Ship};
use crate::normalize;
use crate::oracle::ExtractionOracle;
use crate::realtime::LiveLog;
use crate::store::Store;
use crate::supervisor::queues::SharedReceiver;
use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Rate-pace sleep between units within one worker, §4.4 step 6 ("Sleep ≥1
/// s between units to rate-pace the oracle").
const UNIT_PACING: Duration = Duration::from_secs(1);

fn field_str(fields: &Value, key: &str) -> String {
    fields.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn opt_str(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn parse_location(fields: &Value, key: &str) -> Location {
    fields
        .get(key)
        .and_then(|v| serde_json::from_value::<Location>(v.clone()).ok())
        .unwrap_or_default()
}

async fn geocode_field(
    store: &Store,
    remote: &dyn RemoteGeocoder,
    location: &Location,
) -> Result<Option<crate::models::GeocodedLocation>, String> {
    if location.is_empty() {
        return Ok(None);
    }
    geocoder::geocode(store, remote, location)
        .await
        .map_err(|e| format!("geocoding failed: {e}"))
}

async fn build_ship(
    fields: &Value,
    snapshot: &EmailSnapshot,
    store: &Store,
    remote: &dyn RemoteGeocoder,
) -> Result<Ship, String> {
    let capacity_raw = field_str(fields, "capacity/quantity");
    let month_raw = field_str(fields, "month");
    let location = parse_location(fields, "location");
    let location_geocoded = geocode_field(store, remote, &location).await?;

    Ok(Ship {
        id: 0,
        name: opt_str(field_str(fields, "name")),
        status: opt_str(field_str(fields, "status")),
        month: opt_str(month_raw.clone()),
        capacity: opt_str(capacity_raw.clone()),
        location: Json(location),
        keyword_data: String::new(),
        capacity_int: normalize::normalize_capacity(&capacity_raw),
        month_int: normalize::extract_month(&month_raw),
        location_geocoded: Json(location_geocoded),
        email: Json(snapshot.clone()),
        timestamp_created: Utc::now(),
        pairs_with: Json(Vec::new()),
        timestamp_pairs_updated: None,
    })
}

async fn build_cargo(
    fields: &Value,
    snapshot: &EmailSnapshot,
    store: &Store,
    remote: &dyn RemoteGeocoder,
) -> Result<Cargo, String> {
    let quantity_raw = field_str(fields, "capacity/quantity");
    let month_raw = field_str(fields, "month");
    let commission_raw = field_str(fields, "commission");
    let location_from = parse_location(fields, "location_from");
    let location_to = parse_location(fields, "location_to");

    let (quantity_min_int, quantity_max_int) = normalize::normalize_quantity(&quantity_raw);
    // I4: quantity_min_int ≤ quantity_max_int. The extraction text doesn't
    // guarantee bound ordering, so an out-of-order pair is a validation
    // failure rather than silently swapped.
    if let (Some(min), Some(max)) = (quantity_min_int, quantity_max_int) {
        if min > max {
            return Err(format!(
                "quantity_min_int ({min}) exceeds quantity_max_int ({max})"
            ));
        }
    }

    let location_from_geocoded = geocode_field(store, remote, &location_from).await?;
    let location_to_geocoded = geocode_field(store, remote, &location_to).await?;

    Ok(Cargo {
        id: 0,
        name: opt_str(field_str(fields, "name")),
        quantity: opt_str(quantity_raw),
        location_from: Json(location_from),
        location_to: Json(location_to),
        month: opt_str(month_raw.clone()),
        commission: opt_str(commission_raw.clone()),
        keyword_data: String::new(),
        quantity_min_int,
        quantity_max_int,
        month_int: normalize::extract_month(&month_raw),
        commission_float: Some(normalize::normalize_commission(&commission_raw)),
        location_from_geocoded: Json(location_from_geocoded),
        location_to_geocoded: Json(location_to_geocoded),
        email: Json(snapshot.clone()),
        timestamp_created: Utc::now(),
        pairs_with: Json(Vec::new()),
    })
}

fn make_failed_entry(
    entry_type: EntryKind,
    reason: String,
    raw: Value,
    snapshot: &EmailSnapshot,
) -> FailedEntry {
    FailedEntry {
        id: 0,
        entry_type,
        reason,
        raw_entry: Json(raw),
        email: Json(snapshot.clone()),
        timestamp_created: Utc::now(),
    }
}

/// Process one email's oracle extraction end to end (§4.4 steps 2-5): call
/// the oracle, normalize/geocode/validate every entry, then persist the
/// whole unit atomically. Every error class is confined to this one email.
pub async fn process_email(
    store: &Store,
    oracle: &dyn ExtractionOracle,
    remote_geocoder: &dyn RemoteGeocoder,
    email: &Email,
    log: &LiveLog,
) {
    let response = match oracle.extract(&email.body).await {
        Ok(r) => r,
        Err(e) => {
            log.gpt(format!("oracle error for email {}: {e}", email.id));
            return;
        }
    };

    if response.entries.is_empty() {
        log.gpt(format!("no entries returned for email {}", email.id));
        return;
    }

    let snapshot = email.snapshot();
    let mut persisted = Vec::new();
    let mut failed = Vec::new();

    for entry in response.entries {
        let RawOracleEntry { entry_type, fields } = entry;
        match entry_type.as_deref() {
            Some("ship") => match build_ship(&fields, &snapshot, store, remote_geocoder).await {
                Ok(ship) => persisted.push(Store::persisted_ship(ship)),
                Err(reason) => failed.push(make_failed_entry(EntryKind::Ship, reason, fields, &snapshot)),
            },
            Some("cargo") => match build_cargo(&fields, &snapshot, store, remote_geocoder).await {
                Ok(cargo) => persisted.push(Store::persisted_cargo(cargo)),
                Err(reason) => failed.push(make_failed_entry(EntryKind::Cargo, reason, fields, &snapshot)),
            },
            other => {
                let reason = format!("unrecognized entry type: {other:?}");
                failed.push(make_failed_entry(EntryKind::Unknown, reason, fields, &snapshot));
            }
        }
    }

    if let Err(e) = store.persist_extraction(email.id, persisted, failed).await {
        log.error(format!("failed to persist extraction for email {}: {e}", email.id));
        return;
    }

    log.gpt(format!("email {} processed, entities persisted", email.id));
}

/// The worker pool task body: drains Q2, dispatching each email to a
/// bounded pool of `n_workers` concurrent units (§4.4 "shared semaphore
/// `sem(N)`").
pub async fn run(
    stop: CancellationToken,
    q2: SharedReceiver<Email>,
    store: Store,
    oracle: Arc<dyn ExtractionOracle>,
    remote_geocoder: Arc<dyn RemoteGeocoder>,
    log: LiveLog,
    n_workers: usize,
) {
    log.gpt(format!("summoned {} extraction workers", n_workers.max(1)));
    let semaphore = Arc::new(Semaphore::new(n_workers.max(1)));
    let mut inflight = JoinSet::new();
    let mut q2 = q2.lock().await;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            item = q2.recv() => {
                let Some(email) = item else { break };
                let Ok(permit) = semaphore.clone().acquire_owned().await else { break };
                let store = store.clone();
                let oracle = oracle.clone();
                let remote_geocoder = remote_geocoder.clone();
                let log = log.clone();
                let stop_inner = stop.clone();
                inflight.spawn(async move {
                    let _permit = permit;
                    process_email(&store, oracle.as_ref(), remote_geocoder.as_ref(), &email, &log).await;
                    tokio::select! {
                        _ = stop_inner.cancelled() => {}
                        _ = tokio::time::sleep(UNIT_PACING) => {}
                    }
                });
            }
            Some(result) = inflight.join_next(), if !inflight.is_empty() => {
                if let Err(e) = result {
                    log.gpt(format!("unhandled error in extraction worker: {e}"));
                }
            }
        }
    }

    while let Some(result) = inflight.join_next().await {
        if let Err(e) = result {
            log.gpt(format!("unhandled error in extraction worker: {e}"));
        }
    }

    log.gpt("extraction consumer pool closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_str_defaults_to_empty_for_missing_or_non_string_keys() {
        let fields = json!({"name": "MV Azara", "month_int": 6});
        assert_eq!(field_str(&fields, "name"), "MV Azara");
        assert_eq!(field_str(&fields, "month_int"), "");
        assert_eq!(field_str(&fields, "missing"), "");
    }

    #[test]
    fn opt_str_turns_empty_string_into_none() {
        assert_eq!(opt_str(String::new()), None);
        assert_eq!(opt_str("open Nemrut".to_string()), Some("open Nemrut".to_string()));
    }

    #[test]
    fn parse_location_falls_back_to_default_on_malformed_or_missing_value() {
        let fields = json!({"location": {"port": "Nemrut"}, "location_to": "not an object"});
        assert_eq!(parse_location(&fields, "location").port, Some("Nemrut".to_string()));
        assert_eq!(parse_location(&fields, "location_to"), Location::default());
        assert_eq!(parse_location(&fields, "missing"), Location::default());
    }
}
