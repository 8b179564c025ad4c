//! Core domain types for the Entity Store's six logical collections (§3).
//!
//! Each collection is realized as a Postgres table; nested, schema-flexible
//! sub-objects (`location`, `location_geocoded`, `keyword_data`, …) are stored
//! as `JSONB` columns via `sqlx::types::Json<T>` so the shape can evolve the
//! way the source system's dynamically-typed records did, without a
//! migration per field. Derived fields (`capacity_int`, `month_int`, …) are
//! plain columns so the hard-filter query in the matching engine can index
//! and compare them directly.

use chrono::{DateTime, Utc};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// A free-text place description as extracted by the oracle: at most one of
/// `port`/`sea`/`ocean` is expected to carry useful signal, but all three are
/// kept since the extraction prompt doesn't enforce exclusivity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Location {
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub sea: Option<String>,
    #[serde(default)]
    pub ocean: Option<String>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.port.as_deref().unwrap_or("").is_empty()
            && self.sea.as_deref().unwrap_or("").is_empty()
            && self.ocean.as_deref().unwrap_or("").is_empty()
    }
}

/// GeoJSON Point, `[longitude, latitude]` per §4.5.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Result of a successful geocode, cached under `KnownLocation.name` and
/// embedded into Ship/Cargo as `location_geocoded`/`location_{from,to}_geocoded`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GeocodedLocation {
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Value-typed snapshot of the Email that produced a Ship/Cargo/FailedEntry,
/// embedded by value at extraction time (Design Note: this is denormalization,
/// not a cycle — the inverse pointer lives on Email as id lists, see
/// [`Email::extracted_ship_ids`]/[`Email::extracted_cargo_ids`]).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EmailSnapshot {
    pub email_id: i64,
    pub provider_message_id: Option<String>,
    pub subject: String,
    pub sender: String,
    pub body: String,
}

/// Bookkeeping row for one ingested message. Immutable after insert except
/// for `timestamp_entities_extracted` and the two `extracted_*_ids` lists,
/// which are appended to by the Extraction Consumer Pool's atomic write.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Email {
    pub id: i64,
    pub provider_message_id: Option<String>,
    pub body: String,
    pub subject: String,
    pub sender: String,
    /// Comma-joined, first 50 recipients (§3).
    pub recipients: String,
    pub date_received: String,
    pub timestamp_added_to_db: DateTime<Utc>,
    pub timestamp_entities_extracted: Option<DateTime<Utc>>,
    #[sqlx(json)]
    pub extracted_ship_ids: Json<Vec<i64>>,
    #[sqlx(json)]
    pub extracted_cargo_ids: Json<Vec<i64>>,
}

impl Email {
    pub fn snapshot(&self) -> EmailSnapshot {
        EmailSnapshot {
            email_id: self.id,
            provider_message_id: self.provider_message_id.clone(),
            subject: self.subject.clone(),
            sender: self.sender.clone(),
            body: self.body.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Ship {
    pub id: i64,
    pub name: Option<String>,
    pub status: Option<String>,
    pub month: Option<String>,
    pub capacity: Option<String>,
    #[sqlx(json)]
    pub location: Json<Location>,
    #[serde(default)]
    pub keyword_data: String,

    pub capacity_int: Option<i64>,
    pub month_int: Option<i32>,
    #[sqlx(json)]
    pub location_geocoded: Json<Option<GeocodedLocation>>,

    #[sqlx(json)]
    pub email: Json<EmailSnapshot>,
    pub timestamp_created: DateTime<Utc>,

    #[sqlx(json)]
    pub pairs_with: Json<Vec<i64>>,
    pub timestamp_pairs_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Cargo {
    pub id: i64,
    pub name: Option<String>,
    pub quantity: Option<String>,
    #[sqlx(json)]
    pub location_from: Json<Location>,
    #[sqlx(json)]
    pub location_to: Json<Location>,
    pub month: Option<String>,
    pub commission: Option<String>,
    #[serde(default)]
    pub keyword_data: String,

    pub quantity_min_int: Option<i64>,
    pub quantity_max_int: Option<i64>,
    pub month_int: Option<i32>,
    pub commission_float: Option<f64>,
    #[sqlx(json)]
    pub location_from_geocoded: Json<Option<GeocodedLocation>>,
    #[sqlx(json)]
    pub location_to_geocoded: Json<Option<GeocodedLocation>>,

    #[sqlx(json)]
    pub email: Json<EmailSnapshot>,
    pub timestamp_created: DateTime<Utc>,

    /// Symmetric to [`Ship::pairs_with`]; kept for audit parity with the
    /// source model but not written by the matching engine, which only
    /// updates the vessel side (§4.6).
    #[sqlx(json)]
    pub pairs_with: Json<Vec<i64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum EntryKind {
    Ship,
    Cargo,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct FailedEntry {
    pub id: i64,
    pub entry_type: EntryKind,
    pub reason: String,
    #[sqlx(json)]
    pub raw_entry: Json<serde_json::Value>,
    #[sqlx(json)]
    pub email: Json<EmailSnapshot>,
    pub timestamp_created: DateTime<Utc>,
}

/// One per email processed — bundles the email with every entity and failed
/// entry it produced, for audit and replay (§3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct ExtractionBundle {
    pub id: i64,
    pub email_id: i64,
    #[sqlx(json)]
    pub ship_ids: Json<Vec<i64>>,
    #[sqlx(json)]
    pub cargo_ids: Json<Vec<i64>>,
    #[sqlx(json)]
    pub failed_entry_ids: Json<Vec<i64>>,
    pub timestamp_created: DateTime<Utc>,
}

/// Geocoder cache row. `name` is enforced unique at the store level (I6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct KnownLocation {
    pub id: i64,
    pub name: String,
    pub address: String,
    #[sqlx(json)]
    pub location: Json<GeoPoint>,
    #[sqlx(json)]
    pub raw: Json<serde_json::Value>,
}

/// One ship/cargo entry as returned by the oracle, before normalization.
/// `entry_type` is read from the `"type"` field and popped before the rest
/// is interpreted as either a ship-shaped or cargo-shaped payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOracleEntry {
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleExtractionResponse {
    pub entries: Vec<RawOracleEntry>,
}
