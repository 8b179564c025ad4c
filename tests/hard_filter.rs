//! Integration coverage for the matching engine's hard filter (§4.6,
//! §8 scenarios 4 and 5): the single largest query in the store, exercised
//! here against a real Postgres instance since its predicate leans on the
//! `cube`/`earthdistance` extensions that can't be faked in a unit test.

use chrono::Utc;
use shipbroker_pipeline::models::{EmailSnapshot, GeoPoint, GeocodedLocation, Location, Ship};
use shipbroker_pipeline::store::Store;
use shipbroker_pipeline::test_support::{TestDatabase, TestDatabaseError};
use sqlx::migrate::Migrator;
use sqlx::types::Json;
use sqlx::PgPool;

static TEST_MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const ROTTERDAM: (f64, f64) = (4.4777, 51.9244);
const HOUSTON: (f64, f64) = (-95.3698, 29.7604);
const HAMBURG: (f64, f64) = (9.9937, 53.5511);

async fn provision() -> Option<TestDatabase> {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping hard filter test: TEST_DATABASE_URL not set");
            return None;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };
    let pool = test_db.pool_clone();
    TEST_MIGRATOR.run(&pool).await.expect("migrations run");
    Some(test_db)
}

fn dummy_email() -> Json<EmailSnapshot> {
    Json(EmailSnapshot {
        email_id: 1,
        provider_message_id: None,
        subject: "test".to_string(),
        sender: "broker@example.com".to_string(),
        body: "test body".to_string(),
    })
}

/// A ship anchored at `(lon, lat)` with the given capacity/month, nothing
/// else the hard filter reads populated.
fn ship_at(lon: f64, lat: f64, capacity_int: i64, month_int: i32) -> Ship {
    Ship {
        id: 0,
        name: None,
        status: None,
        month: None,
        capacity: None,
        location: Json(Location::default()),
        keyword_data: String::new(),
        capacity_int: Some(capacity_int),
        month_int: Some(month_int),
        location_geocoded: Json(Some(GeocodedLocation {
            name: "anchor".to_string(),
            address: "anchor".to_string(),
            location: GeoPoint::new(lon, lat),
            raw: serde_json::Value::Null,
        })),
        email: dummy_email(),
        timestamp_created: Utc::now(),
        pairs_with: Json(Vec::new()),
        timestamp_pairs_updated: None,
    }
}

#[allow(clippy::too_many_arguments)]
async fn insert_cargo(
    pool: &PgPool,
    name: &str,
    quantity_min_int: i64,
    quantity_max_int: i64,
    month_int: i32,
    commission_float: f64,
    from_lon: f64,
    from_lat: f64,
) -> i64 {
    let geocoded = Json(Some(GeocodedLocation {
        name: name.to_string(),
        address: name.to_string(),
        location: GeoPoint::new(from_lon, from_lat),
        raw: serde_json::Value::Null,
    }));

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO cargos
            (name, quantity, location_from, location_to, month, commission, keyword_data,
             quantity_min_int, quantity_max_int, month_int, commission_float,
             location_from_geocoded, location_to_geocoded, from_longitude, from_latitude,
             email)
        VALUES ($1, $2, $3, $4, $5, $6, '', $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind("0/0")
    .bind(Json(Location::default()))
    .bind(Json(Location::default()))
    .bind("")
    .bind("")
    .bind(quantity_min_int)
    .bind(quantity_max_int)
    .bind(month_int)
    .bind(commission_float)
    .bind(&geocoded)
    .bind(&geocoded)
    .bind(from_lon)
    .bind(from_lat)
    .bind(dummy_email())
    .fetch_one(pool)
    .await
    .expect("cargo insert succeeds")
}

/// §8 scenario 4: a vessel anchored near Rotterdam, two otherwise-identical
/// candidate cargoes loading from Houston (~7,800 km) and Hamburg
/// (~450 km). Only the Hamburg cargo is within the 1,500 km `$near` radius.
#[tokio::test]
async fn excludes_candidates_outside_the_match_radius() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let store = Store::new(pool.clone());

    let hamburg_id = insert_cargo(&pool, "hamburg load", 25000, 33000, 12, 3.5, HAMBURG.0, HAMBURG.1).await;
    let _houston_id = insert_cargo(&pool, "houston load", 25000, 33000, 12, 3.5, HOUSTON.0, HOUSTON.1).await;

    let ship = ship_at(ROTTERDAM.0, ROTTERDAM.1, 30000, 12);
    let candidates = store.hard_filter_candidates(&ship).await.expect("hard filter query succeeds");

    assert_eq!(candidates.len(), 1, "only the Hamburg cargo should survive the radius filter");
    assert_eq!(candidates[0].id, hamburg_id);

    test_db.close().await.expect("failed to drop test database");
}

/// §8 scenario 5: a commission above the 5.00% cap is excluded outright,
/// even when every other predicate (capacity, month, distance) matches.
#[tokio::test]
async fn excludes_candidates_above_the_commission_cap() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let store = Store::new(pool.clone());

    insert_cargo(&pool, "too expensive", 25000, 33000, 12, 6.0, HAMBURG.0, HAMBURG.1).await;
    let cheap_id = insert_cargo(&pool, "within cap", 25000, 33000, 12, 3.5, HAMBURG.0, HAMBURG.1).await;

    let ship = ship_at(ROTTERDAM.0, ROTTERDAM.1, 30000, 12);
    let candidates = store.hard_filter_candidates(&ship).await.expect("hard filter query succeeds");

    assert_eq!(candidates.len(), 1, "the 6.0% commission cargo should be excluded by the hard filter");
    assert_eq!(candidates[0].id, cheap_id);

    test_db.close().await.expect("failed to drop test database");
}

/// Ordering half of scenario 4: when both candidates pass every predicate,
/// `$near` orders ascending by distance from the ship's anchor.
#[tokio::test]
async fn orders_surviving_candidates_by_ascending_distance() {
    let Some(test_db) = provision().await else { return };
    let pool = test_db.pool_clone();
    let store = Store::new(pool.clone());

    // Both within the 1,500 km radius of Rotterdam; Hamburg is closer than
    // a point further up the North Sea coast.
    let far_id = insert_cargo(&pool, "farther", 25000, 33000, 12, 3.5, 10.6866, 59.9139).await; // Oslo, ~930 km
    let near_id = insert_cargo(&pool, "nearer", 25000, 33000, 12, 3.5, HAMBURG.0, HAMBURG.1).await;

    let ship = ship_at(ROTTERDAM.0, ROTTERDAM.1, 30000, 12);
    let candidates = store.hard_filter_candidates(&ship).await.expect("hard filter query succeeds");

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].id, near_id, "Hamburg should rank ahead of Oslo");
    assert_eq!(candidates[1].id, far_id);

    test_db.close().await.expect("failed to drop test database");
}
