//! Liveness/readiness endpoints used by the operator and by tests.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[openapi(tag = "Health")]
#[get("/health/live")]
pub fn live_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

#[openapi(tag = "Health")]
#[get("/health/ready")]
pub async fn ready_health(pool: &State<PgPool>) -> Json<HealthResponse> {
    let status = match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool.inner()).await {
        Ok(_) => "ok",
        Err(e) => {
            log::error!("readiness check failed: {e}");
            "degraded"
        }
    };
    Json(HealthResponse { status: status.to_string() })
}
