use rocket::http::Status;
use rocket::routes;
use shipbroker_pipeline::routes::health::{HealthResponse, live_health};
use shipbroker_pipeline::test_support::TestRocketBuilder;

#[test]
fn health_endpoint_returns_ok() {
    let client = TestRocketBuilder::new()
        .mount_api_routes(routes![live_health])
        .blocking_client();

    let response = client.get("/api/v1/health/live").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: HealthResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.status, "ok");
}
