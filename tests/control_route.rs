use rocket::http::Status;
use rocket::local::asynchronous::Client;
use shipbroker_pipeline::realtime::LiveLog;
use shipbroker_pipeline::routes::control::{ControlResponse, control_task, describe_tasks};
use shipbroker_pipeline::supervisor::{TaskDescription, TaskSupervisor};

async fn test_client() -> Client {
    let rocket = rocket::build()
        .manage(TaskSupervisor::new())
        .manage(LiveLog::new())
        .mount("/api/v1", rocket::routes![control_task, describe_tasks]);

    Client::tracked(rocket).await.expect("valid Rocket instance")
}

#[rocket::async_test]
async fn unknown_action_returns_200_with_error_body() {
    let client = test_client().await;

    let response = client
        .get("/api/v1/control/bogus/producer/mailbox_read_producer")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: ControlResponse = response.into_json().await.expect("valid JSON payload");
    assert!(matches!(body, ControlResponse::Error { .. }));
}

#[rocket::async_test]
async fn starting_an_unregistered_task_returns_200_with_error_body() {
    let client = test_client().await;

    let response = client
        .get("/api/v1/control/start/producer/nonexistent_task")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: ControlResponse = response.into_json().await.expect("valid JSON payload");
    assert!(matches!(body, ControlResponse::Error { .. }));
}

#[rocket::async_test]
async fn describe_lists_every_registered_task() {
    let supervisor = TaskSupervisor::new();
    supervisor.register("mailbox_read_producer", |stop, _n| {
        tokio::spawn(async move {
            stop.cancelled().await;
        })
    });

    let rocket = rocket::build()
        .manage(supervisor)
        .manage(LiveLog::new())
        .mount("/api/v1", rocket::routes![control_task, describe_tasks]);
    let client = Client::tracked(rocket).await.expect("valid Rocket instance");

    let response = client.get("/api/v1/control/describe").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let descriptions: Vec<TaskDescription> = response.into_json().await.expect("valid JSON payload");
    assert_eq!(descriptions.len(), 1);
    assert_eq!(descriptions[0].name, "mailbox_read_producer");
    assert!(!descriptions[0].running);
    assert_eq!(descriptions[0].start_url, "/api/v1/control/start/producer/mailbox_read_producer");
    assert_eq!(descriptions[0].stop_url, "/api/v1/control/end/producer/mailbox_read_producer");
}
