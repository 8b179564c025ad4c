//! Operator control surface (§4.8), ground truth `mq/api.py`'s
//! `/{action}/{task_type}/{name}`. Deliberately returns HTTP 200 with an
//! `{"error": "..."}` body on invalid input rather than a 4xx status, to
//! preserve the original dashboard's response contract.

use crate::realtime::LiveLog;
use crate::supervisor::TaskSupervisor;
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ControlResponse {
    Message { message: String },
    Error { error: String },
}

impl ControlResponse {
    fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self::Message { message: message.into() })
    }

    fn error(error: impl Into<String>) -> Json<Self> {
        Json(Self::Error { error: error.into() })
    }
}

/// `GET /control/<action>/<task_type>/<name>` (§4.8).
#[openapi(tag = "Control")]
#[get("/control/<action>/<task_type>/<name>")]
pub async fn control_task(
    action: &str,
    task_type: &str,
    name: &str,
    supervisor: &State<TaskSupervisor>,
    log: &State<LiveLog>,
) -> Json<ControlResponse> {
    if action != "start" && action != "end" {
        return ControlResponse::error(format!(
            "invalid action '{action}', expected 'start' or 'end'"
        ));
    }
    if task_type != "producer" && task_type != "consumer" {
        return ControlResponse::error(format!(
            "invalid task_type '{task_type}', expected 'producer' or 'consumer'"
        ));
    }

    let result = if action == "start" {
        supervisor.start(name).await
    } else {
        supervisor.stop(name).await
    };

    match result {
        Ok(()) => {
            let message = format!("Request to '{action}' '{task_type}' task '{name}' processed.");
            log.info(message.clone());
            ControlResponse::message(message)
        }
        Err(e) => {
            log.error(format!("control request failed: {e}"));
            ControlResponse::error(e.to_string())
        }
    }
}

/// `GET /control/describe` (§4.8): the dashboard's control-panel source.
#[openapi(tag = "Control")]
#[get("/control/describe")]
pub async fn describe_tasks(
    supervisor: &State<TaskSupervisor>,
) -> Json<Vec<crate::supervisor::TaskDescription>> {
    Json(supervisor.describe().await)
}
