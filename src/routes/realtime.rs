//! Operator log WebSocket (§4.8), ground truth
//! `realtime_status_logger.py`'s `WebSocketManager`. Not part of the OpenAPI
//! document — `rocket_ws` channels aren't request/response and don't fit
//! the schema.

use crate::realtime::LiveLog;
use futures_util::SinkExt;
use rocket::State;
use rocket_ws::{Channel, Message, WebSocket};

#[derive(serde::Serialize)]
struct Frame<'a> {
    channel: &'a str,
    message: &'a str,
}

/// `GET /control/ws` (§4.8): streams every broadcast log event as a JSON
/// frame until the client disconnects.
#[get("/control/ws")]
pub fn control_ws(ws: WebSocket, log: &State<LiveLog>) -> Channel<'static> {
    let mut rx = log.subscribe();
    ws.channel(move |mut stream| {
        Box::pin(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let frame = Frame {
                            channel: &event.channel,
                            message: &event.message,
                        };
                        let Ok(json) = serde_json::to_string(&frame) else { continue };
                        if stream.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            Ok(())
        })
    })
}
