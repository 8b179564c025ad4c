//! Operator log channel broadcast (§4.1 "broadcasts lifecycle events to
//! operator log channels", §6 "web-socket log broadcast"), ground truth
//! `realtime_status_logger.py`'s `LiveLogger`/`WebSocketManager`. Rocket's
//! WebSocket route subscribes to [`LiveLog::subscribe`] and forwards
//! whatever arrives; there is exactly one operator session, same as the
//! source's hardcoded `user_id = "1"`.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

/// Channel capacity: lagging subscribers drop the oldest entries rather
/// than blocking a producer task on a slow dashboard.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub channel: String,
    pub timestamp: String,
    pub message: String,
}

/// A single broadcast hub shared by every pipeline task and the one
/// operator WebSocket connection.
#[derive(Clone)]
pub struct LiveLog {
    sender: broadcast::Sender<LogEvent>,
}

impl LiveLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.sender.subscribe()
    }

    /// Report to a named channel (`gpt`, `info`, `error`, …). Silently
    /// drops the event if there are no subscribers — matching the source's
    /// `WebSocketManager.send_update_json`, which is a no-op when the
    /// operator dashboard isn't connected.
    pub fn report(&self, channel: &str, message: impl Into<String>) {
        let event = LogEvent {
            channel: channel.to_string(),
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            message: message.into(),
        };
        let _ = self.sender.send(event);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.report("info", message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.report("error", message);
    }

    pub fn gpt(&self, message: impl Into<String>) {
        self.report("gpt", message);
    }
}

impl Default for LiveLog {
    fn default() -> Self {
        Self::new()
    }
}
