//! The four bounded stage queues (§4.1, ground truth `mq/handler.py`'s
//! `MQ_MAILBOX` / `MQ_GPT_EMAIL_TO_DB` / `MQ_ITEM_MATCHING` / `MQ_EMAIL_SEND`).

use crate::mail::MailMessage;
use crate::models::{Email, Ship};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio_util::sync::CancellationToken;

pub const Q1_CAPACITY: usize = 2000;
pub const Q2_CAPACITY: usize = 500;
pub const Q3_CAPACITY: usize = 1500;
pub const Q4_CAPACITY: usize = 20;

/// Backpressure retry interval, §4.1 "Producers must use non-blocking
/// enqueue... sleep `attempt_interval` (5 s default) then retry".
pub const ATTEMPT_INTERVAL: Duration = Duration::from_secs(5);

/// A consumer's receiving end, shared under a mutex rather than handed out
/// by value. The Task Supervisor can stop and restart the same consumer
/// task many times over the process's life (§4.1); an owned `Receiver`
/// moved into one spawned task would be dropped with it on the first stop,
/// leaving nothing for a restart to consume from.
pub type SharedReceiver<T> = Arc<Mutex<Receiver<T>>>;

/// All four stage queues, constructed together so their capacities stay in
/// one place. Q1 carries raw adapter output (pre-dedup); Q2 carries the
/// persisted `Email` row the Extraction pool needs an id from.
pub struct Queues {
    pub q1_tx: Sender<MailMessage>,
    pub q1_rx: SharedReceiver<MailMessage>,
    pub q2_tx: Sender<Email>,
    pub q2_rx: SharedReceiver<Email>,
    pub q3_tx: Sender<Ship>,
    pub q3_rx: SharedReceiver<Ship>,
    pub q4_tx: Sender<Ship>,
    pub q4_rx: SharedReceiver<Ship>,
}

impl Queues {
    pub fn new() -> Self {
        let (q1_tx, q1_rx) = channel(Q1_CAPACITY);
        let (q2_tx, q2_rx) = channel(Q2_CAPACITY);
        let (q3_tx, q3_rx) = channel(Q3_CAPACITY);
        let (q4_tx, q4_rx) = channel(Q4_CAPACITY);
        Self {
            q1_tx,
            q1_rx: Arc::new(Mutex::new(q1_rx)),
            q2_tx,
            q2_rx: Arc::new(Mutex::new(q2_rx)),
            q3_tx,
            q3_rx: Arc::new(Mutex::new(q3_rx)),
            q4_tx,
            q4_rx: Arc::new(Mutex::new(q4_rx)),
        }
    }
}

impl Default for Queues {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking enqueue with stop-signal-aware backpressure retry (§4.1).
/// Returns `Ok(())` once sent, or `Err(())` if `stop` fires before the send
/// succeeds.
pub async fn send_with_backpressure<T: Send>(
    tx: &Sender<T>,
    mut item: T,
    stop: &CancellationToken,
    channel_name: &str,
) -> Result<(), ()> {
    loop {
        match tx.try_send(item) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(()),
            Err(TrySendError::Full(returned)) => {
                item = returned;
                log::warn!("{channel_name} full, backing off {:?}", ATTEMPT_INTERVAL);
                tokio::select! {
                    _ = stop.cancelled() => return Err(()),
                    _ = tokio::time::sleep(ATTEMPT_INTERVAL) => {}
                }
            }
        }
    }
}
