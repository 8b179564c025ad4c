//! Ingest Producer (§2 component B), ground truth
//! `_mailbox_read_producer`: drives the Mail Source Adapter and enqueues
//! onto Q1 with backpressure.

use crate::mail::{MailSource, ReadOptions};
use crate::realtime::LiveLog;
use crate::supervisor::queues::send_with_backpressure;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// Pause between read cycles once the adapter reports no further
/// continuation (§5: the generator is "exhausted").
const EXHAUSTED_BACKOFF: Duration = Duration::from_secs(10);
/// Pacing pause between yielded batches, so a saturated mailbox doesn't
/// spin the producer in a tight loop.
const BATCH_PACING: Duration = Duration::from_millis(200);

pub async fn run(
    stop: CancellationToken,
    source: Arc<dyn MailSource>,
    q1: Sender<crate::mail::MailMessage>,
    log: LiveLog,
    most_recent_first: bool,
) {
    log.info("ingest producer started");

    while !stop.is_cancelled() {
        let options = ReadOptions {
            most_recent_first,
            ..ReadOptions::default()
        };

        let pages = match source.read_batches(options, &stop).await {
            Ok(pages) => pages,
            Err(e) => {
                log.error(format!("error reading emails from mailbox: {e}"));
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(EXHAUSTED_BACKOFF) => {}
                }
                continue;
            }
        };

        if pages.is_empty() {
            log.info("no emails found in mailbox");
        }

        for page in pages {
            for message in page {
                if send_with_backpressure(&q1, message, &stop, "Q1 (mailbox)")
                    .await
                    .is_err()
                {
                    log.info("ingest producer stopping mid-batch");
                    return;
                }
            }
            tokio::select! {
                _ = stop.cancelled() => return,
                _ = tokio::time::sleep(BATCH_PACING) => {}
            }
        }

        log.info("email generator exhausted, waiting before next cycle");
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(EXHAUSTED_BACKOFF) => {}
        }
    }

    log.info("ingest producer closed");
}
