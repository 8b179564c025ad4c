//! Dedup & Persist Consumer (§4.3), ground truth `mailbox_read_consumer`.

use crate::mail::MailMessage;
use crate::models::Email;
use crate::realtime::LiveLog;
use crate::store::Store;
use crate::supervisor::queues::{SharedReceiver, send_with_backpressure};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

pub async fn run(
    stop: CancellationToken,
    q1: SharedReceiver<MailMessage>,
    q2: Sender<Email>,
    store: Store,
    log: LiveLog,
) {
    log.info("dedup/persist consumer started");
    let mut q1 = q1.lock().await;

    loop {
        let message = tokio::select! {
            _ = stop.cancelled() => break,
            item = q1.recv() => match item {
                Some(m) => m,
                None => break,
            },
        };

        match store
            .find_duplicate_email(Some(message.id.as_str()).filter(|id| !id.is_empty()), &message.body)
            .await
        {
            Ok(Some(_)) => continue,
            Ok(None) => {}
            Err(e) => {
                log.error(format!("error checking for duplicate email: {e}"));
                continue;
            }
        }

        let email = match store
            .insert_email(
                Some(message.id.as_str()).filter(|id| !id.is_empty()),
                &message.body,
                &message.subject,
                &message.sender,
                &message.recipients,
                &message.date_received,
            )
            .await
        {
            Ok(email) => email,
            Err(e) => {
                log.error(format!("error persisting email: {e}"));
                continue;
            }
        };

        log.info(format!("email {} persisted", email.id));

        if send_with_backpressure(&q2, email, &stop, "Q2 (extraction)")
            .await
            .is_err()
        {
            break;
        }
    }

    log.info("dedup/persist consumer closed");
}
