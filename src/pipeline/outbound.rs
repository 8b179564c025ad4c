//! Outbound Mail Producer (§4.7), ground truth `email_send_producer`.

use crate::mail::MailSource;
use crate::models::Ship;
use crate::realtime::LiveLog;
use crate::store::Store;
use crate::supervisor::queues::SharedReceiver;
use std::sync::Arc;
use std::time::Duration;
use tera::{Context, Tera};
use tokio_util::sync::CancellationToken;

/// Pause on an empty Q4 dequeue.
const EMPTY_BACKOFF: Duration = Duration::from_secs(2);
const SUBJECT: &str = "Cargo Matching";

pub async fn run(
    stop: CancellationToken,
    q4: SharedReceiver<Ship>,
    store: Store,
    mail: Arc<dyn MailSource>,
    templates: Arc<Tera>,
    log: LiveLog,
) {
    log.info("outbound mail producer started");
    let mut q4 = q4.lock().await;

    loop {
        let ship = tokio::select! {
            _ = stop.cancelled() => break,
            item = q4.recv() => match item {
                Some(s) => s,
                None => break,
            },
        };

        let cargo_ids = &ship.pairs_with.0;
        if cargo_ids.is_empty() {
            log.error(format!(
                "ship {} reached outbound with no matching cargoes",
                ship.id
            ));
            continue;
        }

        let cargos = match store.get_cargos_by_ids(cargo_ids).await {
            Ok(cargos) => cargos,
            Err(e) => {
                log.error(format!("error loading cargoes for ship {}: {e}", ship.id));
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(EMPTY_BACKOFF) => continue,
                };
            }
        };

        let mut context = Context::new();
        context.insert("ship", &ship);
        context.insert("cargos", &cargos);
        context.insert("email", &ship.email.0);

        let body = match templates.render("to_ship.txt", &context) {
            Ok(body) => body,
            Err(e) => {
                log.error(format!("error rendering email body for ship {}: {e}", ship.id));
                continue;
            }
        };

        let recipient = ship.email.0.sender.clone();
        match mail.send(&recipient, SUBJECT, &body).await {
            Ok(true) => log.info(format!("match email sent to {recipient} for ship {}", ship.id)),
            Ok(false) => log.error(format!("error sending email to {recipient}")),
            Err(e) => log.error(format!("error sending email to {recipient}: {e}")),
        }
    }

    log.info("outbound mail producer closed");
}
