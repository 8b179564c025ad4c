//! Match Consumer (§4.6), ground truth `item_matching_consumer`.

use crate::matching::{self, DEFAULT_MAX_N};
use crate::models::Ship;
use crate::realtime::LiveLog;
use crate::store::Store;
use crate::supervisor::queues::{SharedReceiver, send_with_backpressure};
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// Pause before retrying a ship whose matching query errored. `recv()`
/// already awaits the next item instead of polling, so there's no
/// empty-dequeue sleep to port from the original's polling loop.
const ERROR_BACKOFF: Duration = Duration::from_secs(2);

pub async fn run(
    stop: CancellationToken,
    q3: SharedReceiver<Ship>,
    q4: Sender<Ship>,
    store: Store,
    log: LiveLog,
) {
    log.info("match consumer started");
    let mut q3 = q3.lock().await;

    loop {
        let ship = tokio::select! {
            _ = stop.cancelled() => break,
            item = q3.recv() => match item {
                Some(s) => s,
                None => break,
            },
        };

        let candidates = match matching::match_cargos_to_ship(&store, &ship, DEFAULT_MAX_N).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log.error(format!("error matching ship {}: {e}", ship.id));
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => continue,
                };
            }
        };

        let cargo_ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();

        if let Err(e) = store.set_pairs(ship.id, &cargo_ids).await {
            log.error(format!("error saving matches for ship {}: {e}", ship.id));
            continue;
        }

        log.info(format!(
            "ship {} matched against {} cargoes",
            ship.id,
            cargo_ids.len()
        ));

        if cargo_ids.is_empty() {
            continue;
        }

        if send_with_backpressure(&q4, ship, &stop, "Q4 (outbound)")
            .await
            .is_err()
        {
            break;
        }
    }

    log.info("match consumer closed");
}
