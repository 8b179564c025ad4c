//! Matching engine (§4.6), ground truth `mq/handler.py`'s
//! `match_cargos_to_ship`: hard filter in the store, de-duplication and
//! (optionally) reference scoring in-process.

pub mod dedup;
pub mod scoring;

use crate::models::{Cargo, Ship};
use crate::store::Store;

/// Default top-K, per §4.6.
pub const DEFAULT_MAX_N: usize = 5;

/// Run the primary matching path: hard-filter candidates ordered by
/// ascending distance, then de-duplicate and stop at `max_n`. Returns an
/// empty list (rather than erroring) when the vessel isn't geocoded, same
/// as `hard_filter_candidates`.
pub async fn match_cargos_to_ship(
    store: &Store,
    ship: &Ship,
    max_n: usize,
) -> Result<Vec<Cargo>, sqlx::Error> {
    let candidates = store.hard_filter_candidates(ship).await?;
    Ok(dedup::dedup_and_truncate(candidates, max_n))
}
