//! In-process de-duplication of hard-filter results (§4.6).

use crate::models::Cargo;
use std::collections::HashSet;

/// The tuple identity spec'd for duplicate suppression. `f64` commission is
/// carried as bits so the key is `Eq`/`Hash`; two cargoes with the exact
/// same parsed commission compare equal, which is the intent (NaN never
/// appears here — `commission_float` is always a successfully parsed or
/// defaulted value).
type DedupKey = (Option<String>, Option<i64>, Option<i64>, Option<i32>, Option<u64>);

fn dedup_key(cargo: &Cargo) -> DedupKey {
    (
        cargo.name.clone(),
        cargo.quantity_min_int,
        cargo.quantity_max_int,
        cargo.month_int,
        cargo.commission_float.map(f64::to_bits),
    )
}

/// Keep the first-seen occurrence of each duplicate key (the nearest, since
/// `candidates` arrives pre-ordered by ascending distance) and stop once
/// `limit` unique cargoes have accumulated.
pub fn dedup_and_truncate(candidates: Vec<Cargo>, limit: usize) -> Vec<Cargo> {
    let mut seen = HashSet::with_capacity(limit);
    let mut result = Vec::with_capacity(limit);

    for cargo in candidates {
        let key = dedup_key(&cargo);
        if seen.insert(key) {
            result.push(cargo);
            if result.len() == limit {
                break;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailSnapshot;
    use chrono::Utc;
    use sqlx::types::Json;

    fn cargo(id: i64, name: &str, min: i64, max: i64, month: i32, commission: f64) -> Cargo {
        Cargo {
            id,
            name: Some(name.to_string()),
            quantity: None,
            location_from: Json(Default::default()),
            location_to: Json(Default::default()),
            month: None,
            commission: None,
            keyword_data: String::new(),
            quantity_min_int: Some(min),
            quantity_max_int: Some(max),
            month_int: Some(month),
            commission_float: Some(commission),
            location_from_geocoded: Json(None),
            location_to_geocoded: Json(None),
            email: Json(EmailSnapshot {
                email_id: 1,
                provider_message_id: None,
                subject: String::new(),
                sender: String::new(),
                body: String::new(),
            }),
            timestamp_created: Utc::now(),
            pairs_with: Json(Vec::new()),
        }
    }

    #[test]
    fn keeps_first_occurrence_of_each_duplicate_key() {
        let candidates = vec![
            cargo(1, "Wheat", 1000, 2000, 6, 2.5),
            cargo(2, "Wheat", 1000, 2000, 6, 2.5),
            cargo(3, "Barley", 1000, 2000, 6, 2.5),
        ];

        let result = dedup_and_truncate(candidates, 10);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, 1);
        assert_eq!(result[1].id, 3);
    }

    #[test]
    fn stops_once_limit_unique_cargoes_accumulate() {
        let candidates = vec![
            cargo(1, "Wheat", 1000, 2000, 6, 2.5),
            cargo(2, "Barley", 1000, 2000, 6, 2.5),
            cargo(3, "Maize", 1000, 2000, 6, 2.5),
        ];

        let result = dedup_and_truncate(candidates, 2);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, 1);
        assert_eq!(result[1].id, 2);
    }

    #[test]
    fn distinct_commission_floats_are_not_merged() {
        let candidates = vec![
            cargo(1, "Wheat", 1000, 2000, 6, 2.5),
            cargo(2, "Wheat", 1000, 2000, 6, 3.75),
        ];

        let result = dedup_and_truncate(candidates, 10);

        assert_eq!(result.len(), 2);
    }
}
