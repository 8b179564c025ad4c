//! Entity normalization (§4.4, §9): converts the free-text fields an oracle
//! entry carries into the derived numeric fields the matching engine queries
//! on. Grounded on the source system's `db.py` normalization helpers
//! (`extract_number`, `extract_weights`, `extract_month`, the commission
//! regex) — ported faithfully rather than reinvented, since the exact
//! thresholds are part of the contract tested in §8's scenarios.

use regex::Regex;
use std::sync::LazyLock;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\b").unwrap());
static COMMISSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+(?:\.\d+)?)\b").unwrap());

/// A number immediately followed by an explicit tonnage unit (`mt`, `mts`,
/// `dwt`, `ton(s)`). This number is already a precise tons figure, not the
/// broker-shorthand "thousands" notation the sub-1000 × 1000 heuristic exists
/// for (e.g. "DWT 13" meaning 13,000 dwt) — see §8 scenario 3, where
/// `"4387 Cbm/937 mts"` must read as 937, not 937,000, and the unrelated
/// `4387` (a volume in cubic metres, not a weight) must be ignored entirely.
static TONS_FIGURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*(?:m/?ts?|dwt|tons?)\b").unwrap());

fn explicit_tons_figure(text: &str) -> Option<i64> {
    TONS_FIGURE
        .captures(&text.replace(',', ""))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Default commission when the free-text field doesn't parse. Per spec §9
/// this is deliberately high: the 5.00 hard-filter cap in the matching
/// engine then excludes the cargo, preserving "no parseable commission →
/// do not match" semantics without a separate null-handling branch.
pub const DEFAULT_COMMISSION: f64 = 10.0;

/// Extract the first integer literal in `text`, ignoring thousands commas.
pub fn extract_number(text: &str) -> Option<i64> {
    let stripped = text.replace(',', "");
    INTEGER
        .captures(&stripped)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract a (min, max) pair of integer literals. A single literal yields
/// `(n, n)`; two or more literals use the first two, in order.
pub fn extract_weights(text: &str) -> Option<(i64, i64)> {
    let stripped = text.replace(',', "");
    let mut matches = INTEGER
        .captures_iter(&stripped)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<i64>().ok());

    let first = matches.next()?;
    match matches.next() {
        Some(second) => Some((first, second)),
        None => Some((first, first)),
    }
}

/// Case-insensitive substring match against the three-letter month
/// abbreviations; returns 1-12.
pub fn extract_month(text: &str) -> Option<i32> {
    let lower = text.to_lowercase();
    MONTHS
        .iter()
        .position(|m| lower.contains(m))
        .map(|idx| idx as i32 + 1)
}

/// Normalize a ship's free-text `capacity` into `capacity_int`, applying the
/// sub-1000 × 1000 k-tons heuristic (§3, §9: applied symmetrically to ship
/// capacity and cargo quantity per the spec's chosen reading).
pub fn normalize_capacity(capacity: &str) -> Option<i64> {
    extract_number(capacity).map(|n| if n < 1000 { n * 1000 } else { n })
}

/// Normalize a cargo's free-text `quantity` into `(quantity_min_int,
/// quantity_max_int)`. If the text names a number next to an explicit
/// tonnage unit (see [`explicit_tons_figure`]), that number alone is the
/// tons figure and is used unscaled for both bounds — it is already precise,
/// and any other number nearby (a volume, a different unit) is noise.
/// Otherwise falls back to the first two integer literals, each individually
/// subjected to the k-tons heuristic.
pub fn normalize_quantity(quantity: &str) -> (Option<i64>, Option<i64>) {
    if let Some(tons) = explicit_tons_figure(quantity) {
        return (Some(tons), Some(tons));
    }

    match extract_weights(quantity) {
        Some((min, max)) => {
            let scale = |n: i64| if n < 1000 { n * 1000 } else { n };
            (Some(scale(min)), Some(scale(max)))
        }
        None => (None, None),
    }
}

/// Parse a free-text commission percentage, defaulting to
/// [`DEFAULT_COMMISSION`] when no numeric literal is present.
pub fn normalize_commission(commission: &str) -> f64 {
    COMMISSION
        .captures(commission)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_COMMISSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_below_1000_is_scaled_to_k_tons() {
        assert_eq!(normalize_capacity("DWT 13"), Some(13000));
        assert_eq!(normalize_capacity("13898"), Some(13898));
    }

    #[test]
    fn quantity_with_two_numbers_keeps_each_bound_independent() {
        // Neither number carries an explicit ton unit, so each is rescaled
        // on its own merits: 4387 is already >=1000 and untouched, 13 is
        // read as k-tons shorthand.
        let (min, max) = normalize_quantity("4387/13");
        assert_eq!(min, Some(4387));
        assert_eq!(max, Some(13000));
    }

    #[test]
    fn single_number_quantity_sets_min_equals_max() {
        assert_eq!(normalize_quantity("25 mts"), (Some(25), Some(25)));
    }

    #[test]
    fn explicit_ton_unit_wins_over_an_unrelated_leading_number() {
        // §8 scenario 3: "4387 Cbm/937 mts" must normalize to (937, 937).
        // 4387 is a volume (Cbm), not a weight, and must not leak through.
        assert_eq!(
            normalize_quantity("4387 Cbm/937 mts"),
            (Some(937), Some(937))
        );
    }

    #[test]
    fn month_matches_substring_case_insensitively() {
        assert_eq!(extract_month("01-02 dec"), Some(12));
        assert_eq!(extract_month("11 Nov/Onwards"), Some(11));
        assert_eq!(extract_month("no month here"), None);
    }

    #[test]
    fn commission_parses_float_and_defaults_on_failure() {
        assert_eq!(normalize_commission("3.75%"), 3.75);
        assert_eq!(normalize_commission("n/a"), DEFAULT_COMMISSION);
    }
}
