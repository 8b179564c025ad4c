//! Reference scoring (§4.6 "Scoring (reference, ...)"), ground truth
//! `mq/scoring.py`. Used as a fallback when the hard filter's geospatial
//! ordering isn't viable (e.g. the vessel isn't geocoded) and a ranked list
//! is still wanted.

use crate::models::{Cargo, Ship};
use chrono::{DateTime, Utc};

pub fn capacity_modifier(ship: &Ship, cargo: &Cargo) -> f64 {
    let Some(capacity) = ship.capacity_int else {
        return 0.0;
    };
    let capacity = capacity as f64;

    let (Some(min), Some(max)) = (cargo.quantity_min_int, cargo.quantity_max_int) else {
        return -2.0;
    };
    let (min, max) = (min as f64, max as f64);

    if capacity < min * 0.90 {
        return -5.0;
    }

    let mut score = 0.0;
    if capacity > min {
        score += 1.0;
    }
    if capacity > max * 0.85 {
        score += 2.0;
    }
    if (max * 0.95..=max * 1.10).contains(&capacity) {
        score += 4.0;
    }
    if capacity > max * 1.5 {
        score -= 2.0;
    }
    if capacity > max * 2.0 {
        score -= 5.0;
    }
    score
}

pub fn month_modifier(ship: &Ship, cargo: &Cargo) -> f64 {
    let Some(ship_month) = ship.month_int else {
        return 0.0;
    };

    match cargo.month_int {
        Some(cargo_month) if ship_month == cargo_month => 3.0,
        Some(cargo_month) if (ship_month - cargo_month).abs() == 1 => 0.0,
        Some(_) => -5.0,
        None => -2.0,
    }
}

pub fn commission_modifier(cargo: &Cargo) -> f64 {
    match cargo.commission_float {
        Some(c) if c <= 1.25 => 6.0,
        Some(c) if c <= 2.5 => 3.0,
        Some(c) if c <= 3.75 => 1.0,
        Some(c) if c <= 4.0 => 0.0,
        Some(c) if c <= 5.0 => -1.0,
        Some(_) => -6.0,
        None => 0.0,
    }
}

/// Cargo age relative to the *ship's* record creation time, matching
/// `timestamp_created_modifier` in `mq/scoring.py` exactly (the comparison
/// basis is the ship, not wall-clock "now").
pub fn recency_modifier(ship_created: DateTime<Utc>, cargo_created: DateTime<Utc>) -> f64 {
    let days = (cargo_created - ship_created).num_days();
    if days <= 3 {
        5.0
    } else if days <= 7 {
        2.0
    } else if days <= 14 {
        0.0
    } else if days <= 30 {
        -2.0
    } else {
        -5.0
    }
}

pub fn total_score(ship: &Ship, cargo: &Cargo) -> f64 {
    capacity_modifier(ship, cargo) + month_modifier(ship, cargo) + commission_modifier(cargo)
        + recency_modifier(ship.timestamp_created, cargo.timestamp_created)
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
    }
}

fn median(sorted: &[f64]) -> f64 {
    percentile(sorted, 50.0)
}

/// Robust median/IQR normalization into `[min_val, max_val]`, ground truth
/// `min_max_scale_robust`. A zero IQR (every score identical) maps every
/// value to the midpoint rather than dividing by zero.
pub fn min_max_scale_robust(data: &[f64], min_val: f64, max_val: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let med = median(&sorted);
    let q25 = percentile(&sorted, 25.0);
    let q75 = percentile(&sorted, 75.0);
    let iqr = q75 - q25;

    data.iter()
        .map(|&value| {
            let scaled = if iqr == 0.0 { 0.0 } else { (value - med) / iqr };
            let clipped = scaled.clamp(-1.0, 1.0);
            0.5 * (clipped + 1.0) * (max_val - min_val) + min_val
        })
        .collect()
}

/// Score every candidate, robustly normalize, and sort descending —
/// the full reference-scoring fallback path.
pub fn rank_by_score(ship: &Ship, candidates: Vec<Cargo>) -> Vec<(Cargo, f64)> {
    let raw_scores: Vec<f64> = candidates.iter().map(|c| total_score(ship, c)).collect();
    let normalized = min_max_scale_robust(&raw_scores, -0.1, 1.0);

    let mut ranked: Vec<(Cargo, f64)> = candidates.into_iter().zip(normalized).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_matches_numpy_linear_interpolation() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 50.0), 2.5);
        assert_eq!(percentile(&sorted, 25.0), 1.75);
    }

    #[test]
    fn scale_robust_clips_outliers_into_range() {
        let data = vec![-5.0, 0.0, 0.0, 0.0, 100.0];
        let scaled = min_max_scale_robust(&data, -0.1, 1.0);
        for value in &scaled {
            assert!(*value >= -0.1 && *value <= 1.0);
        }
        assert_eq!(scaled[4], 1.0);
    }

    #[test]
    fn constant_scores_scale_to_midpoint() {
        let data = vec![3.0, 3.0, 3.0];
        let scaled = min_max_scale_robust(&data, -0.1, 1.0);
        assert!(scaled.iter().all(|v| (*v - 0.45).abs() < 1e-9));
    }
}
