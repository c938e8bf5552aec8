//! Effective sample size and systematic resampling.

use crate::common::rng::Rng;

/// Effective sample size: `ESS = 1 / sum(w_i^2)` for normalized weights.
///
/// Ranges from 1 (degenerate) to N (uniform weights).
pub fn effective_sample_size(weights: &[f64]) -> f64 {
    let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
    if sum_sq > 0.0 {
        1.0 / sum_sq
    } else {
        0.0
    }
}

/// O(N) systematic resampling with a single uniform draw.
///
/// Returns one ancestor index per slot, drawn proportionally to the
/// normalized weights with minimal variance.
pub fn systematic_indices(rng: &mut impl Rng, weights: &[f64]) -> Vec<usize> {
    let n = weights.len();
    let mut indices = Vec::with_capacity(n);
    let u0 = rng.rand() / n as f64;
    let mut cumulative = 0.0;
    let mut j = 0;
    for i in 0..n {
        let threshold = u0 + i as f64 / n as f64;
        while cumulative + weights[j] < threshold && j + 1 < n {
            cumulative += weights[j];
            j += 1;
        }
        indices.push(j);
    }
    indices
}
