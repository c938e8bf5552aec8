//! Candidate builder: spatial gating of live targets per observation.
//!
//! The proposal only considers targets whose predicted observation position
//! lies within `max_dist` of the observation, capped to the `max_num`
//! nearest. A zero value of either parameter disables the gate and every
//! live target becomes a candidate (the legacy unrestricted behavior). The
//! gate truncates the proposal support, so gated and ungated runs are
//! genuinely different samplers, not numerically equivalent ones.

use crate::types::{Observation, TargetId};

/// Live-target summary handed to the gate: ID plus predicted observation
/// position.
#[derive(Debug, Clone, Copy)]
pub struct TargetPosition {
    /// Target ID
    pub id: TargetId,
    /// Predicted observation x
    pub x: f64,
    /// Predicted observation y
    pub y: f64,
}

impl TargetPosition {
    /// Euclidean distance to an observation.
    #[inline]
    fn distance_to(&self, obs: &Observation) -> f64 {
        let dx = self.x - obs.x;
        let dy = self.y - obs.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Build the candidate target set for one observation.
///
/// Returns the IDs of all targets within `max_dist`, capped to the
/// `max_num` nearest, in ascending distance order. With `gate_enabled`
/// false every target is a candidate, in the given order.
pub fn gate_targets(
    obs: &Observation,
    targets: &[TargetPosition],
    max_num: usize,
    max_dist: f64,
    gate_enabled: bool,
) -> Vec<TargetId> {
    if !gate_enabled {
        return targets.iter().map(|t| t.id).collect();
    }

    let mut within: Vec<(f64, TargetId)> = targets
        .iter()
        .filter_map(|t| {
            let d = t.distance_to(obs);
            (d <= max_dist).then_some((d, t.id))
        })
        .collect();

    within.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    within.truncate(max_num);
    within.into_iter().map(|(_, id)| id).collect()
}
