#![allow(dead_code)] // not every test target uses every helper

//! Scenario builders shared by the integration tests.
//!
//! Synthetic sequences with known groundtruth: targets on linear paths,
//! optional Poisson clutter and detection thinning, all driven by the
//! deterministic test RNG.

use rbmcda_tracker_rs::common::rng::{Rng, SimpleRng};
use rbmcda_tracker_rs::config::{ModelTransition, TrackerParams};
use rbmcda_tracker_rs::types::{Frame, MultiState, Observation, TargetId};

/// A target moving on a straight line with unit size.
pub struct LinearTarget {
    pub id: TargetId,
    pub start: (f64, f64),
    pub velocity: (f64, f64),
}

/// Build a fully observed, clutter-free sequence of linear targets.
pub fn linear_scenario(num_frames: usize, targets: &[LinearTarget]) -> MultiState {
    let frames = (0..num_frames)
        .map(|t| {
            let observations = targets
                .iter()
                .map(|target| {
                    Observation::labeled(
                        target.start.0 + target.velocity.0 * t as f64,
                        target.start.1 + target.velocity.1 * t as f64,
                        1.0,
                        target.id,
                    )
                })
                .collect();
            Frame::new(observations)
        })
        .collect();
    MultiState::new(frames)
}

/// Append Poisson clutter uniform over the region to every frame.
pub fn add_clutter(
    observations: &mut MultiState,
    rng: &mut SimpleRng,
    lambda: f64,
    region: (f64, f64, f64, f64),
) {
    let (x_min, x_max, y_min, y_max) = region;
    for frame in &mut observations.frames {
        let count = rng.poissrnd(lambda);
        for _ in 0..count {
            let x = x_min + rng.rand() * (x_max - x_min);
            let y = y_min + rng.rand() * (y_max - y_min);
            frame
                .observations
                .push(Observation::labeled(x, y, 1.0, 0));
        }
    }
}

/// Drop target observations with probability `1 - p_detect`.
pub fn thin_detections(observations: &mut MultiState, rng: &mut SimpleRng, p_detect: f64) {
    for frame in &mut observations.frames {
        frame
            .observations
            .retain(|obs| obs.target_id == 0 || rng.rand() < p_detect);
    }
}

/// Parameters matching the synthetic scenarios above.
pub fn scenario_params(seed: u64, num_samples: usize) -> TrackerParams {
    TrackerParams {
        random_seed: seed,
        num_samples,
        delta_t: 1.0,
        x_min: 0.0,
        x_max: 100.0,
        y_min: 0.0,
        y_max: 100.0,
        sqrt_size_min: 0.5,
        sqrt_size_max: 2.0,
        p_detect: 0.95,
        lambda_birth: 0.2,
        lambda_clutter: 0.5,
        lambda_death: 0.05,
        model_transition: ModelTransition::new(0.9, 0.1, 0.1, 0.9).unwrap(),
        rxy: 0.5,
        rsize: 0.1,
        qxy: 0.4,
        qxy_prev: 0.4,
        qsize: 0.05,
        ess_percentage: 0.5,
        max_num_neighbors: 0,
        max_dist_neighbors: 0.0,
        no_neighbors_old_algo: false,
    }
}

/// Group a labeled sequence into its track partition: one sorted node list
/// per nonzero ID, ordered by first node. ID numbering drops out, so two
/// labelings of the same partition compare equal.
pub fn partition_of(observations: &MultiState) -> Vec<Vec<(usize, usize)>> {
    use std::collections::BTreeMap;

    let mut tracks: BTreeMap<TargetId, Vec<(usize, usize)>> = BTreeMap::new();
    for (t, frame) in observations.frames.iter().enumerate() {
        for (m, obs) in frame.observations.iter().enumerate() {
            if obs.target_id != 0 {
                tracks.entry(obs.target_id).or_default().push((t, m));
            }
        }
    }
    let mut partition: Vec<Vec<(usize, usize)>> = tracks.into_values().collect();
    partition.sort();
    partition
}
