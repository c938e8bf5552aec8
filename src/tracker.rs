//! End-to-end tracking pipeline.
//!
//! Glues the sampler, the consensus extractor and the output labeling:
//! estimate unset parameters from the data, run the RBMCDA frame loop,
//! compute the particles' joint probabilities, build the vote graph, prune
//! weak edges, partition, and label.

use crate::common::linalg::{log_sum_exp, normalize_log_weights};
use crate::config::TrackerParams;
use crate::consensus::{partition_tracks, tracks_to_labels, NodeId, ObservationAdjacency};
use crate::errors::{ConfigError, TrackerError};
use crate::sampler::{effective_sample_size, RbmcdaSampler, SampleRecord};
use crate::types::MultiState;

/// Everything a finished run produces.
#[derive(Debug)]
pub struct TrackerOutput {
    /// Consensus labeling of the input observations
    pub consensus: MultiState,
    /// Accepted tracks as `(frame, observation)` node lists
    pub tracks: Vec<Vec<NodeId>>,
    /// The pruned vote graph the tracks were extracted from
    pub adjacency: ObservationAdjacency,
    /// Each particle's labeling of the input observations
    pub sample_observations: Vec<MultiState>,
    /// Normalized joint association probability per particle
    pub sample_probs: Vec<f64>,
    /// Number of resampling events during the run
    pub resample_count: usize,
}

/// RBMCDA-IMM tracker over a complete observation sequence.
#[derive(Debug, Clone)]
pub struct MultiObservationTracker {
    params: TrackerParams,
}

impl MultiObservationTracker {
    /// Create a tracker; parameters are validated up front.
    pub fn new(params: TrackerParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Parameters after construction (before data-driven estimation).
    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Run the tracker over a complete sequence.
    pub fn run(&self, observations: &MultiState) -> Result<TrackerOutput, TrackerError> {
        if observations.is_empty() {
            return Err(TrackerError::EmptyInput);
        }

        let params = self.effective_params(observations)?;

        // ---- RBMCDA-IMM frame loop ----
        let mut sampler = RbmcdaSampler::new(params.clone())?;
        sampler.seed_from_frame(&observations.frames[0]);
        for (t, frame) in observations.frames.iter().enumerate() {
            log::debug!("tracking frame {} ({} observations)", t, frame.len());
            sampler.step(t, frame);
        }
        let resample_count = sampler.resample_count();
        let particles = sampler.into_particles();

        // ---- joint association probabilities ----
        let records: Vec<SampleRecord> = particles.iter().map(|p| p.record.clone()).collect();
        let sample_probs = joint_probabilities(&records, observations.len());

        // ---- consensus graph ----
        let mut adjacency = ObservationAdjacency::new(observations, &records, &sample_probs);

        let threshold = edge_threshold(&sample_probs);
        if threshold > 0.0 {
            let total = adjacency.num_edges();
            let dropped = adjacency.zero_below(threshold);
            log::info!(
                "edge pruning: {} of {} vote edges below {:.4} set to zero",
                dropped,
                total,
                threshold
            );
        }

        // ---- partition and label ----
        let tracks = partition_tracks(&adjacency);
        let labels = tracks_to_labels(observations, &tracks);
        let consensus = observations.relabeled(&labels);

        let frame_sizes: Vec<usize> = observations.frames.iter().map(|f| f.len()).collect();
        let sample_observations = particles
            .iter()
            .map(|p| observations.relabeled(&p.labels(&frame_sizes)))
            .collect();

        log::info!(
            "run finished: {} tracks, {} resampling events",
            tracks.len(),
            resample_count
        );

        Ok(TrackerOutput {
            consensus,
            tracks,
            adjacency,
            sample_observations,
            sample_probs,
            resample_count,
        })
    }

    /// Fill data-driven parameters and re-validate.
    ///
    /// A zero clutter intensity and a negative detection probability request
    /// estimation from the per-frame observation counts; the sqrt-size range
    /// always comes from the data and is widened to at least the measurement
    /// noise scale.
    fn effective_params(&self, observations: &MultiState) -> Result<TrackerParams, ConfigError> {
        let mut params = self.params.clone();

        let mut counts: Vec<usize> = observations.frames.iter().map(|f| f.len()).collect();
        counts.sort_unstable();
        let median = counts[counts.len() / 2];

        if params.lambda_clutter == 0.0 {
            let excess: usize = counts
                .iter()
                .filter(|&&c| c > median)
                .map(|&c| c - median)
                .sum();
            params.lambda_clutter = excess as f64 / counts.len() as f64;
            log::info!(
                "estimated LambdaClutter = {:.4} (median target count {})",
                params.lambda_clutter,
                median
            );
        }

        if params.p_detect < 0.0 {
            let shortfall: usize = counts
                .iter()
                .filter(|&&c| c < median)
                .map(|&c| median - c)
                .sum();
            params.p_detect = if median > 0 {
                1.0 - shortfall as f64 / (counts.len() * median) as f64
            } else {
                1.0
            };
            log::info!("estimated PDetect = {:.4}", params.p_detect);
        }

        // sqrt-size range from the data, widened so the uniform density is
        // at least as wide as the measurement noise
        let mut s_min = f64::INFINITY;
        let mut s_max = f64::NEG_INFINITY;
        for frame in &observations.frames {
            for obs in &frame.observations {
                s_min = s_min.min(obs.sqrt_size);
                s_max = s_max.max(obs.sqrt_size);
            }
        }
        if s_min.is_finite() && s_max.is_finite() {
            let min_half_range = (3.0 * params.rsize).sqrt();
            let center = 0.5 * (s_min + s_max);
            if 0.5 * (s_max - s_min) < min_half_range {
                s_min = center - min_half_range;
                s_max = center + min_half_range;
            }
            params.sqrt_size_min = s_min;
            params.sqrt_size_max = s_max;
        }

        params.validate()?;
        Ok(params)
    }
}

/// Normalized joint association probability per particle.
///
/// Accumulates each particle's per-frame conditional log-probabilities with
/// a per-frame renormalization, which keeps the running values in a sane
/// numerical range over long sequences.
fn joint_probabilities(records: &[SampleRecord], num_frames: usize) -> Vec<f64> {
    let n = records.len();
    let mut logp = vec![0.0; n];

    for t in 0..num_frames {
        for (i, record) in records.iter().enumerate() {
            logp[i] += record.frame_log_probs.get(t).copied().unwrap_or(0.0);
        }
        let lse = log_sum_exp(&logp);
        if lse.is_finite() {
            for lp in logp.iter_mut() {
                *lp -= lse;
            }
        }
    }

    if log_sum_exp(&logp) == f64::NEG_INFINITY {
        return vec![1.0 / n as f64; n];
    }
    normalize_log_weights(&logp)
}

/// Vote threshold for edge pruning.
///
/// Edges that fewer (weighted) particles vote for than the mass of the
/// top `ESS - 1` particles leave behind are considered noise: the threshold
/// is the total probability minus the largest joint probabilities, one per
/// effective sample.
fn edge_threshold(sample_probs: &[f64]) -> f64 {
    let ess = effective_sample_size(sample_probs);

    let mut sorted = sample_probs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = sorted.iter().sum();
    let mut threshold = total - sorted.last().copied().unwrap_or(0.0);
    let mut i = 2usize;
    while (i as f64) <= ess - 1.0 && i <= sorted.len() {
        threshold -= sorted[sorted.len() - i];
        i += 1;
    }
    threshold.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelTransition;
    use crate::types::{Frame, Observation};

    fn params(n: usize) -> TrackerParams {
        TrackerParams {
            random_seed: 99,
            num_samples: n,
            x_min: 0.0,
            x_max: 100.0,
            y_min: 0.0,
            y_max: 100.0,
            p_detect: 0.95,
            lambda_birth: 0.2,
            lambda_clutter: 0.5,
            lambda_death: 0.05,
            model_transition: ModelTransition::new(0.9, 0.1, 0.1, 0.9).unwrap(),
            rxy: 0.5,
            rsize: 0.1,
            qxy: 0.3,
            qxy_prev: 0.3,
            qsize: 0.05,
            ..TrackerParams::default()
        }
    }

    fn line_sequence(len: usize) -> MultiState {
        MultiState::new(
            (0..len)
                .map(|t| {
                    Frame::new(vec![Observation::new(10.0 + 2.0 * t as f64, 20.0, 1.0)])
                })
                .collect(),
        )
    }

    #[test]
    fn test_empty_input_rejected() {
        let tracker = MultiObservationTracker::new(params(4)).unwrap();
        assert!(matches!(
            tracker.run(&MultiState::default()),
            Err(TrackerError::EmptyInput)
        ));
    }

    #[test]
    fn test_single_track_recovered() {
        let tracker = MultiObservationTracker::new(params(16)).unwrap();
        let output = tracker.run(&line_sequence(8)).unwrap();

        assert_eq!(output.sample_observations.len(), 16);
        assert_eq!(output.sample_probs.len(), 16);
        let sum: f64 = output.sample_probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(output.consensus.len(), 8);
    }

    #[test]
    fn test_joint_probabilities_normalized() {
        let mut r1 = SampleRecord::default();
        r1.frame_log_probs = vec![-1.0, -1.0];
        let mut r2 = SampleRecord::default();
        r2.frame_log_probs = vec![-2.0, -0.5];

        let probs = joint_probabilities(&[r1, r2], 2);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        // r1 has higher joint log prob (-2.0 vs -2.5)
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_edge_threshold_single_sample_is_zero() {
        assert_eq!(edge_threshold(&[1.0]), 0.0);
    }

    #[test]
    fn test_edge_threshold_uniform() {
        // ESS = 4: threshold strips the top three weights
        let t = edge_threshold(&[0.25; 4]);
        assert!((t - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_estimation_of_clutter_and_detection() {
        let mut p = params(4);
        p.lambda_clutter = 0.0;
        p.p_detect = -1.0;
        let tracker = MultiObservationTracker::new(p).unwrap();

        // frames with 1, 1, 2, 1 observations: median 1, one excess
        let ms = MultiState::new(vec![
            Frame::new(vec![Observation::new(10.0, 10.0, 1.0)]),
            Frame::new(vec![Observation::new(11.0, 10.0, 1.0)]),
            Frame::new(vec![
                Observation::new(12.0, 10.0, 1.0),
                Observation::new(70.0, 70.0, 1.0),
            ]),
            Frame::new(vec![Observation::new(13.0, 10.0, 1.0)]),
        ]);

        let effective = tracker.effective_params(&ms).unwrap();
        assert!((effective.lambda_clutter - 0.25).abs() < 1e-12);
        assert!((effective.p_detect - 1.0).abs() < 1e-12);
        // sqrt-size range widened to the noise scale
        assert!(effective.sqrt_size_max > effective.sqrt_size_min);
    }
}
