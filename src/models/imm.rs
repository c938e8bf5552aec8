//! Interacting Multiple Model filter for one target.
//!
//! Each live target owns one [`ImmFilter`]: a Gaussian estimate per motion
//! model plus the model probabilities. Every frame the estimates are mixed
//! through the switching matrix, predicted per model, and — when an
//! observation is associated — updated with a per-model Kalman step that
//! also refreshes the model probabilities via Bayes' rule.

use crate::common::linalg::{kalman_update, log_gaussian_pdf, log_sum_exp, symmetrize};
use crate::models::motion::{ModelKind, MotionBank};
use nalgebra::{DMatrix, DVector};
use smallvec::SmallVec;

/// Gaussian estimate conditioned on one motion model.
#[derive(Debug, Clone)]
pub struct ModelEstimate {
    /// State mean
    pub mean: DVector<f64>,
    /// State covariance
    pub covariance: DMatrix<f64>,
}

/// IMM state of a single target.
#[derive(Debug, Clone)]
pub struct ImmFilter {
    /// Per-model estimates, in [`ModelKind::ALL`] order
    estimates: SmallVec<[ModelEstimate; ModelKind::COUNT]>,
    /// Model probabilities; always sum to 1
    model_probs: SmallVec<[f64; ModelKind::COUNT]>,
    /// Frames since the last associated observation (0 right after an update)
    gap_frames: u32,
}

impl ImmFilter {
    /// Initialize a newborn target from an observation.
    ///
    /// The observed position fills both the current and previous position
    /// slots, model probabilities start uniform.
    pub fn from_observation(z: &DVector<f64>, bank: &MotionBank) -> Self {
        let mean = bank.lift_observation(z);
        let covariance = bank.birth_covariance().clone();

        let estimates = ModelKind::ALL
            .iter()
            .map(|_| ModelEstimate {
                mean: mean.clone(),
                covariance: covariance.clone(),
            })
            .collect();
        let model_probs = ModelKind::ALL
            .iter()
            .map(|_| 1.0 / ModelKind::COUNT as f64)
            .collect();

        Self {
            estimates,
            model_probs,
            gap_frames: 0,
        }
    }

    /// Current model probabilities, in [`ModelKind::ALL`] order.
    pub fn model_probs(&self) -> &[f64] {
        &self.model_probs
    }

    /// The most probable motion model.
    pub fn dominant_model(&self) -> ModelKind {
        let idx = self
            .model_probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);
        ModelKind::ALL[idx]
    }

    /// Frames since the last associated observation.
    #[inline]
    pub fn gap_frames(&self) -> u32 {
        self.gap_frames
    }

    /// Count one frame without association.
    pub fn mark_missed(&mut self) {
        self.gap_frames += 1;
    }

    /// IMM interaction and prediction step.
    ///
    /// For each destination model j the model-conditioned estimates are
    /// mixed with weights `P(j|i) * mu_i`, moment-matched into one Gaussian
    /// and propagated through model j. The new model probabilities are the
    /// predicted ones; a subsequent [`update`](Self::update) refreshes them
    /// with the observation likelihood, a missed detection leaves them as
    /// they are.
    pub fn mix_and_predict(&mut self, bank: &MotionBank) {
        let n = ModelKind::COUNT;
        let trans = bank.model_transition();

        let mut predicted: SmallVec<[ModelEstimate; ModelKind::COUNT]> = SmallVec::new();
        let mut predicted_probs: SmallVec<[f64; ModelKind::COUNT]> = SmallVec::new();

        for (j, kind) in ModelKind::ALL.iter().enumerate() {
            // mixing weights mu_ij = P(j|i) * mu_i / mu_j
            let mut mu_ij: SmallVec<[f64; ModelKind::COUNT]> = SmallVec::new();
            let mut mu_j = 0.0;
            for i in 0..n {
                let w = trans.prob(i, j) * self.model_probs[i];
                mu_ij.push(w);
                mu_j += w;
            }
            if mu_j > 0.0 {
                for w in mu_ij.iter_mut() {
                    *w /= mu_j;
                }
            } else {
                // unreachable destination model; keep its own estimate
                for (i, w) in mu_ij.iter_mut().enumerate() {
                    *w = if i == j { 1.0 } else { 0.0 };
                }
            }

            // moment-matched mixture of the model-conditioned estimates
            let mut mixed_mean = DVector::zeros(self.estimates[0].mean.len());
            for i in 0..n {
                mixed_mean += &self.estimates[i].mean * mu_ij[i];
            }
            let mut mixed_cov = DMatrix::zeros(mixed_mean.len(), mixed_mean.len());
            for i in 0..n {
                let spread = &self.estimates[i].mean - &mixed_mean;
                mixed_cov += (&self.estimates[i].covariance + &spread * spread.transpose())
                    * mu_ij[i];
            }

            // Chapman-Kolmogorov prediction through model j
            let f = bank.transition(*kind);
            let mean = f * mixed_mean;
            let covariance = symmetrize(&(f * mixed_cov * f.transpose() + bank.process_noise()));

            predicted.push(ModelEstimate { mean, covariance });
            predicted_probs.push(mu_j);
        }

        let total: f64 = predicted_probs.iter().sum();
        if total > 0.0 {
            for p in predicted_probs.iter_mut() {
                *p /= total;
            }
        }

        self.estimates = predicted;
        self.model_probs = predicted_probs;
    }

    /// Predicted observation mean of the mixture (probability-weighted).
    pub fn predicted_observation_mean(&self, bank: &MotionBank) -> DVector<f64> {
        let h = bank.observation();
        let mut z = DVector::zeros(h.nrows());
        for (est, &p) in self.estimates.iter().zip(self.model_probs.iter()) {
            z += h * &est.mean * p;
        }
        z
    }

    /// Log-likelihood of an observation under the predicted mixture,
    /// `log Σ_j mu_j N(z; H x_j, H P_j Hᵀ + R)`.
    pub fn predictive_log_likelihood(&self, z: &DVector<f64>, bank: &MotionBank) -> f64 {
        let h = bank.observation();
        let r = bank.measurement_noise();

        let mut terms: SmallVec<[f64; ModelKind::COUNT]> = SmallVec::new();
        for (est, &p) in self.estimates.iter().zip(self.model_probs.iter()) {
            if p <= 0.0 {
                continue;
            }
            let z_pred = h * &est.mean;
            let s = h * &est.covariance * h.transpose() + r;
            terms.push(p.ln() + log_gaussian_pdf(z, &z_pred, &s));
        }
        log_sum_exp(&terms)
    }

    /// Measurement update with an associated observation.
    ///
    /// Updates every model-conditioned estimate with a Kalman step and
    /// refreshes the model probabilities with the per-model innovation
    /// likelihoods. Returns the marginal log-likelihood of the observation.
    pub fn update(&mut self, z: &DVector<f64>, bank: &MotionBank) -> f64 {
        let h = bank.observation();
        let r = bank.measurement_noise();

        let marginal = self.predictive_log_likelihood(z, bank);

        let mut new_probs: SmallVec<[f64; ModelKind::COUNT]> = SmallVec::new();
        for (est, &p) in self.estimates.iter_mut().zip(self.model_probs.iter()) {
            let (mean, covariance, likelihood) = kalman_update(&est.mean, &est.covariance, z, h, r);
            est.mean = mean;
            est.covariance = covariance;
            new_probs.push(p * likelihood);
        }

        let total: f64 = new_probs.iter().sum();
        if total > 0.0 {
            for p in new_probs.iter_mut() {
                *p /= total;
            }
            self.model_probs = new_probs;
        }
        // all likelihoods zero: keep the mixed probabilities

        self.gap_frames = 0;
        marginal
    }

    /// Probability-weighted combined estimate for reporting.
    pub fn combined_estimate(&self) -> ModelEstimate {
        let dim = self.estimates[0].mean.len();
        let mut mean = DVector::zeros(dim);
        for (est, &p) in self.estimates.iter().zip(self.model_probs.iter()) {
            mean += &est.mean * p;
        }
        let mut covariance = DMatrix::zeros(dim, dim);
        for (est, &p) in self.estimates.iter().zip(self.model_probs.iter()) {
            let spread = &est.mean - &mean;
            covariance += (&est.covariance + &spread * spread.transpose()) * p;
        }
        ModelEstimate { mean, covariance }
    }

    /// Position (x, y) of the combined estimate.
    pub fn position(&self) -> (f64, f64) {
        let est = self.combined_estimate();
        (est.mean[0], est.mean[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelTransition, TrackerParams};
    use approx::assert_abs_diff_eq;

    fn params() -> TrackerParams {
        TrackerParams {
            model_transition: ModelTransition::new(0.8, 0.2, 0.2, 0.8).unwrap(),
            rxy: 0.5,
            rsize: 0.1,
            qxy: 0.2,
            qxy_prev: 0.2,
            qsize: 0.05,
            ..TrackerParams::default()
        }
    }

    fn obs(x: f64, y: f64, s: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, y, s])
    }

    #[test]
    fn test_birth_starts_uniform_and_at_rest() {
        let p = params();
        let bank = MotionBank::new(&p);
        let filter = ImmFilter::from_observation(&obs(1.0, 2.0, 0.5), &bank);

        for &mp in filter.model_probs() {
            assert_abs_diff_eq!(mp, 0.5, epsilon = 1e-12);
        }
        let (x, y) = filter.position();
        assert_abs_diff_eq!(x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_model_probs_sum_to_one_through_cycle() {
        let p = params();
        let bank = MotionBank::new(&p);
        let mut filter = ImmFilter::from_observation(&obs(0.0, 0.0, 1.0), &bank);

        for step in 1..=5 {
            filter.mix_and_predict(&bank);
            let sum: f64 = filter.model_probs().iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);

            filter.update(&obs(step as f64, 0.0, 1.0), &bank);
            let sum: f64 = filter.model_probs().iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_linear_motion_favors_extrapolation() {
        let p = params();
        let bank = MotionBank::new(&p);
        let mut filter = ImmFilter::from_observation(&obs(0.0, 0.0, 1.0), &bank);

        // constant-velocity trajectory along x
        for step in 1..=8 {
            filter.mix_and_predict(&bank);
            filter.update(&obs(2.0 * step as f64, 0.0, 1.0), &bank);
        }

        assert_eq!(
            filter.dominant_model(),
            ModelKind::FirstOrderLinearExtrapolation
        );
    }

    #[test]
    fn test_update_improves_likelihood_of_observed_point() {
        let p = params();
        let bank = MotionBank::new(&p);
        let mut filter = ImmFilter::from_observation(&obs(0.0, 0.0, 1.0), &bank);

        filter.mix_and_predict(&bank);
        let before = filter.predictive_log_likelihood(&obs(1.0, 1.0, 1.0), &bank);
        filter.update(&obs(1.0, 1.0, 1.0), &bank);
        let after = filter.predictive_log_likelihood(&obs(1.0, 1.0, 1.0), &bank);
        assert!(after > before);
    }

    #[test]
    fn test_missed_detection_keeps_probabilities() {
        let p = params();
        let bank = MotionBank::new(&p);
        let mut filter = ImmFilter::from_observation(&obs(0.0, 0.0, 1.0), &bank);

        filter.mix_and_predict(&bank);
        let probs_before: Vec<f64> = filter.model_probs().to_vec();
        filter.mark_missed();
        assert_eq!(filter.model_probs(), probs_before.as_slice());
        assert_eq!(filter.gap_frames(), 1);
    }

    #[test]
    fn test_gap_resets_on_update() {
        let p = params();
        let bank = MotionBank::new(&p);
        let mut filter = ImmFilter::from_observation(&obs(0.0, 0.0, 1.0), &bank);

        filter.mix_and_predict(&bank);
        filter.mark_missed();
        filter.mix_and_predict(&bank);
        filter.mark_missed();
        assert_eq!(filter.gap_frames(), 2);

        filter.mix_and_predict(&bank);
        filter.update(&obs(0.0, 0.0, 1.0), &bank);
        assert_eq!(filter.gap_frames(), 0);
    }
}
