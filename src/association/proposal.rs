//! Association proposal distribution.
//!
//! For one observation the candidate set is scored as
//!
//! - existing target n: `PDetect * N(z; z_n, S_n)` under the target's
//!   predicted IMM mixture,
//! - birth:   `LambdaBirth * u(z)`,
//! - clutter: `LambdaClutter * u(z)`,
//!
//! with `u` the uniform density over the observation volume. The proposal
//! samples proportionally to these scores, which makes it the exact
//! conditional over the candidate set; the importance correction for the
//! particle weight is then the log normalization constant.

use crate::common::linalg::log_sum_exp;
use crate::common::rng::Rng;
use crate::config::TrackerParams;
use crate::models::{ImmFilter, MotionBank};
use crate::types::TargetId;
use nalgebra::DVector;

/// One association option for an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// Assign to an existing target
    Existing(TargetId),
    /// Start a new target
    Birth,
    /// Classify as a false positive
    Clutter,
}

/// Result of sampling one observation's association.
#[derive(Debug, Clone, Copy)]
pub struct ProposalOutcome {
    /// The sampled association
    pub choice: Candidate,
    /// Log of the normalization constant of the candidate scores; the
    /// multiplicative importance-weight correction for this observation
    pub log_weight_increment: f64,
    /// Log probability of the sampled choice under the proposal
    pub log_choice_prob: f64,
}

/// Sample the association of one observation.
///
/// `candidates` is the gated target set (IDs must have live filters in
/// `lookup`). Targets already claimed by an earlier observation of the same
/// frame must not appear in `candidates`. If every score vanishes the
/// observation falls back to clutter so it is never left unassigned.
pub fn sample_association<'a, F>(
    rng: &mut impl Rng,
    z: &DVector<f64>,
    candidates: &[TargetId],
    lookup: F,
    bank: &MotionBank,
    params: &TrackerParams,
) -> ProposalOutcome
where
    F: Fn(TargetId) -> &'a ImmFilter,
{
    let log_u = params.log_uniform_density();

    // scores in log domain: [clutter, birth, candidates...]
    let mut log_scores = Vec::with_capacity(candidates.len() + 2);
    log_scores.push(if params.lambda_clutter > 0.0 {
        params.lambda_clutter.ln() + log_u
    } else {
        f64::NEG_INFINITY
    });
    log_scores.push(if params.lambda_birth > 0.0 {
        params.lambda_birth.ln() + log_u
    } else {
        f64::NEG_INFINITY
    });

    let log_p_detect = if params.p_detect > 0.0 {
        params.p_detect.ln()
    } else {
        f64::NEG_INFINITY
    };
    for &id in candidates {
        let filter = lookup(id);
        log_scores.push(log_p_detect + filter.predictive_log_likelihood(z, bank));
    }

    let log_norm = log_sum_exp(&log_scores);
    if log_norm == f64::NEG_INFINITY {
        // Numerical degeneracy: every option has zero score. The observation
        // still gets assigned; clutter with its baseline intensity.
        log::warn!("all association scores vanished; falling back to clutter");
        return ProposalOutcome {
            choice: Candidate::Clutter,
            log_weight_increment: 0.0,
            log_choice_prob: 0.0,
        };
    }

    // categorical draw over the normalized scores; rounding may leave the
    // accumulated mass slightly below 1, in which case the draw falls back
    // to the last option with nonzero probability
    let u = rng.rand();
    let mut acc = 0.0;
    let mut chosen = None;
    let mut last_valid = 0;
    for (idx, &ls) in log_scores.iter().enumerate() {
        let p = (ls - log_norm).exp();
        if p > 0.0 {
            last_valid = idx;
        }
        acc += p;
        if u < acc {
            chosen = Some(idx);
            break;
        }
    }
    let chosen = chosen.unwrap_or(last_valid);

    let choice = match chosen {
        0 => Candidate::Clutter,
        1 => Candidate::Birth,
        n => Candidate::Existing(candidates[n - 2]),
    };

    ProposalOutcome {
        choice,
        log_weight_increment: log_norm,
        log_choice_prob: log_scores[chosen] - log_norm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::rng::SimpleRng;
    use crate::config::TrackerParams;
    use crate::models::ImmFilter;
    use std::collections::BTreeMap;

    fn setup() -> (TrackerParams, MotionBank) {
        let params = TrackerParams {
            x_min: 0.0,
            x_max: 100.0,
            y_min: 0.0,
            y_max: 100.0,
            sqrt_size_min: 0.5,
            sqrt_size_max: 2.0,
            p_detect: 0.9,
            lambda_birth: 0.1,
            lambda_clutter: 0.5,
            ..TrackerParams::default()
        };
        let bank = MotionBank::new(&params);
        (params, bank)
    }

    fn obs(x: f64, y: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, y, 1.0])
    }

    #[test]
    fn test_nearby_target_dominates() {
        let (params, bank) = setup();
        let mut filters = BTreeMap::new();
        let mut f = ImmFilter::from_observation(&obs(10.0, 10.0), &bank);
        f.mix_and_predict(&bank);
        filters.insert(1u32, f);

        let mut rng = SimpleRng::new(7);
        let mut existing = 0;
        for _ in 0..200 {
            let outcome = sample_association(
                &mut rng,
                &obs(10.0, 10.0),
                &[1],
                |id| &filters[&id],
                &bank,
                &params,
            );
            if outcome.choice == Candidate::Existing(1) {
                existing += 1;
            }
        }
        // a target sitting on the observation should win nearly always
        assert!(existing > 180, "existing chosen {} of 200", existing);
    }

    #[test]
    fn test_no_candidates_splits_birth_clutter() {
        let (params, bank) = setup();
        let filters: BTreeMap<u32, ImmFilter> = BTreeMap::new();

        let mut rng = SimpleRng::new(11);
        let mut births = 0;
        let mut clutter = 0;
        for _ in 0..300 {
            let outcome = sample_association(
                &mut rng,
                &obs(50.0, 50.0),
                &[],
                |id| &filters[&id],
                &bank,
                &params,
            );
            match outcome.choice {
                Candidate::Birth => births += 1,
                Candidate::Clutter => clutter += 1,
                Candidate::Existing(_) => panic!("no targets exist"),
            }
        }
        // lambda_clutter / lambda_birth = 5: clutter should clearly dominate
        assert!(clutter > births * 2);
        assert!(births > 0);
    }

    #[test]
    fn test_degenerate_scores_fall_back_to_clutter() {
        let (mut params, _) = setup();
        params.lambda_birth = 0.0;
        params.lambda_clutter = 0.0;
        params.p_detect = 0.0;
        let bank = MotionBank::new(&params);
        let filters: BTreeMap<u32, ImmFilter> = BTreeMap::new();

        let mut rng = SimpleRng::new(3);
        let outcome = sample_association(
            &mut rng,
            &obs(1.0, 1.0),
            &[],
            |id| &filters[&id],
            &bank,
            &params,
        );
        assert_eq!(outcome.choice, Candidate::Clutter);
        assert_eq!(outcome.log_weight_increment, 0.0);
    }

    #[test]
    fn test_choice_prob_is_normalized() {
        let (params, bank) = setup();
        let mut filters = BTreeMap::new();
        let mut f = ImmFilter::from_observation(&obs(10.0, 10.0), &bank);
        f.mix_and_predict(&bank);
        filters.insert(1u32, f);

        let mut rng = SimpleRng::new(5);
        let outcome = sample_association(
            &mut rng,
            &obs(12.0, 9.0),
            &[1],
            |id| &filters[&id],
            &bank,
            &params,
        );
        assert!(outcome.log_choice_prob <= 0.0);
        assert!(outcome.log_weight_increment.is_finite());
    }
}
