//! The closed set of motion models and the shared measurement model.
//!
//! State layout: `[x, y, x_prev, y_prev, sqrt_size]`. The retained previous
//! position is what gives the linear extrapolation model its velocity
//! estimate without an explicit velocity component.

use crate::config::{ModelTransition, TrackerParams};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Dimension of the kinematic state vector.
pub const STATE_DIM: usize = 5;

/// Dimension of the observation vector `[x, y, sqrt_size]`.
pub const OBS_DIM: usize = 3;

/// The motion models of the bank.
///
/// A closed enum instead of trait objects: the set is fixed and exhaustively
/// known, so dispatch is a match and banks are plain arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Positional diffusion only
    RandomWalk,
    /// Position propagated linearly from the retained previous position
    FirstOrderLinearExtrapolation,
}

impl ModelKind {
    /// All models, in bank order.
    pub const ALL: [ModelKind; 2] = [
        ModelKind::RandomWalk,
        ModelKind::FirstOrderLinearExtrapolation,
    ];

    /// Number of models in the bank.
    pub const COUNT: usize = Self::ALL.len();

    /// Index of this model within the bank.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            ModelKind::RandomWalk => 0,
            ModelKind::FirstOrderLinearExtrapolation => 1,
        }
    }

    /// Model for a bank index, if valid.
    pub fn from_index(idx: usize) -> Option<ModelKind> {
        Self::ALL.get(idx).copied()
    }
}

/// Shared matrices of the motion and measurement models.
///
/// Built once per run from the configured noise variances; every IMM filter
/// borrows the bank instead of owning matrix copies.
#[derive(Debug, Clone)]
pub struct MotionBank {
    /// State transition matrix per model, in [`ModelKind::ALL`] order
    transitions: [DMatrix<f64>; ModelKind::COUNT],
    /// Process noise covariance, shared by both models
    process_noise: DMatrix<f64>,
    /// Observation matrix picking `[x, y, sqrt_size]` out of the state
    observation: DMatrix<f64>,
    /// Measurement noise covariance
    measurement_noise: DMatrix<f64>,
    /// Lift of an observation vector into state space (for target births)
    state_from_obs: DMatrix<f64>,
    /// Covariance of a newborn target's state
    birth_covariance: DMatrix<f64>,
    /// Model switching probabilities
    model_transition: ModelTransition,
}

impl MotionBank {
    /// Build the bank from the configured noise variances.
    pub fn new(params: &TrackerParams) -> Self {
        // Random walk: position persists, previous position trails current
        #[rustfmt::skip]
        let f_rw = DMatrix::from_row_slice(STATE_DIM, STATE_DIM, &[
            1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0,
            1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 1.0,
        ]);

        // First-order linear extrapolation: x' = 2x - x_prev
        #[rustfmt::skip]
        let f_fle = DMatrix::from_row_slice(STATE_DIM, STATE_DIM, &[
            2.0, 0.0, -1.0,  0.0, 0.0,
            0.0, 2.0,  0.0, -1.0, 0.0,
            1.0, 0.0,  0.0,  0.0, 0.0,
            0.0, 1.0,  0.0,  0.0, 0.0,
            0.0, 0.0,  0.0,  0.0, 1.0,
        ]);

        let process_noise = DMatrix::from_diagonal(&DVector::from_vec(vec![
            params.qxy,
            params.qxy,
            params.qxy_prev,
            params.qxy_prev,
            params.qsize,
        ]));

        #[rustfmt::skip]
        let observation = DMatrix::from_row_slice(OBS_DIM, STATE_DIM, &[
            1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 1.0,
        ]);

        let measurement_noise = DMatrix::from_diagonal(&DVector::from_vec(vec![
            params.rxy,
            params.rxy,
            params.rsize,
        ]));

        // A birth copies the observed position into both the current and the
        // previous position slot, so the extrapolation model starts at rest.
        #[rustfmt::skip]
        let state_from_obs = DMatrix::from_row_slice(STATE_DIM, OBS_DIM, &[
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
        ]);

        let birth_covariance = DMatrix::from_diagonal(&DVector::from_vec(vec![
            params.rxy,
            params.rxy,
            params.rxy,
            params.rxy,
            params.rsize,
        ]));

        Self {
            transitions: [f_rw, f_fle],
            process_noise,
            observation,
            measurement_noise,
            state_from_obs,
            birth_covariance,
            model_transition: params.model_transition,
        }
    }

    /// State transition matrix of a model.
    #[inline]
    pub fn transition(&self, kind: ModelKind) -> &DMatrix<f64> {
        &self.transitions[kind.index()]
    }

    /// Process noise covariance (shared by both models).
    #[inline]
    pub fn process_noise(&self) -> &DMatrix<f64> {
        &self.process_noise
    }

    /// Observation matrix.
    #[inline]
    pub fn observation(&self) -> &DMatrix<f64> {
        &self.observation
    }

    /// Measurement noise covariance.
    #[inline]
    pub fn measurement_noise(&self) -> &DMatrix<f64> {
        &self.measurement_noise
    }

    /// Lift an observation vector into state space.
    pub fn lift_observation(&self, z: &DVector<f64>) -> DVector<f64> {
        &self.state_from_obs * z
    }

    /// Covariance assigned to a newborn target's state.
    #[inline]
    pub fn birth_covariance(&self) -> &DMatrix<f64> {
        &self.birth_covariance
    }

    /// Model switching probabilities.
    #[inline]
    pub fn model_transition(&self) -> &ModelTransition {
        &self.model_transition
    }
}
