//! Motion model bank and the per-target IMM filter.
//!
//! The model set is closed: a random walk and a first-order linear
//! extrapolation over a 5-dimensional state that retains the previous
//! position. [`MotionBank`] holds the shared matrices, [`ImmFilter`] the
//! per-target mixture over the two models.

pub mod imm;
pub mod motion;

pub use imm::ImmFilter;
pub use motion::{MotionBank, ModelKind, OBS_DIM, STATE_DIM};
