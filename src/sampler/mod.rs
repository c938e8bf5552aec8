//! The RBMCDA particle sampler.
//!
//! A [`Particle`] is one complete association hypothesis with its own filter
//! bank; [`RbmcdaSampler`] drives the weighted set frame by frame and
//! resamples it when the effective sample size collapses.

pub mod particle;
pub mod rbmcda;
pub mod resampling;

pub use particle::{Particle, SampleRecord};
pub use rbmcda::RbmcdaSampler;
pub use resampling::{effective_sample_size, systematic_indices};
