//! Observation-to-target association.
//!
//! [`candidates`] builds the bounded set of plausible associations for each
//! observation, [`proposal`] scores the set and samples one association with
//! the matching importance-weight correction.

pub mod candidates;
pub mod proposal;

pub use candidates::gate_targets;
pub use proposal::{sample_association, Candidate, ProposalOutcome};
