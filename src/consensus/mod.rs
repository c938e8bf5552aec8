//! Consensus labeling across all particles.
//!
//! The particles' per-frame association records merge into a weighted
//! observation graph ([`adjacency`]); greedy partitioning ([`partition`])
//! extracts one final labeling independent of any single particle.

pub mod adjacency;
pub mod dot;
pub mod partition;

pub use adjacency::{NodeId, ObservationAdjacency};
pub use dot::write_dot_graph;
pub use partition::{partition_tracks, tracks_to_labels};
