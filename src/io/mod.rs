//! Observation file I/O and run outputs.
//!
//! The primary on-disk format is a small schema-versioned XML document; a
//! plain whitespace-separated region list serves as the read fallback. All
//! file I/O happens outside the sampling loop.

pub mod observations;
pub mod outputs;

pub use observations::{
    read_multistate, read_region_set, write_multistate, SCHEMA_VERSION,
};
pub use outputs::{sample_file_name, write_probs, write_run_outputs};
