//! Particle state: one association hypothesis and its filter bank.

use crate::common::rng::SimpleRng;
use crate::models::ImmFilter;
use crate::types::{FrameAssociations, TargetId};
use std::collections::BTreeMap;

/// Bookkeeping of one particle's sampled history.
///
/// Tracks are kept as sorted `(frame, observation)` index lists per target
/// ID, with ID 0 collecting the clutter assignments. The per-frame log
/// probabilities of the sampled association sets accumulate into the joint
/// probability reported at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct SampleRecord {
    /// Log probability of each frame's sampled association set, conditional
    /// on the previous associations and all observations up to that frame
    pub frame_log_probs: Vec<f64>,
    /// Observation indices per target ID; key 0 holds clutter
    pub tracks: BTreeMap<TargetId, Vec<(usize, usize)>>,
}

impl SampleRecord {
    /// Append one frame's associations.
    pub fn add_frame(&mut self, frame_idx: usize, assoc: &FrameAssociations, log_prob: f64) {
        self.frame_log_probs.push(log_prob);

        for (m, entry) in assoc.entries.iter().enumerate() {
            let id = entry.target_id().unwrap_or(0);
            self.tracks.entry(id).or_default().push((frame_idx, m));
        }
    }

    /// Joint log probability of all sampled associations so far.
    pub fn joint_log_prob(&self) -> f64 {
        self.frame_log_probs.iter().sum()
    }

    /// IDs of all targets that ever existed in this hypothesis.
    pub fn target_ids(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.tracks.keys().copied().filter(|&id| id != 0)
    }
}

/// One RBMCDA sample: a complete association history plus the filter bank
/// of the targets it currently believes in.
///
/// Particles share no mutable state. `parent` records the resampling
/// ancestor for lineage diagnostics only.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Live targets, keyed by ID (ordered for deterministic iteration)
    pub filters: BTreeMap<TargetId, ImmFilter>,
    /// One association record per processed frame
    pub associations: Vec<FrameAssociations>,
    /// Normalized log importance weight
    pub log_weight: f64,
    /// ID handed to the next birth in this hypothesis
    pub next_target_id: TargetId,
    /// Index of the resampling ancestor in the previous generation
    pub parent: usize,
    /// This particle's private random stream
    pub rng: SimpleRng,
    /// Sampled-history bookkeeping
    pub record: SampleRecord,
}

impl Particle {
    /// Fresh particle with no targets and the given stream.
    pub fn new(index: usize, log_weight: f64, rng: SimpleRng) -> Self {
        Self {
            filters: BTreeMap::new(),
            associations: Vec::new(),
            log_weight,
            next_target_id: 1,
            parent: index,
            rng,
            record: SampleRecord::default(),
        }
    }

    /// Linear-scale weight.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.log_weight.exp()
    }

    /// Number of live targets.
    #[inline]
    pub fn num_targets(&self) -> usize {
        self.filters.len()
    }

    /// Per-frame labels of this particle's hypothesis.
    ///
    /// Tracks with a single observation are relabeled clutter, matching the
    /// interpretation used for the per-sample output files.
    pub fn labels(&self, frame_sizes: &[usize]) -> Vec<Vec<TargetId>> {
        let mut labels: Vec<Vec<TargetId>> =
            frame_sizes.iter().map(|&n| vec![0; n]).collect();

        for (&id, nodes) in &self.record.tracks {
            if id == 0 || nodes.len() < 2 {
                continue;
            }
            for &(t, m) in nodes {
                labels[t][m] = id;
            }
        }
        labels
    }
}
