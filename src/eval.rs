//! Track evaluation over labeled observation sequences.
//!
//! [`sequence_stats`] summarizes one labeled sequence: per-frame counts of
//! observations, clutter and births, and the association-gap distribution
//! of target observations. [`evaluate`] compares a tracker output against a
//! groundtruth sequence of the same frame layout.
//!
//! IDs are only compared *within* a sequence (to trace gaps); cross-sequence
//! comparison uses per-observation clutter labels and `(frame, observation)`
//! segments, so an output with renumbered track IDs evaluates correctly.

use crate::errors::EvalError;
use crate::types::{MultiState, TargetId, CLUTTER_ID};
use std::collections::{BTreeSet, HashMap};

/// Sample mean and variance of a sequence of counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountStats {
    /// Sample mean
    pub mean: f64,
    /// Unbiased sample variance
    pub variance: f64,
}

impl CountStats {
    /// Compute mean and unbiased variance of the counts.
    pub fn from_counts(counts: &[usize]) -> Self {
        if counts.is_empty() {
            return Self {
                mean: 0.0,
                variance: 0.0,
            };
        }
        let n = counts.len() as f64;
        let mean = counts.iter().sum::<usize>() as f64 / n;
        let variance = if counts.len() > 1 {
            counts
                .iter()
                .map(|&c| {
                    let d = c as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / (n - 1.0)
        } else {
            0.0
        };
        Self { mean, variance }
    }
}

/// Statistics of one labeled observation sequence.
#[derive(Debug, Clone)]
pub struct SequenceStats {
    /// Per-frame observation counts
    pub observations: CountStats,
    /// Per-frame clutter counts
    pub clutter: CountStats,
    /// Per-frame birth counts (first appearance of an ID after frame 0)
    pub births: CountStats,
    /// Target observations with a later reappearance of their ID, plus
    /// track-final observations
    pub detections: usize,
    /// Frames skipped between consecutive observations of the same ID
    pub missed_detections: usize,
    /// `histogram[g]` counts association gaps of `g` frames; a gap of 1 is
    /// a detection in the directly following frame
    pub gap_histogram: Vec<usize>,
}

impl SequenceStats {
    /// Relative frequency of detections,
    /// `detections / (detections + missed detections)`.
    pub fn detection_rate(&self) -> f64 {
        let total = self.detections + self.missed_detections;
        if total == 0 {
            0.0
        } else {
            self.detections as f64 / total as f64
        }
    }
}

/// Summarize one labeled sequence.
pub fn sequence_stats(observations: &MultiState) -> SequenceStats {
    let num_frames = observations.len();
    let mut obs_counts = vec![0usize; num_frames];
    let mut clutter_counts = vec![0usize; num_frames];
    let mut birth_counts = vec![0usize; num_frames];

    let mut seen: BTreeSet<TargetId> = BTreeSet::new();
    // last sighting of each ID, for gap computation
    let mut last_seen: HashMap<TargetId, usize> = HashMap::new();

    let mut detections = 0usize;
    let mut missed = 0usize;
    let mut gap_histogram: Vec<usize> = Vec::new();

    for (t, frame) in observations.frames.iter().enumerate() {
        obs_counts[t] = frame.len();

        for obs in &frame.observations {
            let id = obs.target_id;
            if id == CLUTTER_ID {
                clutter_counts[t] += 1;
                continue;
            }

            detections += 1;

            if seen.insert(id) {
                if t > 0 {
                    birth_counts[t] += 1;
                }
            } else if let Some(&prev) = last_seen.get(&id) {
                let gap = t - prev;
                missed += gap - 1;
                if gap_histogram.len() <= gap {
                    gap_histogram.resize(gap + 1, 0);
                }
                gap_histogram[gap] += 1;
            }
            last_seen.insert(id, t);
        }
    }

    SequenceStats {
        observations: CountStats::from_counts(&obs_counts),
        clutter: CountStats::from_counts(&clutter_counts),
        births: CountStats::from_counts(&birth_counts),
        detections,
        missed_detections: missed,
        gap_histogram,
    }
}

/// Per-observation clutter confusion between two sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClutterConfusion {
    /// Clutter in both sequences
    pub true_positive: usize,
    /// Clutter only in the candidate
    pub false_positive: usize,
    /// Target in both sequences
    pub true_negative: usize,
    /// Clutter only in the groundtruth
    pub false_negative: usize,
}

/// Track-segment agreement between two sequences.
///
/// A segment connects a target observation to the next observation of the
/// same ID, as a pair of `(frame, observation)` indices — ID numbering does
/// not enter the comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentScores {
    /// Segments present in both sequences
    pub true_positive: usize,
    /// Segments only in the candidate
    pub false_positive: usize,
    /// Segments only in the groundtruth
    pub false_negative: usize,
}

impl SegmentScores {
    /// Segment recall.
    pub fn recall(&self) -> f64 {
        let denom = self.true_positive + self.false_negative;
        if denom == 0 {
            0.0
        } else {
            self.true_positive as f64 / denom as f64
        }
    }

    /// Segment precision.
    pub fn precision(&self) -> f64 {
        let denom = self.true_positive + self.false_positive;
        if denom == 0 {
            0.0
        } else {
            self.true_positive as f64 / denom as f64
        }
    }
}

/// Result of comparing a tracker output against groundtruth.
#[derive(Debug, Clone)]
pub struct TrackEvaluation {
    /// Statistics of the groundtruth sequence
    pub groundtruth: SequenceStats,
    /// Statistics of the candidate sequence
    pub candidate: SequenceStats,
    /// Per-observation clutter agreement
    pub clutter: ClutterConfusion,
    /// Observation-to-observation segment agreement
    pub segments: SegmentScores,
}

/// All segments of a labeled sequence as sorted index pairs.
fn track_segments(observations: &MultiState) -> BTreeSet<((usize, usize), (usize, usize))> {
    let mut last_seen: HashMap<TargetId, (usize, usize)> = HashMap::new();
    let mut segments = BTreeSet::new();

    for (t, frame) in observations.frames.iter().enumerate() {
        for (m, obs) in frame.observations.iter().enumerate() {
            if obs.target_id == CLUTTER_ID {
                continue;
            }
            if let Some(&prev) = last_seen.get(&obs.target_id) {
                segments.insert((prev, (t, m)));
            }
            last_seen.insert(obs.target_id, (t, m));
        }
    }
    segments
}

/// Compare a candidate labeling against groundtruth.
///
/// Both sequences must have the same frame count and per-frame observation
/// counts (the candidate is expected to be a relabeling of the groundtruth
/// observations).
pub fn evaluate(
    groundtruth: &MultiState,
    candidate: &MultiState,
) -> Result<TrackEvaluation, EvalError> {
    if groundtruth.len() != candidate.len() {
        return Err(EvalError::FrameCountMismatch {
            groundtruth: groundtruth.len(),
            candidate: candidate.len(),
        });
    }
    for (t, (gf, cf)) in groundtruth
        .frames
        .iter()
        .zip(candidate.frames.iter())
        .enumerate()
    {
        if gf.len() != cf.len() {
            return Err(EvalError::FrameLayoutMismatch {
                frame: t,
                groundtruth: gf.len(),
                candidate: cf.len(),
            });
        }
    }

    let mut clutter = ClutterConfusion::default();
    for (gf, cf) in groundtruth.frames.iter().zip(candidate.frames.iter()) {
        for (go, co) in gf.observations.iter().zip(cf.observations.iter()) {
            match (go.target_id == CLUTTER_ID, co.target_id == CLUTTER_ID) {
                (true, true) => clutter.true_positive += 1,
                (false, true) => clutter.false_positive += 1,
                (false, false) => clutter.true_negative += 1,
                (true, false) => clutter.false_negative += 1,
            }
        }
    }

    let gt_segments = track_segments(groundtruth);
    let cand_segments = track_segments(candidate);
    let true_positive = gt_segments.intersection(&cand_segments).count();
    let segments = SegmentScores {
        true_positive,
        false_positive: cand_segments.len() - true_positive,
        false_negative: gt_segments.len() - true_positive,
    };

    Ok(TrackEvaluation {
        groundtruth: sequence_stats(groundtruth),
        candidate: sequence_stats(candidate),
        clutter,
        segments,
    })
}
