//! Core observation and association types.
//!
//! Observations are 2D detections with a size feature. A [`Frame`] holds the
//! observations of one time step, a [`MultiState`] the whole time-ordered
//! sequence of a run. Target IDs are positive; 0 marks clutter in labeled
//! files.

use crate::models::ModelKind;
use nalgebra::DVector;

/// Identifier of a persistent target. IDs start at 1; 0 is the clutter label.
pub type TargetId = u32;

/// The clutter label used in observation files.
pub const CLUTTER_ID: TargetId = 0;

/// A single detection: position, sqrt of the detected region size, the
/// target label (0 = clutter) and an optional motion model tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// x position
    pub x: f64,
    /// y position
    pub y: f64,
    /// Square root of the detected region size
    pub sqrt_size: f64,
    /// Target label, 0 for clutter
    pub target_id: TargetId,
    /// Motion model tag, if known (set by generators, ignored by the sampler)
    pub model: Option<ModelKind>,
}

impl Observation {
    /// Create an unlabeled observation.
    pub fn new(x: f64, y: f64, sqrt_size: f64) -> Self {
        Self {
            x,
            y,
            sqrt_size,
            target_id: CLUTTER_ID,
            model: None,
        }
    }

    /// Create a labeled observation.
    pub fn labeled(x: f64, y: f64, sqrt_size: f64, target_id: TargetId) -> Self {
        Self {
            x,
            y,
            sqrt_size,
            target_id,
            model: None,
        }
    }

    /// Continuous feature vector `[x, y, sqrt_size]`.
    pub fn vector(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.x, self.y, self.sqrt_size])
    }

    /// Euclidean distance between the positions of two observations.
    #[inline]
    pub fn distance(&self, other: &Observation) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// All observations of one discrete time step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Observations in file order; association records index into this.
    pub observations: Vec<Observation>,
}

impl Frame {
    /// Create a frame from observations.
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Number of observations in this frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// True if the frame holds no observations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// The complete, time-ordered observation sequence of a run.
///
/// Immutable once loaded or generated; labeling produces a new sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiState {
    /// Frames in time order, spaced by the configured `delta_t`.
    pub frames: Vec<Frame>,
}

impl MultiState {
    /// Create a sequence from frames.
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Number of frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if the sequence holds no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total number of observations over all frames.
    pub fn total_observations(&self) -> usize {
        self.frames.iter().map(Frame::len).sum()
    }

    /// Largest per-frame observation count.
    pub fn max_observations(&self) -> usize {
        self.frames.iter().map(Frame::len).max().unwrap_or(0)
    }

    /// Return a copy with every target ID replaced by the given labels.
    ///
    /// `labels[t][m]` is the new ID of observation `m` in frame `t`. The
    /// label layout must match the frame layout.
    pub fn relabeled(&self, labels: &[Vec<TargetId>]) -> MultiState {
        let frames = self
            .frames
            .iter()
            .zip(labels.iter())
            .map(|(frame, ids)| {
                let observations = frame
                    .observations
                    .iter()
                    .zip(ids.iter())
                    .map(|(obs, &id)| Observation {
                        target_id: id,
                        ..obs.clone()
                    })
                    .collect();
                Frame { observations }
            })
            .collect();
        MultiState { frames }
    }
}

/// Association of one observation within a particle's record.
///
/// A birth resolves to the newly assigned target ID at sampling time, so the
/// record only distinguishes clutter from target associations; births are
/// those targets whose ID appears for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    /// Observation assigned to a (possibly newborn) target.
    Target(TargetId),
    /// Observation classified as a false positive.
    Clutter,
}

impl Association {
    /// The target ID, if this is a target association.
    #[inline]
    pub fn target_id(&self) -> Option<TargetId> {
        match self {
            Association::Target(id) => Some(*id),
            Association::Clutter => None,
        }
    }
}

/// Per-frame association record: one entry per observation, in frame order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameAssociations {
    /// `entries[m]` is the association of observation `m`.
    pub entries: Vec<Association>,
}

impl FrameAssociations {
    /// Record with capacity for `n` observations.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_vector() {
        let obs = Observation::new(1.0, 2.0, 3.0);
        let v = obs.vector();
        assert_eq!(v.len(), 3);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[2], 3.0);
    }

    #[test]
    fn test_observation_distance_ignores_size() {
        let a = Observation::new(0.0, 0.0, 5.0);
        let b = Observation::new(3.0, 4.0, 100.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_relabeled() {
        let ms = MultiState::new(vec![
            Frame::new(vec![Observation::new(0.0, 0.0, 1.0)]),
            Frame::new(vec![
                Observation::new(1.0, 0.0, 1.0),
                Observation::new(5.0, 5.0, 1.0),
            ]),
        ]);
        let labeled = ms.relabeled(&[vec![1], vec![1, 0]]);
        assert_eq!(labeled.frames[0].observations[0].target_id, 1);
        assert_eq!(labeled.frames[1].observations[1].target_id, 0);
        // positions untouched
        assert_eq!(labeled.frames[1].observations[1].x, 5.0);
    }

    #[test]
    fn test_multistate_counts() {
        let ms = MultiState::new(vec![
            Frame::new(vec![Observation::new(0.0, 0.0, 1.0)]),
            Frame::default(),
            Frame::new(vec![
                Observation::new(1.0, 0.0, 1.0),
                Observation::new(2.0, 0.0, 1.0),
            ]),
        ]);
        assert_eq!(ms.total_observations(), 3);
        assert_eq!(ms.max_observations(), 2);
    }
}
