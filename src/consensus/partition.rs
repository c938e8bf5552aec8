//! Greedy partitioning of the observation graph into tracks.
//!
//! Edges are merged highest weight first. A merge is accepted only when the
//! two growing tracks contain no observation of a common frame, so a track
//! never branches and never holds two observations of one time step.
//! Singleton components are interpreted as clutter.

use crate::consensus::adjacency::{NodeId, ObservationAdjacency};
use crate::types::{MultiState, TargetId};
use std::collections::{BTreeSet, HashMap};

/// Union-find over graph nodes with per-component frame sets.
struct Components {
    parent: Vec<usize>,
    frames: Vec<Option<BTreeSet<usize>>>,
}

impl Components {
    fn new(nodes: &[NodeId]) -> Self {
        let parent = (0..nodes.len()).collect();
        let frames = nodes
            .iter()
            .map(|n| {
                let mut set = BTreeSet::new();
                set.insert(n.frame);
                Some(set)
            })
            .collect();
        Self { parent, frames }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Merge the components of `a` and `b` if their frame sets are
    /// disjoint. Returns true when the merge happened.
    fn try_union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }

        let disjoint = {
            let fa = self.frames[ra].as_ref().map(|s| s.len()).unwrap_or(0);
            let fb = self.frames[rb].as_ref().map(|s| s.len()).unwrap_or(0);
            let (small, large) = if fa <= fb { (ra, rb) } else { (rb, ra) };
            let small_set = self.frames[small].as_ref();
            let large_set = self.frames[large].as_ref();
            match (small_set, large_set) {
                (Some(s), Some(l)) => s.iter().all(|f| !l.contains(f)),
                _ => false,
            }
        };
        if !disjoint {
            return false;
        }

        // merge smaller frame set into larger
        let (from, into) = {
            let fa = self.frames[ra].as_ref().map(|s| s.len()).unwrap_or(0);
            let fb = self.frames[rb].as_ref().map(|s| s.len()).unwrap_or(0);
            if fa <= fb {
                (ra, rb)
            } else {
                (rb, ra)
            }
        };
        if let Some(moved) = self.frames[from].take() {
            if let Some(target) = self.frames[into].as_mut() {
                target.extend(moved);
            }
        }
        self.parent[from] = into;
        true
    }
}

/// Partition the graph into tracks.
///
/// Returns the connected components with at least two observations, each
/// sorted by frame, ordered by their first observation. Singletons are
/// omitted: an observation no accepted edge touches is clutter.
pub fn partition_tracks(adjacency: &ObservationAdjacency) -> Vec<Vec<NodeId>> {
    let nodes = adjacency.nodes();
    let index: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, &n)| (n, i))
        .collect();

    // highest weight first; node order breaks ties deterministically
    let mut edges: Vec<(NodeId, NodeId, f64)> = adjacency.edges().collect();
    edges.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.0, a.1).cmp(&(b.0, b.1)))
    });

    let mut components = Components::new(nodes);
    for (a, b, _) in edges {
        let (ia, ib) = (index[&a], index[&b]);
        components.try_union(ia, ib);
    }

    let mut groups: HashMap<usize, Vec<NodeId>> = HashMap::new();
    for (i, &node) in nodes.iter().enumerate() {
        let root = components.find(i);
        groups.entry(root).or_default().push(node);
    }

    let mut tracks: Vec<Vec<NodeId>> = groups
        .into_values()
        .filter(|track| track.len() >= 2)
        .collect();
    for track in &mut tracks {
        track.sort();
    }
    tracks.sort_by_key(|track| track[0]);
    tracks
}

/// Turn partitioned tracks into per-frame labels.
///
/// Track IDs are assigned 1.. in track order; all other observations get
/// the clutter label 0.
pub fn tracks_to_labels(observations: &MultiState, tracks: &[Vec<NodeId>]) -> Vec<Vec<TargetId>> {
    let mut labels: Vec<Vec<TargetId>> = observations
        .frames
        .iter()
        .map(|frame| vec![0; frame.len()])
        .collect();

    for (i, track) in tracks.iter().enumerate() {
        let id = (i + 1) as TargetId;
        for node in track {
            labels[node.frame][node.obs] = id;
        }
    }
    labels
}
