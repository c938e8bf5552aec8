//! Consensus extraction over multiple particles.

mod helpers;

use helpers::{add_clutter, linear_scenario, scenario_params, LinearTarget};
use rbmcda_tracker_rs::common::rng::SimpleRng;
use rbmcda_tracker_rs::consensus::{partition_tracks, ObservationAdjacency};
use rbmcda_tracker_rs::sampler::RbmcdaSampler;
use rbmcda_tracker_rs::tracker::MultiObservationTracker;

/// Tracks extracted from the vote graph never branch: at most one
/// observation per frame per track.
#[test]
fn consensus_tracks_never_branch() {
    let mut observations = linear_scenario(
        10,
        &[
            LinearTarget {
                id: 1,
                start: (20.0, 50.0),
                velocity: (2.0, 0.0),
            },
            LinearTarget {
                id: 2,
                start: (50.0, 20.0),
                velocity: (0.0, 2.0),
            },
        ],
    );
    let mut rng = SimpleRng::new(31);
    add_clutter(&mut observations, &mut rng, 1.5, (0.0, 100.0, 0.0, 100.0));

    let tracker = MultiObservationTracker::new(scenario_params(11, 20)).unwrap();
    let output = tracker.run(&observations).unwrap();

    for track in &output.tracks {
        let mut frames: Vec<usize> = track.iter().map(|n| n.frame).collect();
        let unique_before = frames.len();
        frames.dedup();
        assert_eq!(frames.len(), unique_before, "track visits a frame twice");

        // sorted by frame, so consecutive nodes step forward in time
        for pair in track.windows(2) {
            assert!(pair[0].frame < pair[1].frame);
        }
    }
}

/// Edge weights of the vote graph stay within the total probability mass.
#[test]
fn vote_weights_are_bounded() {
    let observations = linear_scenario(
        6,
        &[LinearTarget {
            id: 1,
            start: (40.0, 40.0),
            velocity: (1.0, 1.0),
        }],
    );

    let params = scenario_params(23, 12);
    let mut sampler = RbmcdaSampler::new(params).unwrap();
    sampler.seed_from_frame(&observations.frames[0]);
    for (t, frame) in observations.frames.iter().enumerate() {
        sampler.step(t, frame);
    }

    let weights = sampler.weights();
    let records: Vec<_> = sampler
        .particles()
        .iter()
        .map(|p| p.record.clone())
        .collect();
    let adjacency = ObservationAdjacency::new(&observations, &records, &weights);

    for (_, _, w) in adjacency.edges() {
        assert!(w > 0.0 && w <= 1.0 + 1e-9, "edge weight {} out of range", w);
    }

    // a unanimous single-target scenario yields the full chain
    let tracks = partition_tracks(&adjacency);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].len(), observations.len());
}

/// The optional dot output renders the pruned graph and the tracks.
#[test]
fn dot_file_renders() {
    let observations = linear_scenario(
        4,
        &[LinearTarget {
            id: 1,
            start: (10.0, 10.0),
            velocity: (2.0, 0.0),
        }],
    );

    let tracker = MultiObservationTracker::new(scenario_params(3, 5)).unwrap();
    let output = tracker.run(&observations).unwrap();

    let path = std::env::temp_dir().join("rbmcda_consensus_test.dot");
    rbmcda_tracker_rs::consensus::write_dot_graph(&path, &output.adjacency, &output.tracks)
        .unwrap();

    let dot = std::fs::read_to_string(&path).unwrap();
    assert!(dot.contains("graph observation_associations"));
    assert!(dot.contains("--"));

    let _ = std::fs::remove_file(&path);
}
