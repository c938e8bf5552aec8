//! Graphviz description of the consensus graph.
//!
//! Plain undirected dot output: one node per observation, edge pen width
//! proportional to the vote weight, one colored subgraph per accepted
//! track. Meant for offline inspection with the usual graphviz tools.

use crate::consensus::adjacency::{NodeId, ObservationAdjacency};
use std::fmt::Write as _;
use std::io;
use std::path::Path;

/// Track colors cycled over by subgraph index.
const TRACK_COLORS: [&str; 8] = [
    "blue", "green", "orange", "purple", "brown", "cyan", "magenta", "gold",
];

fn node_name(node: NodeId) -> String {
    format!("z_{}_{}", node.frame, node.obs)
}

/// Render the graph and its accepted tracks as a dot document.
pub fn render_dot_graph(adjacency: &ObservationAdjacency, tracks: &[Vec<NodeId>]) -> String {
    let mut out = String::new();
    out.push_str("graph observation_associations {\n");
    out.push_str("  node [shape=circle fontsize=10];\n");

    let max_weight = adjacency
        .edges()
        .map(|(_, _, w)| w)
        .fold(f64::MIN_POSITIVE, f64::max);

    for &node in adjacency.nodes() {
        let _ = writeln!(
            out,
            "  {} [label=\"t{}:{}\"];",
            node_name(node),
            node.frame,
            node.obs
        );
    }

    for (a, b, w) in adjacency.edges() {
        let penwidth = 0.5 + 3.5 * (w / max_weight);
        let _ = writeln!(
            out,
            "  {} -- {} [penwidth={:.2} label=\"{:.3}\"];",
            node_name(a),
            node_name(b),
            penwidth,
            w
        );
    }

    for (i, track) in tracks.iter().enumerate() {
        let color = TRACK_COLORS[i % TRACK_COLORS.len()];
        let _ = writeln!(out, "  subgraph cluster_track_{} {{", i + 1);
        let _ = writeln!(out, "    color={};", color);
        let _ = writeln!(out, "    label=\"track {}\";", i + 1);
        for node in track {
            let _ = writeln!(out, "    {};", node_name(*node));
        }
        out.push_str("  }\n");
    }

    out.push_str("}\n");
    out
}

/// Write the dot document to a file.
pub fn write_dot_graph(
    path: &Path,
    adjacency: &ObservationAdjacency,
    tracks: &[Vec<NodeId>],
) -> io::Result<()> {
    std::fs::write(path, render_dot_graph(adjacency, tracks))
}
