//! Command-line multi-target tracker.
//!
//! Reads a time sequence of observations, runs the RBMCDA-IMM sampler and
//! writes per-sample labelings, the joint-probability table and the
//! consensus labeling under the given output basename.

use clap::Parser;
use rbmcda_tracker_rs::config::{ModelTransition, TrackerParams};
use rbmcda_tracker_rs::consensus::write_dot_graph;
use rbmcda_tracker_rs::io::{read_multistate, write_run_outputs};
use rbmcda_tracker_rs::tracker::MultiObservationTracker;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "track",
    version,
    about = "Multi-target tracking with Rao-Blackwellized Monte Carlo Data Association",
    long_about = "Tracks multiple targets through a cluttered 2D observation sequence.\n\
                  Association hypotheses are sampled with RBMCDA while each target's\n\
                  state is estimated by an IMM filter over a random-walk and a\n\
                  linear-extrapolation motion model."
)]
struct Args {
    /// Seed for the random number generator
    #[arg(long = "RandomSeed")]
    random_seed: Option<u64>,

    /// Number of RBMCDA samples (particles)
    #[arg(long = "NumSamples")]
    num_samples: Option<usize>,

    /// Time between two frames (seconds)
    #[arg(long = "DeltaT")]
    delta_t: Option<f64>,

    /// Lower limit of the observation region in x
    #[arg(long = "XMin")]
    x_min: Option<f64>,

    /// Upper limit of the observation region in x
    #[arg(long = "XMax")]
    x_max: Option<f64>,

    /// Lower limit of the observation region in y
    #[arg(long = "YMin")]
    y_min: Option<f64>,

    /// Upper limit of the observation region in y
    #[arg(long = "YMax")]
    y_max: Option<f64>,

    /// Probability of target detection; negative requests estimation
    #[arg(long = "PDetect")]
    p_detect: Option<f64>,

    /// Poisson intensity of newborn-target observations
    #[arg(long = "LambdaBirth")]
    lambda_birth: Option<f64>,

    /// Poisson intensity of clutter observations; zero requests estimation
    #[arg(long = "LambdaClutter")]
    lambda_clutter: Option<f64>,

    /// Rate of the exponential survival distribution of unassociated targets
    #[arg(long = "LambdaDeath")]
    lambda_death: Option<f64>,

    /// P(random walk stays random walk)
    #[arg(long = "PModelTransRwRw")]
    p_model_trans_rw_rw: Option<f64>,

    /// P(random walk switches to linear extrapolation)
    #[arg(long = "PModelTransRwFle")]
    p_model_trans_rw_fle: Option<f64>,

    /// P(linear extrapolation switches to random walk)
    #[arg(long = "PModelTransFleRw")]
    p_model_trans_fle_rw: Option<f64>,

    /// P(linear extrapolation stays linear extrapolation)
    #[arg(long = "PModelTransFleFle")]
    p_model_trans_fle_fle: Option<f64>,

    /// Measurement noise variance of the x/y position
    #[arg(long = "Rxy")]
    rxy: Option<f64>,

    /// Measurement noise variance of the sqrt-size component
    #[arg(long = "Rsize")]
    rsize: Option<f64>,

    /// Process noise variance of the current x/y position
    #[arg(long = "Qxy")]
    qxy: Option<f64>,

    /// Process noise variance of the previous x/y position
    #[arg(long = "QxyPrev")]
    qxy_prev: Option<f64>,

    /// Process noise variance of the sqrt-size component
    #[arg(long = "Qsize")]
    qsize: Option<f64>,

    /// Fraction of the particle count below which ESS triggers resampling
    #[arg(long = "ESSPercentage", default_value_t = 0.5)]
    ess_percentage: f64,

    /// Maximum number of neighboring targets considered per observation
    /// (0 disables the gate)
    #[arg(long = "MaxNumNeighbors", default_value_t = 0)]
    max_num_neighbors: usize,

    /// Maximum distance of neighboring targets considered per observation
    /// (0 disables the gate)
    #[arg(long = "MaxDistNeighbors", default_value_t = 0.0)]
    max_dist_neighbors: f64,

    /// Consider all targets for every observation (legacy behavior)
    #[arg(long = "NoNeighborsOldAlgo")]
    no_neighbors_old_algo: bool,

    /// Write the observation association graph to this dot file
    #[arg(long = "DotGraphFile")]
    dot_graph_file: Option<PathBuf>,

    /// Verbose progress output
    #[arg(short, long)]
    verbose: bool,

    /// File with the input observation sequence
    input_observations: Option<PathBuf>,

    /// Basename of the output files
    output_basename: Option<String>,
}

/// Pull a required option or fail with exit code 1.
macro_rules! require {
    ($args:expr, $field:ident, $name:literal) => {
        match $args.$field {
            Some(value) => value,
            None => {
                eprintln!("Missing required parameter --{}", $name);
                return ExitCode::from(1);
            }
        }
    };
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if args.verbose { "info" } else { "warn" },
    ))
    .init();

    let input = match args.input_observations.clone() {
        Some(path) => path,
        None => {
            eprintln!("Missing input observations file");
            return ExitCode::from(1);
        }
    };
    let basename = match args.output_basename.clone() {
        Some(name) => name,
        None => {
            eprintln!("Missing output basename");
            return ExitCode::from(1);
        }
    };

    let model_transition = match ModelTransition::new(
        require!(args, p_model_trans_rw_rw, "PModelTransRwRw"),
        require!(args, p_model_trans_rw_fle, "PModelTransRwFle"),
        require!(args, p_model_trans_fle_rw, "PModelTransFleRw"),
        require!(args, p_model_trans_fle_fle, "PModelTransFleFle"),
    ) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let params = TrackerParams {
        random_seed: require!(args, random_seed, "RandomSeed"),
        num_samples: require!(args, num_samples, "NumSamples"),
        delta_t: require!(args, delta_t, "DeltaT"),
        x_min: require!(args, x_min, "XMin"),
        x_max: require!(args, x_max, "XMax"),
        y_min: require!(args, y_min, "YMin"),
        y_max: require!(args, y_max, "YMax"),
        // the sqrt-size range is taken from the data before the run
        sqrt_size_min: 0.0,
        sqrt_size_max: 1.0,
        p_detect: require!(args, p_detect, "PDetect"),
        lambda_birth: require!(args, lambda_birth, "LambdaBirth"),
        lambda_clutter: require!(args, lambda_clutter, "LambdaClutter"),
        lambda_death: require!(args, lambda_death, "LambdaDeath"),
        model_transition,
        rxy: require!(args, rxy, "Rxy"),
        rsize: require!(args, rsize, "Rsize"),
        qxy: require!(args, qxy, "Qxy"),
        qxy_prev: require!(args, qxy_prev, "QxyPrev"),
        qsize: require!(args, qsize, "Qsize"),
        ess_percentage: args.ess_percentage,
        max_num_neighbors: args.max_num_neighbors,
        max_dist_neighbors: args.max_dist_neighbors,
        no_neighbors_old_algo: args.no_neighbors_old_algo,
    };

    log::info!("configuration: {}", params.to_json_pretty());

    let observations = match read_multistate(&input) {
        Ok(ms) => ms,
        Err(e) => {
            eprintln!("Failed to read input observations: {}", e);
            return ExitCode::from(1);
        }
    };

    let tracker = match MultiObservationTracker::new(params) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let start = std::time::Instant::now();
    let output = match tracker.run(&observations) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Tracking failed: {}", e);
            return ExitCode::from(1);
        }
    };
    println!(
        "Tracking time: {:.3} seconds ({} frames, {} tracks)",
        start.elapsed().as_secs_f64(),
        observations.len(),
        output.tracks.len()
    );

    if let Err(e) = write_run_outputs(&basename, &output) {
        eprintln!("Failed to write outputs: {}", e);
        return ExitCode::from(1);
    }

    if let Some(dot_path) = &args.dot_graph_file {
        if let Err(e) = write_dot_graph(dot_path, &output.adjacency, &output.tracks) {
            eprintln!("Warning: failed to write dot file: {}", e);
        }
    }

    ExitCode::SUCCESS
}
