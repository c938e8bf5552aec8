//! Compare groundtruth trajectories with tracker output.
//!
//! Both files carry labeled observation sequences; the candidate is
//! expected to be a relabeling of the groundtruth observations.

use clap::Parser;
use rbmcda_tracker_rs::eval::evaluate;
use rbmcda_tracker_rs::io::read_multistate;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "eval",
    version,
    about = "Compare groundtruth trajectories with trajectories from tracking"
)]
struct Args {
    /// File with groundtruth-labeled observations
    groundtruth_observations: PathBuf,

    /// File with tracker-labeled observations
    tracker_observations: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let groundtruth = match read_multistate(&args.groundtruth_observations) {
        Ok(ms) => ms,
        Err(e) => {
            eprintln!("Failed to read ground truth observations: {}", e);
            return ExitCode::from(1);
        }
    };
    let candidate = match read_multistate(&args.tracker_observations) {
        Ok(ms) => ms,
        Err(e) => {
            eprintln!("Failed to read tracker observations: {}", e);
            return ExitCode::from(1);
        }
    };

    let result = match evaluate(&groundtruth, &candidate) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to evaluate tracks: {}", e);
            return ExitCode::from(1);
        }
    };

    println!("--- Groundtruth ---");
    print_stats(&result.groundtruth);
    println!();
    println!("--- Tracker ---");
    print_stats(&result.candidate);
    println!();
    println!("--- Agreement ---");
    println!("TPclutter: {}", result.clutter.true_positive);
    println!("TNclutter: {}", result.clutter.true_negative);
    println!("FPclutter: {}", result.clutter.false_positive);
    println!("FNclutter: {}", result.clutter.false_negative);
    println!();
    println!("TPtracksegment: {}", result.segments.true_positive);
    println!("FPtracksegment: {}", result.segments.false_positive);
    println!("FNtracksegment: {}", result.segments.false_negative);
    println!();
    println!("Recall tracksegment: {:.6}", result.segments.recall());
    println!("Precision tracksegment: {:.6}", result.segments.precision());

    ExitCode::SUCCESS
}

fn print_stats(stats: &rbmcda_tracker_rs::eval::SequenceStats) {
    println!(
        "Mean number of observations:      {:.6}",
        stats.observations.mean
    );
    println!(
        "Variance of observation count:    {:.6}",
        stats.observations.variance
    );
    println!("Mean number of clutter:           {:.6}", stats.clutter.mean);
    println!(
        "Variance of clutter count:        {:.6}",
        stats.clutter.variance
    );
    println!("Mean number of newborn targets:   {:.6}", stats.births.mean);
    println!(
        "Variance of newborn count:        {:.6}",
        stats.births.variance
    );
    println!("Detections: {}", stats.detections);
    println!("Missed detections: {}", stats.missed_detections);
    println!(
        "Relative frequency of detections: {:.6}",
        stats.detection_rate()
    );
}
