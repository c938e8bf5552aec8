//! Print information about an observation sequence file.

use clap::Parser;
use rbmcda_tracker_rs::eval::sequence_stats;
use rbmcda_tracker_rs::io::read_multistate;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "obsinfo",
    version,
    about = "Print information about a time sequence of observations"
)]
struct Args {
    /// Also print target/clutter association statistics from the labels
    #[arg(short = 'a', long = "associationInfo")]
    association_info: bool,

    /// File with the observation sequence
    observations_file: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let observations = match read_multistate(&args.observations_file) {
        Ok(ms) => ms,
        Err(e) => {
            eprintln!("Failed to read observations: {}", e);
            return ExitCode::from(1);
        }
    };

    let mut counts: Vec<usize> = observations.frames.iter().map(|f| f.len()).collect();
    let stats = sequence_stats(&observations);

    let mut min_dist = f64::INFINITY;
    let mut max_dist = f64::NEG_INFINITY;
    for frame in &observations.frames {
        for (m, a) in frame.observations.iter().enumerate() {
            for b in frame.observations.iter().skip(m + 1) {
                let d = a.distance(b);
                min_dist = min_dist.min(d);
                max_dist = max_dist.max(d);
            }
        }
    }

    counts.sort_unstable();
    println!("--- Observations Info ---");
    println!("Number of frames:                   {}", observations.len());
    println!("Mean number of observations:        {:.6}", stats.observations.mean);
    println!(
        "Median number of observations:      {}",
        counts.get(counts.len() / 2).copied().unwrap_or(0)
    );
    println!(
        "Variance of number of observations: {:.6}",
        stats.observations.variance
    );
    println!(
        "Minimum number of observations:     {}",
        counts.first().copied().unwrap_or(0)
    );
    println!(
        "Maximum number of observations:     {}",
        counts.last().copied().unwrap_or(0)
    );
    println!(
        "Total number of observations:       {}",
        observations.total_observations()
    );
    if min_dist.is_finite() {
        println!("Minimum distance of observations:   {:.6}", min_dist);
        println!("Maximum distance of observations:   {:.6}", max_dist);
    }

    if args.association_info {
        println!();
        println!("--- Association Info ---");
        println!(
            "Mean number of clutter observations:     {:.6}",
            stats.clutter.mean
        );
        println!(
            "Variance of clutter observation count:   {:.6}",
            stats.clutter.variance
        );
        println!(
            "Mean number of newborn targets:          {:.6}",
            stats.births.mean
        );
        println!(
            "Variance of newborn target count:        {:.6}",
            stats.births.variance
        );
        println!(
            "Relative frequency of target detections: {:.6}",
            stats.detection_rate()
        );
        if stats.gap_histogram.len() > 1 {
            println!("Association gaps (frames: count):");
            for (gap, &count) in stats.gap_histogram.iter().enumerate().skip(1) {
                if count > 0 {
                    println!("  {}: {}", gap, count);
                }
            }
        }
    }

    ExitCode::SUCCESS
}
