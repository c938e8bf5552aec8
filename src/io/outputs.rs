//! Output files of a tracking run.
//!
//! For output basename `base` a run writes
//!
//! - `base.sampleNNN.observations.xml` — each particle's labeling, with
//!   `NNN` zero-padded to the sample-count width,
//! - `base.samples.probs` — one `index<TAB>probability` row per particle,
//! - `base.gpp.observations.xml` — the consensus labeling.

use crate::errors::ObservationIoError;
use crate::io::observations::write_multistate;
use crate::tracker::TrackerOutput;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Zero-padded per-sample output file name.
pub fn sample_file_name(basename: &str, index: usize, num_samples: usize) -> String {
    let digits = (num_samples as f64).log10().ceil().max(1.0) as usize;
    format!(
        "{}.sample{:0width$}.observations.xml",
        basename,
        index,
        width = digits
    )
}

/// Write the `index TAB probability` table.
pub fn write_probs(path: &Path, probs: &[f64]) -> Result<(), ObservationIoError> {
    let mut file = fs::File::create(path).map_err(|source| ObservationIoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    for (i, p) in probs.iter().enumerate() {
        writeln!(file, "{}\t{}", i, p).map_err(|source| ObservationIoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Write all outputs of a finished run under the given basename.
///
/// Returns the paths written, consensus file last.
pub fn write_run_outputs(
    basename: &str,
    output: &TrackerOutput,
) -> Result<Vec<PathBuf>, ObservationIoError> {
    let mut written = Vec::new();

    let num_samples = output.sample_observations.len();
    for (i, sample) in output.sample_observations.iter().enumerate() {
        let path = PathBuf::from(sample_file_name(basename, i, num_samples));
        write_multistate(&path, sample)?;
        written.push(path);
    }

    let probs_path = PathBuf::from(format!("{}.samples.probs", basename));
    write_probs(&probs_path, &output.sample_probs)?;
    written.push(probs_path);

    let gpp_path = PathBuf::from(format!("{}.gpp.observations.xml", basename));
    write_multistate(&gpp_path, &output.consensus)?;
    written.push(gpp_path);

    Ok(written)
}
