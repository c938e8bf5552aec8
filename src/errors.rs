//! Error types for configuration, input parsing and tracking runs.
//!
//! Configuration problems are rejected before any sampling begins and name
//! the offending field.

use std::fmt;
use std::path::PathBuf;

/// Errors raised while validating tracker parameters
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// A required numeric parameter is missing or not finite
    InvalidParameter {
        /// Name of the offending field
        field: &'static str,
        /// Description of the problem
        description: String,
    },

    /// A variance parameter is negative
    NegativeVariance {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: f64,
    },

    /// A row of the model transition matrix does not sum to 1
    NonStochasticRow {
        /// Row index (0 = RandomWalk, 1 = FirstOrderLinearExtrapolation)
        row: usize,
        /// Actual row sum
        sum: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidParameter { field, description } => {
                write!(f, "Invalid parameter `{}`: {}", field, description)
            }
            ConfigError::NegativeVariance { field, value } => {
                write!(f, "Variance `{}` must be non-negative, got {}", field, value)
            }
            ConfigError::NonStochasticRow { row, sum } => {
                write!(
                    f,
                    "Model transition row {} must sum to 1, got {:.12}",
                    row, sum
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised while reading or writing observation files
#[derive(Debug)]
pub enum ObservationIoError {
    /// Underlying file system failure
    Io {
        /// File that failed
        path: PathBuf,
        /// OS error
        source: std::io::Error,
    },

    /// Neither the XML schema nor the region-set fallback could be parsed
    Unparseable {
        /// File that failed
        path: PathBuf,
        /// Failure of the primary (XML) parse
        xml_error: String,
        /// Failure of the region-set fallback parse
        fallback_error: String,
    },

    /// The XML document carries an unsupported schema version
    UnsupportedVersion {
        /// Version found in the document
        found: u32,
        /// Version this build understands
        supported: u32,
    },

    /// Serialization failure when writing
    Serialize {
        /// Description of the failure
        description: String,
    },
}

impl fmt::Display for ObservationIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationIoError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ObservationIoError::Unparseable {
                path,
                xml_error,
                fallback_error,
            } => {
                write!(
                    f,
                    "Failed to parse {} as observations ({}) or as a region set ({})",
                    path.display(),
                    xml_error,
                    fallback_error
                )
            }
            ObservationIoError::UnsupportedVersion { found, supported } => {
                write!(
                    f,
                    "Unsupported observation schema version {} (supported: {})",
                    found, supported
                )
            }
            ObservationIoError::Serialize { description } => {
                write!(f, "Failed to serialize observations: {}", description)
            }
        }
    }
}

impl std::error::Error for ObservationIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ObservationIoError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised by the end-to-end tracking pipeline
#[derive(Debug)]
pub enum TrackerError {
    /// Invalid configuration
    Config(ConfigError),

    /// Observation input could not be read
    Input(ObservationIoError),

    /// The observation sequence is unusable (e.g. empty)
    EmptyInput,
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Config(e) => write!(f, "Configuration error: {}", e),
            TrackerError::Input(e) => write!(f, "Input error: {}", e),
            TrackerError::EmptyInput => write!(f, "Observation sequence contains no frames"),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Config(e) => Some(e),
            TrackerError::Input(e) => Some(e),
            TrackerError::EmptyInput => None,
        }
    }
}

impl From<ConfigError> for TrackerError {
    fn from(e: ConfigError) -> Self {
        TrackerError::Config(e)
    }
}

impl From<ObservationIoError> for TrackerError {
    fn from(e: ObservationIoError) -> Self {
        TrackerError::Input(e)
    }
}

/// Errors raised by the track evaluator
#[derive(Debug, Clone)]
pub enum EvalError {
    /// The two sequences have different frame counts
    FrameCountMismatch {
        /// Frames in the groundtruth sequence
        groundtruth: usize,
        /// Frames in the candidate sequence
        candidate: usize,
    },

    /// A frame has different observation counts in the two sequences
    FrameLayoutMismatch {
        /// Frame index
        frame: usize,
        /// Observations in the groundtruth frame
        groundtruth: usize,
        /// Observations in the candidate frame
        candidate: usize,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::FrameCountMismatch {
                groundtruth,
                candidate,
            } => write!(
                f,
                "Frame count mismatch: groundtruth has {}, candidate has {}",
                groundtruth, candidate
            ),
            EvalError::FrameLayoutMismatch {
                frame,
                groundtruth,
                candidate,
            } => write!(
                f,
                "Frame {} layout mismatch: groundtruth has {} observations, candidate has {}",
                frame, groundtruth, candidate
            ),
        }
    }
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NegativeVariance {
            field: "Qxy",
            value: -1.0,
        };
        assert!(err.to_string().contains("Qxy"));

        let err = ConfigError::NonStochasticRow { row: 1, sum: 0.7 };
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_error_conversion() {
        let cfg = ConfigError::InvalidParameter {
            field: "NumSamples",
            description: "must be at least 1".to_string(),
        };
        let err: TrackerError = cfg.into();
        assert!(matches!(err, TrackerError::Config(_)));
    }
}
