//! Tracker configuration.
//!
//! All numeric parameters of the sampler, the motion bank and the proposal
//! distribution, validated up front so a bad run fails before any sampling
//! begins.

use crate::errors::ConfigError;
use serde::Serialize;

/// Tolerance for the row-sum check of the model transition matrix.
const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Row-stochastic 2x2 matrix of motion model switching probabilities.
///
/// Row index is the current model, column index the next model, ordered
/// {RandomWalk, FirstOrderLinearExtrapolation}. Each row must sum to 1;
/// construction fails otherwise — inputs are never silently renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelTransition {
    rows: [[f64; 2]; 2],
}

impl ModelTransition {
    /// Build from the four transition probabilities.
    ///
    /// `rw_rw + rw_fle` and `fle_rw + fle_fle` must each sum to 1 within
    /// floating tolerance and all entries must lie in [0, 1].
    pub fn new(rw_rw: f64, rw_fle: f64, fle_rw: f64, fle_fle: f64) -> Result<Self, ConfigError> {
        let rows = [[rw_rw, rw_fle], [fle_rw, fle_fle]];

        for (i, row) in rows.iter().enumerate() {
            for &p in row {
                if !(0.0..=1.0).contains(&p) || !p.is_finite() {
                    return Err(ConfigError::InvalidParameter {
                        field: "ModelTransition",
                        description: format!("probability {} outside [0, 1] in row {}", p, i),
                    });
                }
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(ConfigError::NonStochasticRow { row: i, sum });
            }
        }

        Ok(Self { rows })
    }

    /// Matrix that never leaves the random walk model.
    pub fn random_walk_only() -> Self {
        Self {
            rows: [[1.0, 0.0], [1.0, 0.0]],
        }
    }

    /// P(next model = `to` | current model = `from`), indices over {RW, FLE}.
    #[inline]
    pub fn prob(&self, from: usize, to: usize) -> f64 {
        self.rows[from][to]
    }
}

/// All parameters of a tracking run.
///
/// Mirrors the command-line surface one to one; see the `track` binary.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerParams {
    /// Seed for the master random generator; per-particle streams derive
    /// from it deterministically.
    pub random_seed: u64,
    /// Number of particles (RBMCDA samples)
    pub num_samples: usize,
    /// Time between consecutive frames (seconds)
    pub delta_t: f64,

    /// Lower x limit of the observation region
    pub x_min: f64,
    /// Upper x limit of the observation region
    pub x_max: f64,
    /// Lower y limit of the observation region
    pub y_min: f64,
    /// Upper y limit of the observation region
    pub y_max: f64,
    /// Lower sqrt-size limit; taken from the data when not set explicitly
    pub sqrt_size_min: f64,
    /// Upper sqrt-size limit; taken from the data when not set explicitly
    pub sqrt_size_max: f64,

    /// Probability that an existing target is detected. A negative value
    /// requests estimation from the data before the run.
    pub p_detect: f64,
    /// Poisson intensity of observations from newborn targets per frame
    pub lambda_birth: f64,
    /// Poisson intensity of clutter observations per frame. Zero requests
    /// estimation from the data before the run.
    pub lambda_clutter: f64,
    /// Rate of the exponential survival distribution of unassociated targets
    pub lambda_death: f64,

    /// Motion model switching probabilities
    pub model_transition: ModelTransition,

    /// Measurement noise variance of the x/y position
    pub rxy: f64,
    /// Measurement noise variance of the sqrt-size component
    pub rsize: f64,
    /// Process noise variance of the current x/y position
    pub qxy: f64,
    /// Process noise variance of the retained previous x/y position
    pub qxy_prev: f64,
    /// Process noise variance of the sqrt-size component
    pub qsize: f64,

    /// Resampling triggers when ESS falls below this fraction of the
    /// particle count. 0 disables resampling, 1 resamples every frame.
    pub ess_percentage: f64,
    /// Candidate cap: number of nearest targets considered per observation.
    /// 0 disables the spatial gate.
    pub max_num_neighbors: usize,
    /// Candidate gate radius. 0 disables the spatial gate.
    pub max_dist_neighbors: f64,
    /// Consider every live target for every observation (legacy behavior,
    /// equivalent to a disabled gate but explicit).
    pub no_neighbors_old_algo: bool,
}

impl TrackerParams {
    /// Validate all fields, failing fast on the first offending one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_samples == 0 {
            return Err(ConfigError::InvalidParameter {
                field: "NumSamples",
                description: "must be at least 1".to_string(),
            });
        }
        if !self.delta_t.is_finite() || self.delta_t <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                field: "DeltaT",
                description: format!("must be positive, got {}", self.delta_t),
            });
        }
        if self.x_max <= self.x_min {
            return Err(ConfigError::InvalidParameter {
                field: "XMax",
                description: format!("must exceed XMin ({} <= {})", self.x_max, self.x_min),
            });
        }
        if self.y_max <= self.y_min {
            return Err(ConfigError::InvalidParameter {
                field: "YMax",
                description: format!("must exceed YMin ({} <= {})", self.y_max, self.y_min),
            });
        }
        if self.p_detect > 1.0 {
            return Err(ConfigError::InvalidParameter {
                field: "PDetect",
                description: format!("must not exceed 1, got {}", self.p_detect),
            });
        }
        let intensities: [(&'static str, f64); 3] = [
            ("LambdaBirth", self.lambda_birth),
            ("LambdaClutter", self.lambda_clutter),
            ("LambdaDeath", self.lambda_death),
        ];
        for (field, value) in intensities {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidParameter {
                    field,
                    description: format!("must be a non-negative intensity, got {}", value),
                });
            }
        }
        let variances: [(&'static str, f64); 5] = [
            ("Rxy", self.rxy),
            ("Rsize", self.rsize),
            ("Qxy", self.qxy),
            ("QxyPrev", self.qxy_prev),
            ("Qsize", self.qsize),
        ];
        for (field, value) in variances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeVariance { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.ess_percentage) {
            return Err(ConfigError::InvalidParameter {
                field: "ESSPercentage",
                description: format!("must lie in [0, 1], got {}", self.ess_percentage),
            });
        }
        if self.max_dist_neighbors < 0.0 {
            return Err(ConfigError::InvalidParameter {
                field: "MaxDistNeighbors",
                description: format!("must be non-negative, got {}", self.max_dist_neighbors),
            });
        }
        Ok(())
    }

    /// Volume of the observation space, the support of the uniform clutter
    /// and birth densities.
    pub fn observation_volume(&self) -> f64 {
        (self.x_max - self.x_min)
            * (self.y_max - self.y_min)
            * (self.sqrt_size_max - self.sqrt_size_min).max(f64::MIN_POSITIVE)
    }

    /// Log of the uniform density over the observation space.
    pub fn log_uniform_density(&self) -> f64 {
        -self.observation_volume().ln()
    }

    /// True when the spatial candidate gate is active.
    pub fn neighbor_gate_enabled(&self) -> bool {
        !self.no_neighbors_old_algo && self.max_num_neighbors > 0 && self.max_dist_neighbors > 0.0
    }

    /// Serialize the configuration to pretty JSON for logging and
    /// cross-implementation comparison.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            random_seed: 1,
            num_samples: 100,
            delta_t: 1.0,
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
            sqrt_size_min: 0.0,
            sqrt_size_max: 1.0,
            p_detect: 0.95,
            lambda_birth: 0.1,
            lambda_clutter: 1.0,
            lambda_death: 0.1,
            model_transition: ModelTransition::random_walk_only(),
            rxy: 1.0,
            rsize: 1.0,
            qxy: 1.0,
            qxy_prev: 1.0,
            qsize: 1.0,
            ess_percentage: 0.5,
            max_num_neighbors: 0,
            max_dist_neighbors: 0.0,
            no_neighbors_old_algo: false,
        }
    }
}
