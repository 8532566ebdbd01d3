use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Order in which communities are visited within a step.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Fresh uniform permutation every step.
    #[default]
    RandomPermutation,
    /// Creation order, every step.
    FixedOrder,
}

/// How neighbor intensities are read during a step.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Each update is committed immediately; later visits in the same step
    /// observe earlier ones (Gauss-Seidel).
    #[default]
    Sequential,
    /// Neighbor intensities are read from the pre-step snapshot (Jacobi).
    Synchronous,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Number of communities placed on the lattice.
    pub agent_count: usize,
    /// Lattice width in cells.
    pub grid_width: usize,
    /// Lattice height in cells.
    pub grid_height: usize,
    /// Fraction of intensity lost per step, in (0, 1).
    pub decay_rate: f64,
    /// Scale of the vulnerability-weighted diffusion gain.
    pub diffusion_rate: f64,
    /// Exclusive upper bound for drawn vulnerabilities.
    pub vulnerability_max: f64,
    /// Communities strictly closer than this (Euclidean) to the lattice
    /// midpoint receive the shock.
    pub shock_radius: f64,
    /// Intensity assigned to shocked communities.
    pub shock_intensity: f64,
    /// Chebyshev radius of the diffusion neighborhood.
    pub neighbor_radius: usize,
    /// Number of steps in a full run.
    pub n_steps: usize,
    /// Intensity at or above which a community counts as affected.
    pub affected_threshold: f64,
    pub schedule: SchedulePolicy,
    pub update_mode: UpdateMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            agent_count: 500,
            grid_width: 50,
            grid_height: 50,
            decay_rate: 0.05,
            diffusion_rate: 0.1,
            vulnerability_max: 0.3,
            shock_radius: 3.0,
            shock_intensity: 0.8,
            neighbor_radius: 1,
            n_steps: 50,
            affected_threshold: 0.1,
            schedule: SchedulePolicy::RandomPermutation,
            update_mode: UpdateMode::Sequential,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    InvalidAgentCount,
    InvalidGridDimensions,
    GridTooLarge { max: usize, actual: usize },
    AgentCountExceedsCapacity { capacity: usize, actual: usize },
    InvalidDecayRate,
    InvalidDiffusionRate,
    InvalidVulnerabilityMax,
    InvalidShockRadius,
    InvalidShockIntensity,
    InvalidNeighborRadius,
    InvalidAffectedThreshold,
    TooManySteps { max: usize, actual: usize },
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::InvalidAgentCount => write!(f, "agent_count must be greater than 0"),
            SimConfigError::InvalidGridDimensions => {
                write!(f, "grid_width and grid_height must be greater than 0")
            }
            SimConfigError::GridTooLarge { max, actual } => {
                write!(f, "grid cell count ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::AgentCountExceedsCapacity { capacity, actual } => write!(
                f,
                "agent_count ({actual}) exceeds grid capacity ({capacity})"
            ),
            SimConfigError::InvalidDecayRate => {
                write!(f, "decay_rate must be finite and within (0,1)")
            }
            SimConfigError::InvalidDiffusionRate => {
                write!(f, "diffusion_rate must be finite and within [0,1]")
            }
            SimConfigError::InvalidVulnerabilityMax => {
                write!(f, "vulnerability_max must be finite and within (0,0.3]")
            }
            SimConfigError::InvalidShockRadius => {
                write!(f, "shock_radius must be finite and non-negative")
            }
            SimConfigError::InvalidShockIntensity => {
                write!(f, "shock_intensity must be finite and within [0,1]")
            }
            SimConfigError::InvalidNeighborRadius => {
                write!(f, "neighbor_radius must be greater than 0")
            }
            SimConfigError::InvalidAffectedThreshold => {
                write!(f, "affected_threshold must be finite and within [0,1]")
            }
            SimConfigError::TooManySteps { max, actual } => {
                write!(f, "n_steps ({actual}) exceeds supported maximum ({max})")
            }
        }
    }
}

impl Error for SimConfigError {}

fn in_closed_unit(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

impl SimConfig {
    pub const MAX_GRID_CELLS: usize = 16_777_216;

    pub const MAX_STEPS: usize = 1_000_000;

    /// Upper bound for `vulnerability_max`; drawn vulnerabilities stay below it.
    pub const VULNERABILITY_CEILING: f64 = 0.3;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_lattice()?;
        self.validate_rates()?;
        self.validate_shock()?;
        self.validate_run()?;
        Ok(())
    }

    /// Number of cells in the lattice. Only meaningful after validation.
    pub fn capacity(&self) -> usize {
        self.grid_width.saturating_mul(self.grid_height)
    }

    fn validate_lattice(&self) -> Result<(), SimConfigError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(SimConfigError::InvalidGridDimensions);
        }
        let cells = self
            .grid_width
            .checked_mul(self.grid_height)
            .ok_or(SimConfigError::GridTooLarge {
                max: Self::MAX_GRID_CELLS,
                actual: usize::MAX,
            })?;
        if cells > Self::MAX_GRID_CELLS {
            return Err(SimConfigError::GridTooLarge {
                max: Self::MAX_GRID_CELLS,
                actual: cells,
            });
        }
        if self.agent_count == 0 {
            return Err(SimConfigError::InvalidAgentCount);
        }
        if self.agent_count > cells {
            return Err(SimConfigError::AgentCountExceedsCapacity {
                capacity: cells,
                actual: self.agent_count,
            });
        }
        if self.neighbor_radius == 0 {
            return Err(SimConfigError::InvalidNeighborRadius);
        }
        Ok(())
    }

    fn validate_rates(&self) -> Result<(), SimConfigError> {
        if !(self.decay_rate.is_finite() && self.decay_rate > 0.0 && self.decay_rate < 1.0) {
            return Err(SimConfigError::InvalidDecayRate);
        }
        if !in_closed_unit(self.diffusion_rate) {
            return Err(SimConfigError::InvalidDiffusionRate);
        }
        if !(self.vulnerability_max.is_finite()
            && self.vulnerability_max > 0.0
            && self.vulnerability_max <= Self::VULNERABILITY_CEILING)
        {
            return Err(SimConfigError::InvalidVulnerabilityMax);
        }
        if !in_closed_unit(self.affected_threshold) {
            return Err(SimConfigError::InvalidAffectedThreshold);
        }
        Ok(())
    }

    fn validate_shock(&self) -> Result<(), SimConfigError> {
        if !(self.shock_radius.is_finite() && self.shock_radius >= 0.0) {
            return Err(SimConfigError::InvalidShockRadius);
        }
        if !in_closed_unit(self.shock_intensity) {
            return Err(SimConfigError::InvalidShockIntensity);
        }
        Ok(())
    }

    fn validate_run(&self) -> Result<(), SimConfigError> {
        if self.n_steps > Self::MAX_STEPS {
            return Err(SimConfigError::TooManySteps {
                max: Self::MAX_STEPS,
                actual: self.n_steps,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn agent_count_above_capacity_is_rejected() {
        let cfg = SimConfig {
            grid_width: 4,
            grid_height: 4,
            agent_count: 17,
            ..SimConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(SimConfigError::AgentCountExceedsCapacity {
                capacity: 16,
                actual: 17
            })
        );
    }

    #[test]
    fn full_grid_is_accepted() {
        let cfg = SimConfig {
            grid_width: 4,
            grid_height: 4,
            agent_count: 16,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn decay_rate_bounds_are_exclusive() {
        for rate in [0.0, 1.0, -0.1, f64::NAN] {
            let cfg = SimConfig {
                decay_rate: rate,
                ..SimConfig::default()
            };
            assert_eq!(cfg.validate(), Err(SimConfigError::InvalidDecayRate));
        }
    }

    #[test]
    fn vulnerability_max_above_ceiling_is_rejected() {
        let cfg = SimConfig {
            vulnerability_max: 0.31,
            ..SimConfig::default()
        };
        assert_eq!(cfg.validate(), Err(SimConfigError::InvalidVulnerabilityMax));
    }

    #[test]
    fn shock_intensity_outside_unit_interval_is_rejected() {
        let cfg = SimConfig {
            shock_intensity: 1.5,
            ..SimConfig::default()
        };
        assert_eq!(cfg.validate(), Err(SimConfigError::InvalidShockIntensity));
    }

    #[test]
    fn overflowing_grid_is_rejected() {
        let cfg = SimConfig {
            grid_width: usize::MAX,
            grid_height: 2,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SimConfigError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let json = r#"{
            "seed": 7,
            "agent_count": 10,
            "schedule": "fixed_order"
        }"#;
        let cfg: SimConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.agent_count, 10);
        assert_eq!(cfg.schedule, SchedulePolicy::FixedOrder);
        assert_eq!(cfg.update_mode, UpdateMode::Sequential);
        assert_eq!(cfg.grid_width, 50);
        assert!((cfg.decay_rate - 0.05).abs() < f64::EPSILON);
    }
}
