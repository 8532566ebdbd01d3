pub mod metrics;
pub mod schedule;

pub use metrics::*;
pub use schedule::{NoopHook, StepHook};

use crate::community::{Community, CommunityId, CommunitySnapshot, Position};
use crate::config::{SimConfig, SimConfigError};
use crate::grid::{Grid, GridError};
use crate::rng::create_rng;
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};

/// Simulation state: the communities, the lattice they sit on, and the
/// generator that drives placement and per-step visitation order.
pub struct World {
    pub(crate) communities: Vec<Community>,
    pub(crate) grid: Grid,
    pub(crate) config: SimConfig,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) step_index: usize,
    /// Visitation order scratch buffer, reused every step.
    pub(crate) order: Vec<usize>,
    pub(crate) shocked_count: usize,
    pub(crate) initial_mean_intensity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    Placement(GridError),
    CommunityCountMismatch { expected: usize, actual: usize },
    InvalidCommunityId { expected: CommunityId, actual: CommunityId },
    InvalidVulnerability { id: CommunityId },
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::Placement(e) => write!(f, "placement failed: {}", e),
            WorldInitError::CommunityCountMismatch { expected, actual } => write!(
                f,
                "communities.len() ({actual}) must match agent_count ({expected})"
            ),
            WorldInitError::InvalidCommunityId { expected, actual } => write!(
                f,
                "community ids must run 1..=N in order: expected {expected}, found {actual}"
            ),
            WorldInitError::InvalidVulnerability { id } => write!(
                f,
                "community {id} has a vulnerability outside [0, vulnerability_max)"
            ),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl From<GridError> for WorldInitError {
    fn from(err: GridError) -> Self {
        WorldInitError::Placement(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            WorldInitError::Placement(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    TooManySteps { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
        }
    }
}

impl Error for ExperimentError {}

fn euclidean_distance(a: Position, b: Position) -> f64 {
    let dx = a[0] as f64 - b[0] as f64;
    let dy = a[1] as f64 - b[1] as f64;
    (dx * dx + dy * dy).sqrt()
}

impl World {
    /// Build a world with the standard initialization protocol: draw every
    /// vulnerability, place each community on a random free cell, then shock
    /// the communities near the lattice midpoint.
    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let mut rng = create_rng(config.seed);

        let vulnerabilities: Vec<f64> = (0..config.agent_count)
            .map(|_| rng.random_range(0.0..config.vulnerability_max))
            .collect();

        let mut grid = Grid::new(config.grid_width, config.grid_height);
        let mut communities = Vec::with_capacity(config.agent_count);
        for (slot, vulnerability) in vulnerabilities.into_iter().enumerate() {
            let id = Self::id_for_slot(slot);
            let position = grid.place_random_unique(id, &mut rng)?;
            communities.push(Community::new(id, position, vulnerability));
        }

        let center = grid.center();
        let mut shocked_count = 0;
        for community in &mut communities {
            if euclidean_distance(community.position(), center) < config.shock_radius {
                community.set_intensity(config.shock_intensity);
                shocked_count += 1;
            }
        }

        Ok(Self::assemble(communities, grid, config, rng, shocked_count))
    }

    /// Build a world from explicitly positioned communities. No random draws
    /// are made and no shock is applied; intensities are taken as given.
    pub fn try_from_communities(
        config: SimConfig,
        communities: Vec<Community>,
    ) -> Result<Self, WorldInitError> {
        config.validate()?;
        if communities.len() != config.agent_count {
            return Err(WorldInitError::CommunityCountMismatch {
                expected: config.agent_count,
                actual: communities.len(),
            });
        }

        let mut grid = Grid::new(config.grid_width, config.grid_height);
        for (slot, community) in communities.iter().enumerate() {
            let expected = Self::id_for_slot(slot);
            if community.id() != expected {
                return Err(WorldInitError::InvalidCommunityId {
                    expected,
                    actual: community.id(),
                });
            }
            let v = community.vulnerability();
            if !(v.is_finite() && v >= 0.0 && v < config.vulnerability_max) {
                return Err(WorldInitError::InvalidVulnerability { id: community.id() });
            }
            grid.place(community.id(), community.position())?;
        }

        let shocked_count = communities.iter().filter(|c| c.intensity() > 0.0).count();
        let rng = create_rng(config.seed);
        Ok(Self::assemble(communities, grid, config, rng, shocked_count))
    }

    fn assemble(
        communities: Vec<Community>,
        grid: Grid,
        config: SimConfig,
        rng: ChaCha12Rng,
        shocked_count: usize,
    ) -> Self {
        let mut world = Self {
            order: (0..communities.len()).collect(),
            communities,
            grid,
            config,
            rng,
            step_index: 0,
            shocked_count,
            initial_mean_intensity: 0.0,
        };
        world.initial_mean_intensity = world.mean_intensity();
        tracing::info!(
            agents = world.communities.len(),
            width = world.grid.width(),
            height = world.grid.height(),
            shocked = world.shocked_count,
            initial_mean = world.initial_mean_intensity,
            "world initialized"
        );
        world
    }

    // Ids are assigned 1..=N in creation order, so slot = id - 1. Validation
    // caps agent_count at MAX_GRID_CELLS, which fits in a CommunityId.
    pub(crate) fn id_for_slot(slot: usize) -> CommunityId {
        (slot + 1) as CommunityId
    }

    pub(crate) fn slot_for_id(id: CommunityId) -> usize {
        id as usize - 1
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Communities in creation order.
    pub fn communities(&self) -> &[Community] {
        &self.communities
    }

    pub fn community(&self, id: CommunityId) -> Option<&Community> {
        if id == 0 {
            return None;
        }
        self.communities.get(Self::slot_for_id(id))
    }

    /// Number of completed steps.
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn shocked_count(&self) -> usize {
        self.shocked_count
    }

    /// Mean intensity right after initialization, before any step.
    pub fn initial_mean_intensity(&self) -> f64 {
        self.initial_mean_intensity
    }

    pub fn mean_intensity(&self) -> f64 {
        if self.communities.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.communities.iter().map(Community::intensity).sum();
        sum / self.communities.len() as f64
    }

    pub fn snapshot(&self) -> Vec<CommunitySnapshot> {
        self.communities.iter().map(CommunitySnapshot::from).collect()
    }

    /// Run `config.n_steps` steps and return the collected series.
    pub fn run(&mut self) -> RunSummary {
        let steps = self.config.n_steps;
        self.run_steps(steps, &mut NoopHook)
    }

    pub fn try_run_experiment(&mut self, steps: usize) -> Result<RunSummary, ExperimentError> {
        self.try_run_experiment_with_hook(steps, &mut NoopHook)
    }

    pub fn try_run_experiment_with_hook(
        &mut self,
        steps: usize,
        hook: &mut dyn StepHook,
    ) -> Result<RunSummary, ExperimentError> {
        if steps > SimConfig::MAX_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: SimConfig::MAX_STEPS,
                actual: steps,
            });
        }
        Ok(self.run_steps(steps, hook))
    }

    fn run_steps(&mut self, steps: usize, hook: &mut dyn StepHook) -> RunSummary {
        let start_mean = self.mean_intensity();
        let mut samples = Vec::with_capacity(steps);
        for _ in 0..steps {
            samples.push(self.step_with_hook(hook));
        }
        RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            steps,
            shocked_count: self.shocked_count,
            initial_mean_intensity: start_mean,
            samples,
        }
    }
}
