pub mod community;
pub mod config;
pub mod ensemble;
pub mod grid;
pub mod rng;
pub mod world;

pub use community::{Community, CommunityId, CommunitySnapshot, Position};
pub use config::{SchedulePolicy, SimConfig, SimConfigError, UpdateMode};
pub use ensemble::{run_ensemble, EnsembleMember, EnsembleStep};
pub use grid::{Grid, GridError};
pub use world::{
    ExperimentError, IntensityRecord, NoopHook, RunSummary, StepHook, StepMetrics, World,
    WorldInitError,
};

/// Initialize a world from `config` and run it for `config.n_steps` steps.
pub fn simulate(config: SimConfig) -> Result<RunSummary, WorldInitError> {
    let mut world = World::try_new(config)?;
    Ok(world.run())
}
