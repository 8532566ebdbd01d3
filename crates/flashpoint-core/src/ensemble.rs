use crate::config::SimConfig;
use crate::world::{RunSummary, World, WorldInitError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnsembleMember {
    pub seed: u64,
    pub summary: RunSummary,
}

/// Cross-seed envelope of the mean-intensity series at one step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct EnsembleStep {
    pub step: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Run one independent world per seed. Worlds never share state; each one is
/// stepped sequentially on its own worker. Results come back in seed order.
pub fn run_ensemble(
    config: &SimConfig,
    seeds: &[u64],
) -> Result<Vec<EnsembleMember>, WorldInitError> {
    config.validate()?;
    seeds
        .par_iter()
        .map(|&seed| -> Result<EnsembleMember, WorldInitError> {
            let mut world = World::try_new(SimConfig {
                seed,
                ..config.clone()
            })?;
            Ok(EnsembleMember {
                seed,
                summary: world.run(),
            })
        })
        .collect()
}

/// Per-step mean/min/max across members, truncated to the shortest series.
pub fn summarize(members: &[EnsembleMember]) -> Vec<EnsembleStep> {
    let Some(len) = members.iter().map(|m| m.summary.samples.len()).min() else {
        return Vec::new();
    };
    (0..len)
        .map(|i| {
            let values = members.iter().map(|m| m.summary.samples[i].mean_intensity);
            let (sum, min, max) = values.fold(
                (0.0f64, f64::INFINITY, f64::NEG_INFINITY),
                |(s, lo, hi), v| (s + v, lo.min(v), hi.max(v)),
            );
            EnsembleStep {
                step: members[0].summary.samples[i].step,
                mean: sum / members.len() as f64,
                min,
                max,
            }
        })
        .collect()
}
