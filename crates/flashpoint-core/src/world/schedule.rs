use super::metrics::StepMetrics;
use super::World;
use crate::community::{Community, Position};
use crate::config::{SchedulePolicy, UpdateMode};
use rand::seq::SliceRandom;

/// Region-wide hook run once per step, after every community has been visited
/// and before metrics are collected.
pub trait StepHook {
    fn on_step(&mut self, _step: usize, _communities: &[Community]) {}
}

/// Hook used by [`World::step`]; does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHook;

impl StepHook for NoopHook {}

impl World {
    pub fn step(&mut self) -> StepMetrics {
        self.step_with_hook(&mut NoopHook)
    }

    pub fn step_with_hook(&mut self, hook: &mut dyn StepHook) -> StepMetrics {
        self.prepare_visit_order();

        match self.config.update_mode {
            UpdateMode::Sequential => self.visit_sequential(),
            UpdateMode::Synchronous => self.visit_synchronous(),
        }

        self.step_index += 1;
        hook.on_step(self.step_index, &self.communities);

        let metrics = self.collect_step_metrics(self.step_index);
        tracing::debug!(
            step = metrics.step,
            mean_intensity = metrics.mean_intensity,
            affected = metrics.affected_count,
            "step complete"
        );
        metrics
    }

    /// Slot indices in the order communities are visited this step.
    pub fn visit_order(&self) -> &[usize] {
        &self.order
    }

    fn prepare_visit_order(&mut self) {
        // Reset before shuffling so each permutation is independent of the last.
        for (i, slot) in self.order.iter_mut().enumerate() {
            *slot = i;
        }
        if self.config.schedule == SchedulePolicy::RandomPermutation {
            self.order.shuffle(&mut self.rng);
        }
    }

    fn neighbor_mean(&self, position: Position, read: impl Fn(usize) -> f64) -> Option<f64> {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        for (_, id) in self
            .grid
            .occupied_within(position, self.config.neighbor_radius)
        {
            sum += read(Self::slot_for_id(id));
            count += 1;
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Gauss-Seidel: every update is committed before the next community is
    /// visited, so later visits read this step's earlier results.
    fn visit_sequential(&mut self) {
        let decay = self.config.decay_rate;
        let diffusion = self.config.diffusion_rate;
        for k in 0..self.order.len() {
            let slot = self.order[k];
            let position = self.communities[slot].position();
            let mean = self.neighbor_mean(position, |s| self.communities[s].intensity());
            self.communities[slot].relax(mean, decay, diffusion);
        }
    }

    /// Jacobi: neighbor intensities come from the pre-step snapshot.
    fn visit_synchronous(&mut self) {
        let decay = self.config.decay_rate;
        let diffusion = self.config.diffusion_rate;
        let previous: Vec<f64> = self.communities.iter().map(Community::intensity).collect();
        for k in 0..self.order.len() {
            let slot = self.order[k];
            let position = self.communities[slot].position();
            let mean = self.neighbor_mean(position, |s| previous[s]);
            self.communities[slot].relax(mean, decay, diffusion);
        }
    }
}
