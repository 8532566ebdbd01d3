use super::World;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// One `(step, mean_intensity)` point of the output series.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntensityRecord {
    pub step: usize,
    pub mean_intensity: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub mean_intensity: f64,
    pub intensity_std: f64,
    pub max_intensity: f64,
    pub affected_count: usize,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub steps: usize,
    #[serde(default)]
    pub shocked_count: usize,
    /// Mean intensity before the first step of this run.
    pub initial_mean_intensity: f64,
    pub samples: Vec<StepMetrics>,
}

impl RunSummary {
    pub fn series(&self) -> Vec<IntensityRecord> {
        self.samples
            .iter()
            .map(|s| IntensityRecord {
                step: s.step,
                mean_intensity: s.mean_intensity,
            })
            .collect()
    }

    pub fn final_mean_intensity(&self) -> Option<f64> {
        self.samples.last().map(|s| s.mean_intensity)
    }

    pub fn peak_mean_intensity(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.mean_intensity)
            .reduce(f64::max)
    }

    /// Write the series as `step,mean_intensity` CSV with a header row.
    pub fn write_series_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "step,mean_intensity")?;
        for record in self.series() {
            writeln!(out, "{},{}", record.step, record.mean_intensity)?;
        }
        out.flush()
    }
}

impl World {
    pub(crate) fn collect_step_metrics(&self, step: usize) -> StepMetrics {
        let n = self.communities.len();
        let denom = n.max(1) as f64;
        let threshold = self.config.affected_threshold;

        let mut sum = 0.0f64;
        let mut max_intensity = 0.0f64;
        let mut affected_count = 0usize;
        for c in &self.communities {
            let v = c.intensity();
            sum += v;
            max_intensity = max_intensity.max(v);
            if v >= threshold {
                affected_count += 1;
            }
        }
        let mean_intensity = sum / denom;

        let intensity_std = if n < 2 {
            0.0
        } else {
            let var = self
                .communities
                .iter()
                .map(|c| (c.intensity() - mean_intensity).powi(2))
                .sum::<f64>()
                / (n - 1) as f64;
            var.sqrt()
        };

        StepMetrics {
            step,
            mean_intensity,
            intensity_std,
            max_intensity,
            affected_count,
        }
    }
}
