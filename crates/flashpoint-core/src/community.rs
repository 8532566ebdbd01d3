use serde::{Deserialize, Serialize};

pub type CommunityId = u32;

/// Lattice cell as `[x, y]`.
pub type Position = [usize; 2];

/// A single community on the lattice.
///
/// `id`, `position` and `vulnerability` are fixed at construction; only the
/// intensity evolves, and it is kept within `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Community {
    id: CommunityId,
    position: Position,
    vulnerability: f64,
    intensity: f64,
}

impl Community {
    pub fn new(id: CommunityId, position: Position, vulnerability: f64) -> Self {
        Self {
            id,
            position,
            vulnerability,
            intensity: 0.0,
        }
    }

    /// Same as [`Community::new`] with a starting intensity, clamped to `[0, 1]`.
    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.set_intensity(intensity);
        self
    }

    pub fn id(&self) -> CommunityId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn vulnerability(&self) -> f64 {
        self.vulnerability
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub(crate) fn set_intensity(&mut self, intensity: f64) {
        self.intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
    }

    /// Apply one decay/diffusion update.
    ///
    /// Decay is multiplicative. Diffusion only ever adds intensity: the gap to
    /// the neighbor mean is measured after decay and ignored when negative.
    /// `neighbor_mean` is `None` when the community has no neighbors.
    pub fn relax(&mut self, neighbor_mean: Option<f64>, decay_rate: f64, diffusion_rate: f64) {
        let mut next = self.intensity - decay_rate * self.intensity;
        if let Some(avg) = neighbor_mean {
            let spread = diffusion_rate * self.vulnerability * (avg - next);
            next += spread.max(0.0);
        }
        self.set_intensity(next);
    }
}

/// Per-community view handed to external renderers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CommunitySnapshot {
    pub id: CommunityId,
    pub x: usize,
    pub y: usize,
    pub intensity: f64,
    pub vulnerability: f64,
}

impl From<&Community> for CommunitySnapshot {
    fn from(c: &Community) -> Self {
        Self {
            id: c.id,
            x: c.position[0],
            y: c.position[1],
            intensity: c.intensity,
            vulnerability: c.vulnerability,
        }
    }
}
