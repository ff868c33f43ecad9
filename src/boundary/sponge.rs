//! Sponge damping bands.
//!
//! The domain is periodic, so without absorption every gravity wave a storm
//! radiates comes back around and hits it again. Two sponges stop that:
//!
//! - a lateral band along all four horizontal edges, damping u and v toward
//!   zero with coefficient γ = strength·clip(1 − d/band, 0, 1), d being the
//!   normalized distance to the nearest edge. The coefficient is exactly
//!   zero for d ≥ band: the interior, including a storm near the center, is
//!   never touched;
//! - a vertical cos²-shaped band over the top fraction of levels, damping w
//!   and θ′ toward zero and relaxing q toward the reference profile, which
//!   absorbs vertically propagating waves before they wrap through the
//!   periodic z transform.

use ndarray::{Array1, Array2};

use crate::grid::{Grid, ReferenceProfile};
use crate::state::State;

/// Precomputed sponge coefficient maps.
#[derive(Debug, Clone)]
pub struct Sponge {
    /// Per-column lateral damping coefficient (fraction per step).
    lateral: Array2<f64>,
    /// Per-level vertical damping coefficient (fraction per step).
    vertical: Array1<f64>,
}

impl Sponge {
    /// Build the coefficient maps.
    ///
    /// `band_fraction` is the lateral band width per edge as a fraction of
    /// the domain; `top_fraction` the depth of the vertical band from the
    /// model top. Strengths are fractional decay per step at the edge / top.
    pub fn new(
        grid: &Grid,
        band_fraction: f64,
        strength: f64,
        lateral_enabled: bool,
        top_fraction: f64,
        top_strength: f64,
        vertical_enabled: bool,
    ) -> Self {
        let mut lateral = Array2::zeros((grid.nx, grid.ny));
        if lateral_enabled {
            for i in 0..grid.nx {
                let x = (i as f64 + 0.5) / grid.nx as f64;
                for j in 0..grid.ny {
                    let y = (j as f64 + 0.5) / grid.ny as f64;
                    let edge_distance = x.min(1.0 - x).min(y).min(1.0 - y);
                    lateral[[i, j]] =
                        strength * (1.0 - edge_distance / band_fraction).clamp(0.0, 1.0);
                }
            }
        }

        let mut vertical = Array1::zeros(grid.nz);
        if vertical_enabled && top_fraction > 0.0 {
            let z_start = grid.lz * (1.0 - top_fraction);
            let depth = grid.lz - z_start;
            for k in 0..grid.nz {
                let z = grid.z_levels[k];
                if z > z_start {
                    let ramp = (z - z_start) / depth;
                    let shape = (0.5 * std::f64::consts::PI * ramp).sin().powi(2);
                    vertical[k] = top_strength * shape;
                }
            }
        }

        Self { lateral, vertical }
    }

    /// Lateral coefficient at column (i, j).
    #[inline]
    pub fn lateral_coefficient(&self, i: usize, j: usize) -> f64 {
        self.lateral[[i, j]]
    }

    /// Vertical coefficient at level k.
    #[inline]
    pub fn vertical_coefficient(&self, k: usize) -> f64 {
        self.vertical[k]
    }

    /// Apply one damping step.
    pub fn apply(&self, grid: &Grid, profile: &ReferenceProfile, state: &mut State) {
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                let gamma = self.lateral[[i, j]];
                if gamma > 0.0 {
                    let keep = 1.0 - gamma;
                    for k in 0..grid.nz {
                        state.u[[i, j, k]] *= keep;
                        state.v[[i, j, k]] *= keep;
                    }
                }
            }
        }

        for k in 0..grid.nz {
            let gamma = self.vertical[k];
            if gamma <= 0.0 {
                continue;
            }
            let keep = 1.0 - gamma;
            let q_ref = profile.q_ref[k];
            for i in 0..grid.nx {
                for j in 0..grid.ny {
                    state.w[[i, j, k]] *= keep;
                    state.theta_prime[[i, j, k]] *= keep;
                    let q = state.q[[i, j, k]];
                    state.q[[i, j, k]] = q + gamma * (q_ref - q);
                }
            }
        }
    }
}
