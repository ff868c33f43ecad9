//! Prognostic model state.
//!
//! All fields are dense `Array3<f64>` aligned to the [`Grid`]. The state has
//! a single owner — the integration driver — and is passed by mutable
//! reference into each component's step; no component retains a copy between
//! frames.

use ndarray::Array3;

use crate::grid::Grid;

/// Prognostic fields: velocity, kinematic pressure, potential-temperature
/// perturbation, and specific humidity.
#[derive(Debug, Clone)]
pub struct State {
    /// Zonal (x) velocity (m/s).
    pub u: Array3<f64>,
    /// Meridional (y) velocity (m/s).
    pub v: Array3<f64>,
    /// Vertical velocity (m/s).
    pub w: Array3<f64>,
    /// Kinematic pressure from the last projection (m²/s²).
    pub p: Array3<f64>,
    /// Potential-temperature perturbation θ′ (K).
    pub theta_prime: Array3<f64>,
    /// Specific humidity q (kg/kg).
    pub q: Array3<f64>,
}

impl State {
    /// Allocate a zeroed state aligned to `grid`, with moisture initialized
    /// from the reference profile.
    pub fn new(grid: &Grid, q_ref: &ndarray::Array1<f64>) -> Self {
        let mut q = grid.zeros();
        for k in 0..grid.nz {
            q.index_axis_mut(ndarray::Axis(2), k).fill(q_ref[k]);
        }
        Self {
            u: grid.zeros(),
            v: grid.zeros(),
            w: grid.zeros(),
            p: grid.zeros(),
            theta_prime: grid.zeros(),
            q,
        }
    }

    /// Maximum 3D wind speed (m/s).
    pub fn max_wind(&self) -> f64 {
        let mut max_sq: f64 = 0.0;
        for ((u, v), w) in self.u.iter().zip(self.v.iter()).zip(self.w.iter()) {
            let m = u * u + v * v + w * w;
            if m > max_sq {
                max_sq = m;
            }
        }
        max_sq.sqrt()
    }

    /// Name of the first prognostic field containing a non-finite value, if
    /// any. Pressure is diagnostic and excluded.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        let fields: [(&'static str, &Array3<f64>); 5] = [
            ("u", &self.u),
            ("v", &self.v),
            ("w", &self.w),
            ("theta_prime", &self.theta_prime),
            ("q", &self.q),
        ];
        for (name, field) in fields {
            if !field.iter().all(|x| x.is_finite()) {
                return Some(name);
            }
        }
        None
    }

    /// θ′ extremes (min, max) in K.
    pub fn theta_extremes(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &t in self.theta_prime.iter() {
            lo = lo.min(t);
            hi = hi.max(t);
        }
        (lo, hi)
    }
}
