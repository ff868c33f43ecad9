//! Smagorinsky subgrid turbulence closure.
//!
//! Eddy viscosity is diagnosed from the resolved strain rate,
//!
//! ν_e = boost · (Cs·Δ)² · |S|,  |S| = √(2·S_ij·S_ij),
//!
//! with Δ = (dx·dy·dz)^⅓ the geometric-mean filter width. The `boost`
//! factor compensates for subgrid motion a mesoscale grid cannot resolve.
//!
//! Diffusion is applied in horizontal flux form, ∂f/∂t = ∇_h·(ν_e ∇_h f):
//! the column is clamped for transport, so vertical mixing across the
//! formally periodic z transform is excluded here as well. A spatially
//! varying ν_e in flux form conserves the domain integral of the diffused
//! field. Before use, ν_e is clamped to the explicit stability ceiling for
//! the step, so a strained boundary cell can at worst diffuse at the
//! maximum stable rate.

use ndarray::{Array3, Zip};

use crate::grid::Grid;
use crate::spectral::SpectralTransform;

/// Safety factor against the explicit diffusion stability bound.
const STABILITY_FACTOR: f64 = 0.25;

/// Per-step eddy-viscosity statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurbulenceReport {
    /// Largest diagnosed eddy viscosity (m²/s), before the stability clamp.
    pub nu_max: f64,
    /// Domain-mean eddy viscosity (m²/s).
    pub nu_mean: f64,
}

impl TurbulenceReport {
    pub fn from_viscosity(nu: &Array3<f64>) -> Self {
        Self {
            nu_max: nu.iter().fold(0.0_f64, |m, &x| m.max(x)),
            nu_mean: nu.mean().unwrap_or(0.0),
        }
    }
}

/// Smagorinsky eddy-viscosity closure.
#[derive(Debug, Clone, Copy)]
pub struct Smagorinsky {
    cs: f64,
    boost: f64,
}

impl Smagorinsky {
    pub fn new(cs: f64, boost: f64) -> Self {
        Self { cs, boost }
    }

    /// Diagnose the eddy-viscosity field from the current velocity.
    pub fn eddy_viscosity(
        &self,
        grid: &Grid,
        transform: &SpectralTransform,
        u: &Array3<f64>,
        v: &Array3<f64>,
        w: &Array3<f64>,
    ) -> Array3<f64> {
        let dudx = transform.gradient_x(grid, u);
        let dudy = transform.gradient_y(grid, u);
        let dudz = transform.gradient_z(grid, u);
        let dvdx = transform.gradient_x(grid, v);
        let dvdy = transform.gradient_y(grid, v);
        let dvdz = transform.gradient_z(grid, v);
        let dwdx = transform.gradient_x(grid, w);
        let dwdy = transform.gradient_y(grid, w);
        let dwdz = transform.gradient_z(grid, w);

        let delta = (grid.dx * grid.dy * grid.dz).cbrt();
        let prefactor = self.boost * (self.cs * delta).powi(2);

        let mut nu = grid.zeros();
        Zip::from(&mut nu)
            .and(&dudx)
            .and(&dvdy)
            .and(&dwdz)
            .for_each(|n, &a, &b, &c| {
                // Diagonal contribution 2(S11² + S22² + S33²).
                *n = 2.0 * (a * a + b * b + c * c);
            });
        // Off-diagonal strain components, each counted twice: 4·S_ij².
        Zip::from(&mut nu)
            .and(&dudy)
            .and(&dvdx)
            .for_each(|n, &a, &b| *n += (a + b).powi(2));
        Zip::from(&mut nu)
            .and(&dudz)
            .and(&dwdx)
            .for_each(|n, &a, &b| *n += (a + b).powi(2));
        Zip::from(&mut nu)
            .and(&dvdz)
            .and(&dwdy)
            .for_each(|n, &a, &b| *n += (a + b).powi(2));

        nu.mapv_inplace(|s| prefactor * s.sqrt());
        nu
    }

    /// Largest viscosity the explicit step can take stably at `dt`.
    pub fn stability_ceiling(grid: &Grid, dt: f64) -> f64 {
        let kx_max = std::f64::consts::PI / grid.dx;
        let ky_max = std::f64::consts::PI / grid.dy;
        STABILITY_FACTOR / ((kx_max * kx_max + ky_max * ky_max) * dt)
    }

    /// Diffuse one field in place over `dt` with the given viscosity,
    /// clamped to the stability ceiling.
    pub fn diffuse(
        &self,
        grid: &Grid,
        transform: &SpectralTransform,
        nu: &Array3<f64>,
        field: &mut Array3<f64>,
        dt: f64,
    ) {
        let ceiling = Self::stability_ceiling(grid, dt);
        let mut flux_x = transform.gradient_x(grid, field);
        let mut flux_y = transform.gradient_y(grid, field);
        Zip::from(&mut flux_x).and(nu).for_each(|f, &n| *f *= n.min(ceiling));
        Zip::from(&mut flux_y).and(nu).for_each(|f, &n| *f *= n.min(ceiling));
        let mut tendency = transform.gradient_x(grid, &flux_x);
        tendency += &transform.gradient_y(grid, &flux_y);
        field.scaled_add(dt, &tendency);
    }
}
