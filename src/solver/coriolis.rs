//! Planetary rotation.
//!
//! The Coriolis terms are integrated with the implicit trapezoidal rotation
//!
//! u′ = ((1 − α²)·u + 2α·v) / (1 + α²)
//! v′ = (−2α·u + (1 − α²)·v) / (1 + α²),  α = ½·f·Δt
//!
//! which is an exact rotation matrix: u′² + v′² = u² + v² per cell for any
//! Δt and f. Rotation can therefore never inject kinetic energy, no matter
//! how large the timestep.
//!
//! On a beta plane f varies with the meridional coordinate,
//! f = f₀ + β·(Δy − y₀), so the northern and southern flanks of a vortex
//! feel different rotation rates. That asymmetry self-organizes the classic northwestward beta
//! drift without any prescribed steering.

use ndarray::Array3;

use crate::grid::Grid;

/// Earth's rotation rate (rad/s).
pub const OMEGA_EARTH: f64 = 7.2921e-5;

/// Earth's mean radius (m).
pub const EARTH_RADIUS: f64 = 6.371e6;

/// Coriolis parameter model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoriolisParameter {
    /// Constant f everywhere. A vortex on an f-plane has no beta drift.
    FPlane { f0: f64 },
    /// f = f₀ + β·(Δy − y₀). `beta` in 1/(m·s); `y0` is the meridional
    /// offset from the domain center where f equals f₀.
    BetaPlane { f0: f64, beta: f64, y0: f64 },
}

impl CoriolisParameter {
    /// f-plane with f₀ = 2Ω·sin(latitude).
    pub fn f_plane_at_latitude(latitude_deg: f64) -> Self {
        Self::FPlane {
            f0: 2.0 * OMEGA_EARTH * latitude_deg.to_radians().sin(),
        }
    }

    /// Beta plane with f₀ at the domain center: f₀ = 2Ω·sin(φ),
    /// β = 2Ω·cos(φ)/a.
    pub fn beta_plane_at_latitude(latitude_deg: f64) -> Self {
        let phi = latitude_deg.to_radians();
        Self::BetaPlane {
            f0: 2.0 * OMEGA_EARTH * phi.sin(),
            beta: 2.0 * OMEGA_EARTH * phi.cos() / EARTH_RADIUS,
            y0: 0.0,
        }
    }

    /// Coriolis parameter at meridional offset `dy` from the domain center.
    #[inline]
    pub fn f_at(&self, dy: f64) -> f64 {
        match *self {
            Self::FPlane { f0 } => f0,
            Self::BetaPlane { f0, beta, y0 } => f0 + beta * (dy - y0),
        }
    }

    /// Whether f varies with y.
    #[inline]
    pub fn is_beta_plane(&self) -> bool {
        matches!(self, Self::BetaPlane { .. })
    }
}

/// Apply one implicit rotation step to the horizontal velocity in place.
/// On a beta plane α is recomputed per y row.
pub fn apply_rotation(
    grid: &Grid,
    parameter: &CoriolisParameter,
    u: &mut Array3<f64>,
    v: &mut Array3<f64>,
    dt: f64,
) {
    let y_center = grid.ly / 2.0;
    for j in 0..grid.ny {
        let dy = j as f64 * grid.dy - y_center;
        let alpha = 0.5 * parameter.f_at(dy) * dt;
        let denom = 1.0 + alpha * alpha;
        let c_diag = (1.0 - alpha * alpha) / denom;
        let c_off = 2.0 * alpha / denom;

        for i in 0..grid.nx {
            for k in 0..grid.nz {
                let u0 = u[[i, j, k]];
                let v0 = v[[i, j, k]];
                u[[i, j, k]] = c_diag * u0 + c_off * v0;
                v[[i, j, k]] = -c_off * u0 + c_diag * v0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_grid() -> Grid {
        Grid::new(8, 8, 4, 1.0e6, 1.0e6, 2.0e4)
    }

    #[test]
    fn test_f_plane_value_at_latitude() {
        let parameter = CoriolisParameter::f_plane_at_latitude(20.0);
        // 2·Ω·sin(20°) ≈ 4.99e-5 s⁻¹.
        let f = parameter.f_at(0.0);
        assert!((f - 4.988e-5).abs() < 1e-7, "f = {f}");
        assert_eq!(f, parameter.f_at(5.0e5));
    }

    #[test]
    fn test_beta_plane_varies_with_y() {
        let parameter = CoriolisParameter::beta_plane_at_latitude(15.0);
        let f_south = parameter.f_at(-5.0e5);
        let f_center = parameter.f_at(0.0);
        let f_north = parameter.f_at(5.0e5);
        assert!(f_south < f_center && f_center < f_north);
        // β at 15°N ≈ 2.2e-11 /(m·s).
        let beta = (f_north - f_south) / 1.0e6;
        assert!((beta - 2.21e-11).abs() < 1e-13, "beta = {beta}");
    }

    #[test]
    fn test_beta_plane_reference_offset() {
        // y0 shifts where f equals f0 without changing the gradient.
        let base = CoriolisParameter::beta_plane_at_latitude(15.0);
        let CoriolisParameter::BetaPlane { f0, beta, .. } = base else {
            panic!("expected beta plane");
        };
        let shifted = CoriolisParameter::BetaPlane {
            f0,
            beta,
            y0: 2.0e5,
        };
        assert_eq!(base.f_at(0.0), f0);
        assert_eq!(shifted.f_at(2.0e5), f0);
        let gradient = (shifted.f_at(6.0e5) - shifted.f_at(2.0e5)) / 4.0e5;
        assert!((gradient - beta).abs() < 1e-18);
    }

    #[test]
    fn test_rotation_conserves_kinetic_energy_large_dt() {
        let grid = make_grid();
        let parameter = CoriolisParameter::f_plane_at_latitude(30.0);
        let mut u = grid.zeros();
        let mut v = grid.zeros();
        for ((i, j, k), value) in u.indexed_iter_mut() {
            *value = (i as f64 - j as f64) * 0.5 + k as f64;
        }
        for ((i, j, _), value) in v.indexed_iter_mut() {
            *value = (i * j) as f64 * 0.01 - 3.0;
        }
        let ke_before: f64 = u
            .iter()
            .zip(v.iter())
            .map(|(a, b)| a * a + b * b)
            .sum();
        // A deliberately huge timestep: an explicit step would blow up.
        apply_rotation(&grid, &parameter, &mut u, &mut v, 3.0e4);
        let ke_after: f64 = u
            .iter()
            .zip(v.iter())
            .map(|(a, b)| a * a + b * b)
            .sum();
        assert!(
            ((ke_after - ke_before) / ke_before).abs() < 1e-12,
            "KE drift: {ke_before} -> {ke_after}"
        );
    }

    #[test]
    fn test_rotation_turns_wind_clockwise_nh() {
        // Northern hemisphere: a northward wind is deflected eastward.
        let grid = make_grid();
        let parameter = CoriolisParameter::f_plane_at_latitude(30.0);
        let mut u = grid.zeros();
        let mut v = Array3::from_elem(grid.shape(), 10.0);
        apply_rotation(&grid, &parameter, &mut u, &mut v, 600.0);
        assert!(u[[4, 4, 0]] > 0.0);
        assert!(v[[4, 4, 0]] < 10.0);
    }

    #[test]
    fn test_per_cell_speed_preserved_on_beta_plane() {
        let grid = make_grid();
        let parameter = CoriolisParameter::beta_plane_at_latitude(15.0);
        let mut u = Array3::from_elem(grid.shape(), 6.0);
        let mut v = Array3::from_elem(grid.shape(), -8.0);
        apply_rotation(&grid, &parameter, &mut u, &mut v, 1200.0);
        for (a, b) in u.iter().zip(v.iter()) {
            let speed = (a * a + b * b).sqrt();
            assert!((speed - 10.0).abs() < 1e-12);
        }
    }
}
