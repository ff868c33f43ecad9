//! Static reference atmosphere: the vertical profiles every thermodynamic
//! term is computed against.
//!
//! The prognostic variable is the potential-temperature perturbation
//! θ′ = θ − θ₀(z). The reference state is built once at initialization and
//! shared read-only:
//!
//! - θ₀(z) = θ_surface + Γ_θ·z (linear lapse in potential temperature)
//! - p₀(z) = p_surface·exp(−z/H) (isothermal scale-height hydrostatics)
//! - Π(z) = (p₀/p_ref)^(R_d/c_p) (Exner function, for θ ↔ T conversion)
//! - q_ref(z) = q_surface·exp(−z/H_q) (moisture reference, used by the
//!   vertical sponge and far-field relaxation)

use ndarray::Array1;

use super::Grid;

/// Specific gas constant of dry air (J/(kg·K)).
pub const R_DRY: f64 = 287.0;

/// Specific heat of dry air at constant pressure (J/(kg·K)).
pub const CP_DRY: f64 = 1004.0;

/// Latent heat of vaporization (J/kg).
pub const LATENT_HEAT_VAPORIZATION: f64 = 2.5e6;

/// Reference pressure for the Exner function (Pa).
pub const P_REFERENCE: f64 = 1.0e5;

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f64 = 9.81;

/// Ratio of gas constants for water vapor saturation (dimensionless).
pub const EPSILON_VAPOR: f64 = 0.622;

/// Immutable reference vertical profiles, one value per model level.
#[derive(Debug, Clone)]
pub struct ReferenceProfile {
    /// Reference potential temperature θ₀(z_k) (K).
    pub theta0: Array1<f64>,
    /// Reference pressure p₀(z_k) (Pa).
    pub pressure: Array1<f64>,
    /// Exner function Π(z_k) = (p₀/p_ref)^(R/cp).
    pub exner: Array1<f64>,
    /// Stratification gradient dθ₀/dz (K/m), constant for the linear profile.
    pub dtheta0_dz: f64,
    /// Reference moisture q_ref(z_k) (kg/kg).
    pub q_ref: Array1<f64>,
}

impl ReferenceProfile {
    /// Build the reference state for a grid.
    ///
    /// # Arguments
    /// * `theta_surface` - surface potential temperature (K), e.g. 300
    /// * `gamma_theta` - potential-temperature lapse rate (K/m), e.g. 4e-3
    /// * `scale_height` - pressure scale height (m), e.g. 8500
    /// * `q_surface` - surface specific humidity (kg/kg), e.g. 0.018
    /// * `q_scale_height` - moisture scale height (m), e.g. 2500
    pub fn new(
        grid: &Grid,
        theta_surface: f64,
        gamma_theta: f64,
        scale_height: f64,
        q_surface: f64,
        q_scale_height: f64,
    ) -> Self {
        let theta0 = grid.z_levels.mapv(|z| theta_surface + gamma_theta * z);
        let pressure = grid.z_levels.mapv(|z| P_REFERENCE * (-z / scale_height).exp());
        let exner = pressure.mapv(|p| (p / P_REFERENCE).powf(R_DRY / CP_DRY));
        let q_ref = grid.z_levels.mapv(|z| q_surface * (-z / q_scale_height).exp());

        Self {
            theta0,
            pressure,
            exner,
            dtheta0_dz: gamma_theta,
            q_ref,
        }
    }

    /// Absolute temperature (K) of total potential temperature `theta` at
    /// level `k`: T = θ·Π(z_k).
    #[inline]
    pub fn temperature(&self, theta: f64, k: usize) -> f64 {
        theta * self.exner[k]
    }

    /// Saturation specific humidity (kg/kg) at temperature `t_kelvin` and
    /// the reference pressure of level `k` (Magnus form of
    /// Clausius-Clapeyron, clipped to its validity range).
    pub fn saturation_humidity(&self, t_kelvin: f64, k: usize) -> f64 {
        let t_c = (t_kelvin - 273.15).clamp(-40.0, 50.0);
        let e_sat = 610.78 * ((17.27 * t_c) / (t_c + 237.3)).exp();
        EPSILON_VAPOR * e_sat / self.pressure[k]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_profile() -> (Grid, ReferenceProfile) {
        let grid = Grid::new(4, 4, 16, 2.0e6, 2.0e6, 2.0e4);
        let profile = ReferenceProfile::new(&grid, 300.0, 4.0e-3, 8500.0, 0.018, 2500.0);
        (grid, profile)
    }

    #[test]
    fn test_theta0_linear() {
        let (grid, profile) = make_profile();
        assert!((profile.theta0[0] - 300.0).abs() < 1e-12);
        // dz = 1250 m, so level 8 sits at 10 km: θ₀ = 300 + 40 = 340 K.
        let z8 = grid.z_levels[8];
        assert!((profile.theta0[8] - (300.0 + 4.0e-3 * z8)).abs() < 1e-9);
        assert!((profile.dtheta0_dz - 4.0e-3).abs() < 1e-15);
    }

    #[test]
    fn test_pressure_decreases_with_height() {
        let (_, profile) = make_profile();
        for k in 1..profile.pressure.len() {
            assert!(profile.pressure[k] < profile.pressure[k - 1]);
        }
        assert!((profile.pressure[0] - P_REFERENCE).abs() < 1e-6);
    }

    #[test]
    fn test_exner_surface_unity() {
        let (_, profile) = make_profile();
        assert!((profile.exner[0] - 1.0).abs() < 1e-12);
        // T = θ at the surface.
        assert!((profile.temperature(300.0, 0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_saturation_humidity_magnitude() {
        let (_, profile) = make_profile();
        // ~28°C sea surface: q_sat around 24 g/kg at 1000 hPa.
        let q_sat = profile.saturation_humidity(301.15, 0);
        assert!(q_sat > 0.020 && q_sat < 0.028, "q_sat = {q_sat}");
        // Colder air holds less.
        assert!(profile.saturation_humidity(283.15, 0) < q_sat);
    }

    #[test]
    fn test_moisture_reference_decays() {
        let (_, profile) = make_profile();
        assert!((profile.q_ref[0] - 0.018).abs() < 1e-12);
        for k in 1..profile.q_ref.len() {
            assert!(profile.q_ref[k] < profile.q_ref[k - 1]);
        }
    }
}
