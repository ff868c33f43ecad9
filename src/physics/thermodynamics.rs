//! Potential-temperature thermodynamics.
//!
//! Per-frame θ′ and w tendencies:
//!
//! - stratification: ∂θ′/∂t = −w·dθ₀/dz, optionally reduced toward a moist
//!   floor in near-saturated air;
//! - buoyancy: ∂w/∂t = g·θ′/θ₀, tanh-saturated at a configured cap;
//! - radiative relaxation: ∂θ′/∂t = −θ′/τ, with τ optionally shrinking
//!   toward τ_min in strong winds (a crude stand-in for enhanced eyewall
//!   outflow cooling);
//! - bounding: a C¹ soft clamp that is exact identity below the soft limit,
//!   followed by a hard clip.
//!
//! Every saturation pathway is instrumented: the step reports the fraction
//! of cells each clamp touched, so a simulation that lives on its limiters
//! is visible in the diagnostics instead of silently flattened.

use ndarray::Zip;

use crate::config::Config;
use crate::grid::reference::GRAVITY;
use crate::grid::{Grid, ReferenceProfile};
use crate::state::State;

/// Relative humidity at which the moist stratification blend begins.
const RH_BLEND_START: f64 = 0.8;

/// Per-step clamp statistics, as fractions of grid cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermoReport {
    /// Cells whose buoyancy acceleration exceeded the soft cap.
    pub buoyancy_capped: f64,
    /// Cells with |θ′| beyond the soft bound before bounding.
    pub soft_bounded: f64,
    /// Cells with |θ′| beyond the hard bound before bounding.
    pub hard_bounded: f64,
}

/// Thermodynamic step operator, parameters frozen from [`Config`].
#[derive(Debug, Clone)]
pub struct Thermodynamics {
    moist_stratification: bool,
    moist_floor: f64,
    updraft_only_moist: bool,
    buoyancy_cap: f64,
    radiative_cooling: bool,
    tau_rad: f64,
    dynamic_cooling: bool,
    tau_rad_min: f64,
    cooling_wind_scale: f64,
    theta_soft_bound: f64,
    theta_hard_bound: f64,
}

impl Thermodynamics {
    pub fn from_config(config: &Config) -> Self {
        Self {
            moist_stratification: config.moist_stratification,
            moist_floor: config.moist_floor,
            updraft_only_moist: config.updraft_only_moist,
            buoyancy_cap: config.buoyancy_cap,
            radiative_cooling: config.radiative_cooling,
            tau_rad: config.tau_rad,
            dynamic_cooling: config.dynamic_cooling,
            tau_rad_min: config.tau_rad_min,
            cooling_wind_scale: config.cooling_wind_scale,
            theta_soft_bound: config.theta_soft_bound,
            theta_hard_bound: config.theta_hard_bound,
        }
    }

    /// Apply all thermodynamic tendencies for one frame.
    pub fn step(
        &self,
        grid: &Grid,
        profile: &ReferenceProfile,
        state: &mut State,
        dt: f64,
    ) -> ThermoReport {
        self.apply_stratification(grid, profile, state, dt);
        let buoyancy_capped = self.apply_buoyancy(grid, profile, state, dt);
        if self.radiative_cooling {
            self.apply_radiation(state, dt);
        }
        let (soft_bounded, hard_bounded) = self.apply_bounds(state);
        ThermoReport {
            buoyancy_capped,
            soft_bounded,
            hard_bounded,
        }
    }

    /// Stratification factor for one cell: 1 in dry air, blending down to
    /// `moist_floor` as relative humidity rises past [`RH_BLEND_START`]. A
    /// saturated eyewall column becomes nearly moist-neutral, which is what
    /// permits deep convection in the first place.
    fn stratification_factor(
        &self,
        profile: &ReferenceProfile,
        theta_total: f64,
        q: f64,
        w: f64,
        k: usize,
    ) -> f64 {
        if !self.moist_stratification {
            return 1.0;
        }
        if self.updraft_only_moist && w <= 0.0 {
            return 1.0;
        }
        let temperature = profile.temperature(theta_total, k);
        let q_sat = profile.saturation_humidity(temperature, k);
        if q_sat <= 0.0 {
            return 1.0;
        }
        let rh = q / q_sat;
        let blend = ((rh - RH_BLEND_START) / (1.0 - RH_BLEND_START)).clamp(0.0, 1.0);
        1.0 - (1.0 - self.moist_floor) * blend
    }

    fn apply_stratification(
        &self,
        grid: &Grid,
        profile: &ReferenceProfile,
        state: &mut State,
        dt: f64,
    ) {
        let gamma = profile.dtheta0_dz;
        for k in 0..grid.nz {
            let theta0 = profile.theta0[k];
            for i in 0..grid.nx {
                for j in 0..grid.ny {
                    let w = state.w[[i, j, k]];
                    let factor = self.stratification_factor(
                        profile,
                        theta0 + state.theta_prime[[i, j, k]],
                        state.q[[i, j, k]],
                        w,
                        k,
                    );
                    state.theta_prime[[i, j, k]] -= w * gamma * factor * dt;
                }
            }
        }
    }

    fn apply_buoyancy(
        &self,
        grid: &Grid,
        profile: &ReferenceProfile,
        state: &mut State,
        dt: f64,
    ) -> f64 {
        let cap = self.buoyancy_cap;
        let mut capped = 0usize;
        for k in 0..grid.nz {
            let theta0 = profile.theta0[k];
            for i in 0..grid.nx {
                for j in 0..grid.ny {
                    let raw = GRAVITY * state.theta_prime[[i, j, k]] / theta0;
                    if raw.abs() > cap {
                        capped += 1;
                    }
                    state.w[[i, j, k]] += cap * (raw / cap).tanh() * dt;
                }
            }
        }
        capped as f64 / grid.n_cells() as f64
    }

    fn apply_radiation(&self, state: &mut State, dt: f64) {
        if self.dynamic_cooling {
            let tau_span = self.tau_rad - self.tau_rad_min;
            Zip::from(&mut state.theta_prime)
                .and(&state.u)
                .and(&state.v)
                .for_each(|theta, &u, &v| {
                    let speed = (u * u + v * v).sqrt();
                    let tau =
                        self.tau_rad_min + tau_span * (-speed / self.cooling_wind_scale).exp();
                    *theta -= *theta * dt / tau;
                });
        } else {
            let decay = dt / self.tau_rad;
            state.theta_prime.mapv_inplace(|theta| theta * (1.0 - decay));
        }
    }

    /// Soft clamp, identity up to the soft bound, then a tanh approach to
    /// the hard bound, then a hard clip. C¹ at the soft bound.
    fn apply_bounds(&self, state: &mut State) -> (f64, f64) {
        let soft = self.theta_soft_bound;
        let hard = self.theta_hard_bound;
        let span = hard - soft;
        let mut soft_count = 0usize;
        let mut hard_count = 0usize;
        state.theta_prime.mapv_inplace(|theta| {
            let magnitude = theta.abs();
            if magnitude <= soft {
                return theta;
            }
            soft_count += 1;
            if magnitude > hard {
                hard_count += 1;
            }
            let bounded = soft + span * ((magnitude - soft) / span).tanh();
            bounded.min(hard).copysign(theta)
        });
        let n = state.theta_prime.len() as f64;
        (soft_count as f64 / n, hard_count as f64 / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Grid, ReferenceProfile, State, Config) {
        let grid = Grid::new(8, 8, 8, 1.0e6, 1.0e6, 1.6e4);
        let profile = ReferenceProfile::new(&grid, 300.0, 4.0e-3, 8500.0, 0.018, 2500.0);
        let state = State::new(&grid, &profile.q_ref);
        (grid, profile, state, Config::default())
    }

    #[test]
    fn test_dry_updraft_cools() {
        let (grid, profile, mut state, config) = setup();
        let thermo = Thermodynamics::from_config(&Config {
            moist_stratification: false,
            ..config
        });
        state.w.fill(2.0);
        state.q.fill(0.0);
        thermo.step(&grid, &profile, &mut state, 60.0);
        // -w·Γ·dt = -2·4e-3·60 = -0.48 K plus a small radiative term.
        let theta = state.theta_prime[[4, 4, 4]];
        assert!((theta + 0.48).abs() < 0.01, "θ′ = {theta}");
    }

    #[test]
    fn test_saturated_updraft_cools_less() {
        let (grid, profile, mut state, config) = setup();
        let thermo = Thermodynamics::from_config(&config);
        state.w.fill(2.0);
        // Saturate the surface level.
        let q_sat = profile.saturation_humidity(300.0, 0);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                state.q[[i, j, 0]] = q_sat;
            }
        }
        let mut dry = state.clone();
        dry.q.fill(0.0);
        thermo.step(&grid, &profile, &mut state, 60.0);
        let dry_thermo = Thermodynamics::from_config(&config);
        dry_thermo.step(&grid, &profile, &mut dry, 60.0);
        // Moist column loses less θ′ to stratification.
        assert!(state.theta_prime[[4, 4, 0]] > dry.theta_prime[[4, 4, 0]]);
    }

    #[test]
    fn test_buoyancy_accelerates_warm_air() {
        let (grid, profile, mut state, config) = setup();
        let thermo = Thermodynamics::from_config(&config);
        state.theta_prime.fill(3.0);
        let report = thermo.step(&grid, &profile, &mut state, 60.0);
        // b ≈ 9.81·3/300 ≈ 0.098 m/s², under the 0.5 cap.
        assert!(state.w[[4, 4, 2]] > 0.0);
        assert!((report.buoyancy_capped - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_buoyancy_cap_engages() {
        let (grid, profile, mut state, config) = setup();
        let thermo = Thermodynamics::from_config(&Config {
            radiative_cooling: false,
            theta_soft_bound: 100.0,
            theta_hard_bound: 150.0,
            ..config
        });
        // θ′ = 40 K at θ₀ ≈ 300 K: raw b ≈ 1.3 m/s², beyond the cap.
        state.theta_prime.fill(40.0);
        let dt = 60.0;
        let report = thermo.step(&grid, &profile, &mut state, dt);
        assert!(report.buoyancy_capped > 0.9);
        // Acceleration saturates below cap·dt.
        let w_max = state.w.iter().fold(0.0_f64, |m, &x| m.max(x));
        assert!(w_max < 0.5 * dt);
    }

    #[test]
    fn test_radiative_decay_rate() {
        let (grid, profile, mut state, config) = setup();
        let thermo = Thermodynamics::from_config(&Config {
            moist_stratification: false,
            dynamic_cooling: false,
            ..config
        });
        state.theta_prime.fill(10.0);
        let dt = 60.0;
        thermo.step(&grid, &profile, &mut state, dt);
        let expected = 10.0 * (1.0 - dt / 86_400.0);
        let theta = state.theta_prime[[2, 2, 2]];
        assert!((theta - expected).abs() < 1e-9, "θ′ = {theta}");
    }

    #[test]
    fn test_dynamic_cooling_faster_in_strong_wind() {
        let (grid, profile, mut state, config) = setup();
        let thermo = Thermodynamics::from_config(&Config {
            dynamic_cooling: true,
            ..config
        });
        state.theta_prime.fill(10.0);
        let mut calm = state.clone();
        state.u.fill(60.0);
        thermo.step(&grid, &profile, &mut state, 60.0);
        let calm_thermo = Thermodynamics::from_config(&Config {
            dynamic_cooling: true,
            ..Config::default()
        });
        calm_thermo.step(&grid, &profile, &mut calm, 60.0);
        assert!(state.theta_prime[[4, 4, 4]] < calm.theta_prime[[4, 4, 4]]);
    }

    #[test]
    fn test_bounds_identity_below_soft() {
        let (grid, profile, mut state, config) = setup();
        let thermo = Thermodynamics::from_config(&Config {
            radiative_cooling: false,
            ..config
        });
        state.theta_prime.fill(12.0);
        let report = thermo.step(&grid, &profile, &mut state, 60.0);
        assert_eq!(report.soft_bounded, 0.0);
        // Bounding exactly identity: only buoyancy/stratification acted.
        assert!(state.theta_prime[[1, 1, 1]] <= 12.0 + 1e-9);
    }

    #[test]
    fn test_bounds_cap_extreme_anomaly() {
        let (grid, profile, mut state, config) = setup();
        let thermo = Thermodynamics::from_config(&Config {
            radiative_cooling: false,
            theta_soft_bound: 30.0,
            theta_hard_bound: 50.0,
            ..config
        });
        state.theta_prime.fill(-200.0);
        let report = thermo.step(&grid, &profile, &mut state, 60.0);
        assert!(report.soft_bounded > 0.99);
        assert!(report.hard_bounded > 0.99);
        for &theta in state.theta_prime.iter() {
            assert!(theta >= -50.0 - 1e-9, "θ′ = {theta} below hard bound");
            assert!(theta < 0.0);
        }
    }
}
