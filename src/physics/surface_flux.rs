//! Bulk aerodynamic surface exchange.
//!
//! Fluxes act on the lowest model level, distributed over the flux depth
//! h_f. With |V| the local surface wind speed:
//!
//! - momentum: d(u,v) = −C_d·|V|·(u,v)·Δt/h_f
//! - sensible heat: dθ′ = C_k·|V|·(T_sea − T_air)·Δt/(Π·h_f)
//! - moisture: dq = C_k·|V|·(q_sat(SST) − q)·Δt/h_f
//!
//! WISHE (wind-induced surface heat exchange) multiplies the thermal
//! coefficients by a boost that ramps linearly from 1 at V_lo to B_max at
//! V_hi. The wind-flux-wind loop this closes is the intensification engine
//! of the model.
//!
//! Two safety layers moderate it. An optional land-fraction map blends drag
//! up and thermal exchange down where the storm is over land. A proportional
//! throttle rescales all thermal fluxes when the frame's peak surface
//! heating rate exceeds a configured K/min threshold, continuously at the
//! threshold, bounded below by a floor.

use ndarray::Array2;

use crate::config::Config;
use crate::grid::{Grid, ReferenceProfile};
use crate::state::State;

/// Per-step surface flux statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct FluxReport {
    /// Mean θ′ change at the surface level this step (K).
    pub mean_heating: f64,
    /// Mean q change at the surface level this step (kg/kg).
    pub mean_moistening: f64,
    /// Largest WISHE boost applied.
    pub boost_max: f64,
    /// Column-mean WISHE boost.
    pub boost_mean: f64,
    /// Throttle factor applied to thermal fluxes (1 = unthrottled).
    pub throttle_factor: f64,
}

/// Surface flux operator. Construct from [`Config`], optionally attach a
/// land-fraction map.
#[derive(Debug, Clone)]
pub struct SurfaceFluxes {
    drag_coefficient: f64,
    drag_coefficient_land: f64,
    exchange_coefficient: f64,
    sea_surface_temp_k: f64,
    flux_depth_m: f64,
    wishe_enabled: bool,
    wishe_boost_max: f64,
    wishe_wind_min: f64,
    wishe_wind_max: f64,
    throttle_enabled: bool,
    throttle_threshold_k_per_min: f64,
    throttle_floor: f64,
    /// Land fraction per (i, j) column, 0 = open ocean, 1 = land.
    land_fraction: Option<Array2<f64>>,
}

impl SurfaceFluxes {
    pub fn from_config(config: &Config) -> Self {
        Self {
            drag_coefficient: config.drag_coefficient,
            drag_coefficient_land: config.drag_coefficient_land,
            exchange_coefficient: config.exchange_coefficient,
            sea_surface_temp_k: config.sea_surface_temp_c + 273.15,
            flux_depth_m: config.flux_depth_m,
            wishe_enabled: config.wishe_enabled,
            wishe_boost_max: config.wishe_boost_max,
            wishe_wind_min: config.wishe_wind_min,
            wishe_wind_max: config.wishe_wind_max,
            throttle_enabled: config.flux_throttle_enabled,
            throttle_threshold_k_per_min: config.flux_throttle_threshold,
            throttle_floor: config.flux_throttle_floor,
            land_fraction: None,
        }
    }

    /// Attach a land-fraction map (0 = ocean, 1 = land, per column).
    pub fn with_land_fraction(mut self, land: Array2<f64>) -> Self {
        self.land_fraction = Some(land);
        self
    }

    /// WISHE amplification at surface wind speed `speed`: exactly 1 at and
    /// below V_lo, exactly B_max at and above V_hi, linear between.
    #[inline]
    pub fn wishe_boost(&self, speed: f64) -> f64 {
        if !self.wishe_enabled {
            return 1.0;
        }
        let ramp = ((speed - self.wishe_wind_min) / (self.wishe_wind_max - self.wishe_wind_min))
            .clamp(0.0, 1.0);
        1.0 + (self.wishe_boost_max - 1.0) * ramp
    }

    #[inline]
    fn land_at(&self, i: usize, j: usize) -> f64 {
        self.land_fraction
            .as_ref()
            .map_or(0.0, |land| land[[i, j]].clamp(0.0, 1.0))
    }

    /// Apply one flux step to the surface level.
    pub fn step(
        &self,
        grid: &Grid,
        profile: &ReferenceProfile,
        state: &mut State,
        dt: f64,
    ) -> FluxReport {
        let k = 0;
        let exner = profile.exner[k];
        let q_sat_sea = profile.saturation_humidity(self.sea_surface_temp_k, k);
        let per_depth = dt / self.flux_depth_m;

        let mut heating = Array2::zeros((grid.nx, grid.ny));
        let mut moistening = Array2::zeros((grid.nx, grid.ny));
        let mut boost_max = 0.0_f64;
        let mut boost_sum = 0.0_f64;

        // First pass: thermal fluxes are staged so the throttle can scale
        // them uniformly before anything is committed.
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                let u = state.u[[i, j, k]];
                let v = state.v[[i, j, k]];
                let speed = (u * u + v * v).sqrt();
                let land = self.land_at(i, j);

                let drag = self.drag_coefficient * (1.0 - land)
                    + self.drag_coefficient_land * land;
                let drag_factor = drag * speed * per_depth;
                state.u[[i, j, k]] -= drag_factor * u;
                state.v[[i, j, k]] -= drag_factor * v;

                let boost = self.wishe_boost(speed);
                boost_max = boost_max.max(boost);
                boost_sum += boost;
                let exchange = self.exchange_coefficient * boost * (1.0 - land);

                let theta_air = profile.theta0[k] + state.theta_prime[[i, j, k]];
                let t_air = profile.temperature(theta_air, k);
                heating[[i, j]] =
                    exchange * speed * (self.sea_surface_temp_k - t_air) * per_depth / exner;
                moistening[[i, j]] =
                    exchange * speed * (q_sat_sea - state.q[[i, j, k]]) * per_depth;
            }
        }

        let throttle_factor = if self.throttle_enabled {
            let peak_rate_k_per_min = heating
                .iter()
                .fold(0.0_f64, |m, &h| m.max(h.abs()))
                * 60.0
                / dt;
            if peak_rate_k_per_min > self.throttle_threshold_k_per_min {
                let factor = self.throttle_threshold_k_per_min / peak_rate_k_per_min;
                let factor = factor.max(self.throttle_floor);
                log::warn!(
                    "surface flux throttle engaged: peak heating {:.2} K/min, factor {:.3}",
                    peak_rate_k_per_min,
                    factor
                );
                factor
            } else {
                1.0
            }
        } else {
            1.0
        };

        let mut mean_heating = 0.0;
        let mut mean_moistening = 0.0;
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                let dtheta = heating[[i, j]] * throttle_factor;
                let dq = moistening[[i, j]] * throttle_factor;
                state.theta_prime[[i, j, k]] += dtheta;
                state.q[[i, j, k]] += dq;
                mean_heating += dtheta;
                mean_moistening += dq;
            }
        }
        let n_columns = (grid.nx * grid.ny) as f64;

        FluxReport {
            mean_heating: mean_heating / n_columns,
            mean_moistening: mean_moistening / n_columns,
            boost_max,
            boost_mean: boost_sum / n_columns,
            throttle_factor,
        }
    }
}
