//! Convective adjustment.
//!
//! The default scheme is a Betts-Miller relaxed adjustment: where a cell is
//! cloudy (q above a configured fraction of q_sat), moisture relaxes toward
//! the sub-saturated reference q_ref = RH_ref·q_sat with rate
//! min(Δt/τ_BM, 1), weighted by a vertical taper that is zero at the surface
//! and one above the configured full height. The boundary layer is sensed by
//! the trigger but never drained directly; moisture must be lifted before it
//! can rain out.
//!
//! Condensed moisture releases latent heat into θ′ through the Exner
//! conversion, scaled by the precipitation efficiency η. The remainder of
//! the latent energy is treated as exported by rain evaporation and outflow.
//!
//! The legacy instantaneous scheme removes all supersaturation in a single
//! step with the same latent-heat pathway. It is kept selectable for
//! comparison runs; it produces gridpoint storms at long timesteps.

use crate::config::{Config, ConvectionScheme};
use crate::grid::reference::{CP_DRY, LATENT_HEAT_VAPORIZATION};
use crate::grid::{Grid, ReferenceProfile};
use crate::state::State;

/// Per-step convection statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvectionReport {
    /// Fraction of cells adjusted this step.
    pub active_fraction: f64,
    /// Domain-total moisture removed (kg/kg summed over cells).
    pub moisture_removed: f64,
    /// Largest single-cell heating applied (K).
    pub max_heating: f64,
}

/// Convective adjustment operator.
#[derive(Debug, Clone)]
pub struct Convection {
    scheme: ConvectionScheme,
    tau_bm: f64,
    reference_rh: f64,
    cloud_threshold: f64,
    taper_start_m: f64,
    taper_full_m: f64,
    taper_power: f64,
    precip_efficiency: f64,
}

impl Convection {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scheme: config.convection_scheme,
            tau_bm: config.tau_bm,
            reference_rh: config.bm_reference_rh,
            cloud_threshold: config.bm_cloud_threshold,
            taper_start_m: config.bm_taper_start_m,
            taper_full_m: config.bm_taper_full_m,
            taper_power: config.bm_taper_power,
            precip_efficiency: config.precip_efficiency,
        }
    }

    /// Vertical taper weight at height `z`: zero at and below the start
    /// height, one at and above the full height.
    #[inline]
    pub fn taper(&self, z: f64) -> f64 {
        let ramp = ((z - self.taper_start_m) / (self.taper_full_m - self.taper_start_m))
            .clamp(0.0, 1.0);
        ramp.powf(self.taper_power)
    }

    /// Apply one adjustment step.
    pub fn step(
        &self,
        grid: &Grid,
        profile: &ReferenceProfile,
        state: &mut State,
        dt: f64,
    ) -> ConvectionReport {
        match self.scheme {
            ConvectionScheme::BettsMiller => self.step_betts_miller(grid, profile, state, dt),
            ConvectionScheme::Instantaneous => self.step_instantaneous(grid, profile, state),
        }
    }

    fn step_betts_miller(
        &self,
        grid: &Grid,
        profile: &ReferenceProfile,
        state: &mut State,
        dt: f64,
    ) -> ConvectionReport {
        let rate = (dt / self.tau_bm).min(1.0);
        let mut report = ConvectionReport::default();
        let mut column_dq = vec![0.0_f64; grid.nz];

        for i in 0..grid.nx {
            for j in 0..grid.ny {
                let mut column_total = 0.0;
                for (k, dq) in column_dq.iter_mut().enumerate() {
                    *dq = 0.0;
                    let theta = profile.theta0[k] + state.theta_prime[[i, j, k]];
                    let temperature = profile.temperature(theta, k);
                    let q_sat = profile.saturation_humidity(temperature, k);
                    let q = state.q[[i, j, k]];
                    if q <= self.cloud_threshold * q_sat {
                        continue;
                    }
                    let q_target = self.reference_rh * q_sat;
                    if q <= q_target {
                        continue;
                    }
                    *dq = -(q - q_target) * rate * self.taper(grid.z_levels[k]);
                    column_total += *dq;
                }

                // Budget closure: adjustment may only dry a column.
                if column_total > 0.0 {
                    continue;
                }

                for (k, &dq) in column_dq.iter().enumerate() {
                    if dq == 0.0 {
                        continue;
                    }
                    let heating = self.latent_heating(profile, dq, k);
                    state.q[[i, j, k]] += dq;
                    state.theta_prime[[i, j, k]] += heating;
                    report.active_fraction += 1.0;
                    report.moisture_removed -= dq;
                    report.max_heating = report.max_heating.max(heating);
                }
            }
        }

        report.active_fraction /= grid.n_cells() as f64;
        report
    }

    fn step_instantaneous(
        &self,
        grid: &Grid,
        profile: &ReferenceProfile,
        state: &mut State,
    ) -> ConvectionReport {
        let mut report = ConvectionReport::default();
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                for k in 0..grid.nz {
                    let theta = profile.theta0[k] + state.theta_prime[[i, j, k]];
                    let temperature = profile.temperature(theta, k);
                    let q_sat = profile.saturation_humidity(temperature, k);
                    let q = state.q[[i, j, k]];
                    if q <= q_sat {
                        continue;
                    }
                    let dq = -(q - q_sat);
                    let heating = self.latent_heating(profile, dq, k);
                    state.q[[i, j, k]] = q_sat;
                    state.theta_prime[[i, j, k]] += heating;
                    report.active_fraction += 1.0;
                    report.moisture_removed -= dq;
                    report.max_heating = report.max_heating.max(heating);
                }
            }
        }
        report.active_fraction /= grid.n_cells() as f64;
        report
    }

    /// Latent heating (K of θ) for condensate `dq` < 0 at level `k`:
    /// dθ = η·(Lv/cp)·(−dq)/Π.
    #[inline]
    fn latent_heating(&self, profile: &ReferenceProfile, dq: f64, k: usize) -> f64 {
        self.precip_efficiency * (LATENT_HEAT_VAPORIZATION / CP_DRY) * (-dq) / profile.exner[k]
    }
}
