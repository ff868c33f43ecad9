//! Numerical stability governors.
//!
//! A hurricane simulation pushed hard will occasionally produce a single
//! absurd cell long before the domain as a whole goes unstable. The
//! governors absorb those excursions locally so the run can continue; the
//! driver's non-finite scan remains the only fatal check.
//!
//! Every governor implements the same [`Governor`] trait and reports the
//! fraction of cells it modified. The stack applies enabled governors in a
//! fixed order: velocity clamp, updraft clamp, temperature clamp, moisture
//! floor, proportional θ′ throttle. A governor that touches more than the
//! configured saturation fraction logs a warning; a model that lives on its
//! governors is producing governor output, not atmosphere.

mod limits;

pub use limits::{
    MoistureFloor, ProportionalThrottle, ThermalClamp, UpdraftClamp, VelocityClamp,
};

use crate::config::Config;
use crate::grid::{Grid, ReferenceProfile};
use crate::state::State;

/// Outcome of one governor application.
#[derive(Debug, Clone, Copy)]
pub struct GovernorReport {
    pub name: &'static str,
    /// Fraction of grid cells meaningfully modified.
    pub fraction_modified: f64,
}

/// A single stability limiter.
pub trait Governor {
    fn name(&self) -> &'static str;
    fn apply(&self, grid: &Grid, state: &mut State) -> GovernorReport;
}

/// Ordered collection of the enabled governors.
pub struct GovernorStack {
    governors: Vec<Box<dyn Governor>>,
    saturation_warn: f64,
}

impl GovernorStack {
    /// Build the stack from configuration, fixed order, enabled entries
    /// only. The reference profile caps the moisture floor per level.
    pub fn from_config(config: &Config, profile: &ReferenceProfile) -> Self {
        let mut governors: Vec<Box<dyn Governor>> = Vec::new();
        if config.velocity_governor_enabled {
            governors.push(Box::new(VelocityClamp::new(
                config.wind_damping_threshold,
                config.wind_hard_cap,
            )));
        }
        if config.updraft_governor_enabled {
            governors.push(Box::new(UpdraftClamp::new(config.max_updraft)));
        }
        if config.thermal_governor_enabled {
            governors.push(Box::new(ThermalClamp::new(config.max_temp_anomaly)));
        }
        if config.moisture_floor_enabled {
            governors.push(Box::new(MoistureFloor::new(
                config.moisture_floor,
                &profile.q_ref,
            )));
        }
        if config.proportional_throttle_enabled {
            governors.push(Box::new(ProportionalThrottle::new(
                config.theta_soft_limit,
                config.theta_hard_limit,
            )));
        }
        Self {
            governors,
            saturation_warn: config.governor_saturation_warn,
        }
    }

    /// Apply every governor in order, collecting reports.
    pub fn apply_all(&self, grid: &Grid, state: &mut State) -> Vec<GovernorReport> {
        let mut reports = Vec::with_capacity(self.governors.len());
        for governor in &self.governors {
            let report = governor.apply(grid, state);
            if report.fraction_modified > self.saturation_warn {
                log::warn!(
                    "governor `{}` saturated: {:.1}% of cells modified",
                    report.name,
                    report.fraction_modified * 100.0
                );
            }
            reports.push(report);
        }
        reports
    }

    pub fn len(&self) -> usize {
        self.governors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.governors.is_empty()
    }
}
