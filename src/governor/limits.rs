//! The individual governors.

use ndarray::{Array1, Axis};

use super::{Governor, GovernorReport};
use crate::grid::Grid;
use crate::state::State;

/// Progressive damping of extreme wind speeds plus a hard vector rescale.
///
/// Between the damping threshold and the hard cap the 3D wind vector is
/// shrunk by a factor growing quadratically with the excess; at and beyond
/// the cap it is rescaled to exactly the cap. Direction is never altered.
pub struct VelocityClamp {
    damping_threshold: f64,
    hard_cap: f64,
}

/// Fractional damping applied at the hard cap by the progressive stage.
const PROGRESSIVE_DAMPING: f64 = 0.1;

impl VelocityClamp {
    pub fn new(damping_threshold: f64, hard_cap: f64) -> Self {
        Self {
            damping_threshold,
            hard_cap,
        }
    }
}

impl Governor for VelocityClamp {
    fn name(&self) -> &'static str {
        "velocity_clamp"
    }

    fn apply(&self, grid: &Grid, state: &mut State) -> GovernorReport {
        let mut modified = 0usize;
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                for k in 0..grid.nz {
                    let u = state.u[[i, j, k]];
                    let v = state.v[[i, j, k]];
                    let w = state.w[[i, j, k]];
                    let speed = (u * u + v * v + w * w).sqrt();
                    if speed <= self.damping_threshold {
                        continue;
                    }
                    modified += 1;
                    let factor = if speed >= self.hard_cap {
                        self.hard_cap / speed
                    } else {
                        let excess = (speed - self.damping_threshold)
                            / (self.hard_cap - self.damping_threshold);
                        1.0 - PROGRESSIVE_DAMPING * excess * excess
                    };
                    state.u[[i, j, k]] = u * factor;
                    state.v[[i, j, k]] = v * factor;
                    state.w[[i, j, k]] = w * factor;
                }
            }
        }
        GovernorReport {
            name: self.name(),
            fraction_modified: modified as f64 / grid.n_cells() as f64,
        }
    }
}

/// Smooth saturation of vertical velocity at ±w_max.
///
/// Identity up to half the cap, then a tanh approach that asymptotes to the
/// cap: s + (w_max − s)·tanh((|w| − s)/(w_max − s)) with s = w_max/2.
/// Continuous with slope 1 at s, so ordinary convective updrafts pass
/// through untouched and the modified-cell count equals the cells the
/// transfer actually changed.
pub struct UpdraftClamp {
    max_updraft: f64,
}

impl UpdraftClamp {
    pub fn new(max_updraft: f64) -> Self {
        Self { max_updraft }
    }

    /// The saturation transfer on a magnitude.
    #[inline]
    pub fn transfer(&self, magnitude: f64) -> f64 {
        let soft = 0.5 * self.max_updraft;
        if magnitude <= soft {
            return magnitude;
        }
        let span = self.max_updraft - soft;
        soft + span * ((magnitude - soft) / span).tanh()
    }
}

impl Governor for UpdraftClamp {
    fn name(&self) -> &'static str {
        "updraft_clamp"
    }

    fn apply(&self, grid: &Grid, state: &mut State) -> GovernorReport {
        let soft = 0.5 * self.max_updraft;
        let mut modified = 0usize;
        state.w.mapv_inplace(|w| {
            if w.abs() <= soft {
                w
            } else {
                modified += 1;
                self.transfer(w.abs()).copysign(w)
            }
        });
        GovernorReport {
            name: self.name(),
            fraction_modified: modified as f64 / grid.n_cells() as f64,
        }
    }
}

/// Hard symmetric clip of θ′, the last line of defense for temperature.
pub struct ThermalClamp {
    max_anomaly: f64,
}

impl ThermalClamp {
    pub fn new(max_anomaly: f64) -> Self {
        Self { max_anomaly }
    }
}

impl Governor for ThermalClamp {
    fn name(&self) -> &'static str {
        "thermal_clamp"
    }

    fn apply(&self, grid: &Grid, state: &mut State) -> GovernorReport {
        let limit = self.max_anomaly;
        let mut modified = 0usize;
        state.theta_prime.mapv_inplace(|theta| {
            if theta.abs() > limit {
                modified += 1;
                limit.copysign(theta)
            } else {
                theta
            }
        });
        GovernorReport {
            name: self.name(),
            fraction_modified: modified as f64 / grid.n_cells() as f64,
        }
    }
}

/// Specific humidity floor. Negative moisture is an advection artifact and
/// feeds nonsense into the saturation computations downstream.
///
/// The configured floor is capped per level by the reference profile: a dry
/// upper level where q_ref(z) sits below the floor keeps q_ref(z) as its
/// floor, so a column resting at reference humidity is never lifted.
pub struct MoistureFloor {
    floor: Array1<f64>,
}

impl MoistureFloor {
    pub fn new(floor: f64, q_ref: &Array1<f64>) -> Self {
        Self {
            floor: q_ref.mapv(|q| q.min(floor)),
        }
    }
}

impl Governor for MoistureFloor {
    fn name(&self) -> &'static str {
        "moisture_floor"
    }

    fn apply(&self, grid: &Grid, state: &mut State) -> GovernorReport {
        let mut modified = 0usize;
        for k in 0..grid.nz {
            let floor = self.floor[k];
            state
                .q
                .index_axis_mut(Axis(2), k)
                .mapv_inplace(|q| {
                    if q < floor {
                        modified += 1;
                        floor
                    } else {
                        q
                    }
                });
        }
        GovernorReport {
            name: self.name(),
            fraction_modified: modified as f64 / grid.n_cells() as f64,
        }
    }
}

/// Proportional θ′ throttle: identity below the soft limit, exponential
/// saturation toward the hard limit above it,
///
/// out = soft + (hard − soft)·(1 − exp(−(|θ′| − soft)/(hard − soft))).
///
/// Continuous with slope 1 at the soft limit, asymptotic to (never reaching)
/// the hard limit. Unlike [`ThermalClamp`] this preserves the ordering of
/// extreme values instead of flattening them to a plateau.
pub struct ProportionalThrottle {
    soft_limit: f64,
    hard_limit: f64,
}

impl ProportionalThrottle {
    pub fn new(soft_limit: f64, hard_limit: f64) -> Self {
        Self {
            soft_limit,
            hard_limit,
        }
    }

    /// The throttle transfer function on a magnitude.
    #[inline]
    pub fn transfer(&self, magnitude: f64) -> f64 {
        if magnitude <= self.soft_limit {
            return magnitude;
        }
        let span = self.hard_limit - self.soft_limit;
        self.soft_limit + span * (1.0 - (-(magnitude - self.soft_limit) / span).exp())
    }
}

impl Governor for ProportionalThrottle {
    fn name(&self) -> &'static str {
        "theta_throttle"
    }

    fn apply(&self, grid: &Grid, state: &mut State) -> GovernorReport {
        let mut modified = 0usize;
        state.theta_prime.mapv_inplace(|theta| {
            let magnitude = theta.abs();
            if magnitude <= self.soft_limit {
                theta
            } else {
                modified += 1;
                self.transfer(magnitude).copysign(theta)
            }
        });
        GovernorReport {
            name: self.name(),
            fraction_modified: modified as f64 / grid.n_cells() as f64,
        }
    }
}
