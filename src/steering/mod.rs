//! Environmental steering.
//!
//! A storm in a doubly periodic box has no large-scale environment, so the
//! deep-layer flow that would carry a real cyclone is supplied externally
//! through the [`SteeringSource`] trait. The coupler refreshes on a frame
//! cadence; a fetch failure is absorbed by falling back to the cached sample
//! (marked stale) so a stalled provider degrades freshness, never uptime.
//!
//! Field samples are reduced to a single deep-layer-mean vector, optionally
//! averaged over an annulus around the storm center so the vortex's own
//! circulation does not contaminate its steering. When no source is
//! configured and beta-plane rotation is off, a legacy synthetic drift
//! reproduces climatological motion from latitude alone.
//!
//! Injection happens at the end of the frame, after projection: the
//! domain-mean horizontal wind at every level is set to the steering vector.
//! Setting (rather than adding) makes injection idempotent.

use ndarray::{Array2, Axis};

use crate::config::Config;
use crate::error::SteeringError;
use crate::grid::Grid;
use crate::state::State;

/// Ceiling on the legacy synthetic drift speed (m/s).
const LEGACY_DRIFT_CAP: f64 = 4.0;

/// One steering observation.
#[derive(Debug, Clone)]
pub enum SteeringData {
    /// A single deep-layer-mean vector (m/s).
    Uniform { u: f64, v: f64 },
    /// A horizontal wind field with optional per-cell confidence weights.
    Field {
        u: Array2<f64>,
        v: Array2<f64>,
        confidence: Option<Array2<f64>>,
    },
}

/// A timestamped steering sample.
#[derive(Debug, Clone)]
pub struct SteeringSample {
    pub data: SteeringData,
    /// Simulated time the sample is valid for (s).
    pub sim_time: f64,
}

/// Provider of steering data. Implementations typically wrap a reanalysis
/// reader or a parent-model coupler; tests use closures over canned data.
pub trait SteeringSource {
    fn fetch(&mut self, sim_time: f64) -> Result<SteeringSample, SteeringError>;
}

impl<F> SteeringSource for F
where
    F: FnMut(f64) -> Result<SteeringSample, SteeringError>,
{
    fn fetch(&mut self, sim_time: f64) -> Result<SteeringSample, SteeringError> {
        self(sim_time)
    }
}

/// Last good sample plus its freshness.
#[derive(Debug, Clone, Default)]
pub struct SteeringCache {
    sample: Option<SteeringSample>,
    stale: bool,
}

impl SteeringCache {
    pub fn sample(&self) -> Option<&SteeringSample> {
        self.sample.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Cadence-driven steering coupler.
pub struct SteeringCoupler {
    source: Option<Box<dyn SteeringSource>>,
    cache: SteeringCache,
    refresh_frames: usize,
    multiplier: f64,
    annular: bool,
    annular_inner_m: f64,
    annular_outer_m: f64,
    legacy_enabled: bool,
    legacy_speed: f64,
    legacy_lat_scale: f64,
    legacy_angle_low: f64,
    legacy_angle_high: f64,
    legacy_lat_low: f64,
    legacy_lat_high: f64,
    storm_latitude: f64,
}

impl SteeringCoupler {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source: None,
            cache: SteeringCache::default(),
            refresh_frames: config.steering_refresh_frames.max(1),
            multiplier: config.steering_multiplier,
            annular: config.annular_steering,
            annular_inner_m: config.annular_inner_m,
            annular_outer_m: config.annular_outer_m,
            legacy_enabled: config.legacy_drift_enabled,
            legacy_speed: config.legacy_drift_speed,
            legacy_lat_scale: config.legacy_drift_lat_scale,
            legacy_angle_low: config.legacy_drift_angle_low,
            legacy_angle_high: config.legacy_drift_angle_high,
            legacy_lat_low: config.legacy_lat_low,
            legacy_lat_high: config.legacy_lat_high,
            storm_latitude: config.storm_latitude,
        }
    }

    /// Attach a steering source.
    pub fn with_source(mut self, source: Box<dyn SteeringSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn cache(&self) -> &SteeringCache {
        &self.cache
    }

    /// Refresh the cache if the frame lands on the cadence. A failed fetch
    /// keeps the cached sample and marks it stale.
    pub fn maybe_refresh(&mut self, frame: usize, sim_time: f64) {
        if frame % self.refresh_frames != 0 {
            return;
        }
        let Some(source) = self.source.as_mut() else {
            return;
        };
        match source.fetch(sim_time) {
            Ok(sample) => {
                self.cache.sample = Some(sample);
                self.cache.stale = false;
            }
            Err(error) => {
                self.cache.stale = true;
                log::warn!("steering refresh failed, using cached sample: {error}");
            }
        }
    }

    /// The steering vector to inject this frame, if any. `storm_center` is
    /// the estimated storm position in meters, used for annular sampling.
    pub fn steering_vector(
        &self,
        grid: &Grid,
        storm_center: Option<(f64, f64)>,
    ) -> Option<(f64, f64)> {
        if let Some(sample) = self.cache.sample.as_ref() {
            let (u, v) = match &sample.data {
                SteeringData::Uniform { u, v } => (*u, *v),
                SteeringData::Field { u, v, confidence } => {
                    self.reduce_field(grid, u, v, confidence.as_ref(), storm_center)
                }
            };
            return Some((u * self.multiplier, v * self.multiplier));
        }
        if self.legacy_enabled {
            let (u, v) = self.legacy_drift();
            return Some((u * self.multiplier, v * self.multiplier));
        }
        None
    }

    /// Confidence-weighted mean of a steering field, restricted to the
    /// annulus around the storm when enabled.
    fn reduce_field(
        &self,
        grid: &Grid,
        u: &Array2<f64>,
        v: &Array2<f64>,
        confidence: Option<&Array2<f64>>,
        storm_center: Option<(f64, f64)>,
    ) -> (f64, f64) {
        let annulus = match (self.annular, storm_center) {
            (true, Some(center)) => Some(center),
            _ => None,
        };

        let mut sum_u = 0.0;
        let mut sum_v = 0.0;
        let mut weight_total = 0.0;
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                if let Some((cx, cy)) = annulus {
                    let x = i as f64 * grid.dx;
                    let y = j as f64 * grid.dy;
                    let dx = periodic_distance(x - cx, grid.lx);
                    let dy = periodic_distance(y - cy, grid.ly);
                    let r = (dx * dx + dy * dy).sqrt();
                    if r < self.annular_inner_m || r > self.annular_outer_m {
                        continue;
                    }
                }
                let weight = confidence.map_or(1.0, |c| c[[i, j]].max(0.0));
                sum_u += weight * u[[i, j]];
                sum_v += weight * v[[i, j]];
                weight_total += weight;
            }
        }
        if weight_total > 0.0 {
            (sum_u / weight_total, sum_v / weight_total)
        } else {
            // Annulus missed every cell (tiny domain): full-field mean.
            let n = (grid.nx * grid.ny) as f64;
            (u.sum() / n, v.sum() / n)
        }
    }

    /// Climatological drift vector from latitude alone: base speed grows
    /// with latitude above the low band, heading interpolates between the
    /// configured low- and high-latitude angles (degrees CCW from east).
    pub fn legacy_drift(&self) -> (f64, f64) {
        let lat = self.storm_latitude;
        let lat_factor = 1.0 + self.legacy_lat_scale * (lat - self.legacy_lat_low).max(0.0);
        let speed = (self.legacy_speed * lat_factor).min(LEGACY_DRIFT_CAP);
        let blend = ((lat - self.legacy_lat_low) / (self.legacy_lat_high - self.legacy_lat_low))
            .clamp(0.0, 1.0);
        let angle_deg =
            self.legacy_angle_low + (self.legacy_angle_high - self.legacy_angle_low) * blend;
        let angle = angle_deg.to_radians();
        (speed * angle.cos(), speed * angle.sin())
    }

    /// Set the domain-mean horizontal wind at every level to the steering
    /// vector.
    pub fn inject(&self, grid: &Grid, state: &mut State, steering: (f64, f64)) {
        let (target_u, target_v) = steering;
        for k in 0..grid.nz {
            let mut u_level = state.u.index_axis_mut(Axis(2), k);
            let mean_u = u_level.mean().unwrap_or(0.0);
            u_level.mapv_inplace(|u| u - mean_u + target_u);
            let mut v_level = state.v.index_axis_mut(Axis(2), k);
            let mean_v = v_level.mean().unwrap_or(0.0);
            v_level.mapv_inplace(|v| v - mean_v + target_v);
        }
    }
}

/// Signed periodic displacement folded into [−L/2, L/2).
#[inline]
fn periodic_distance(delta: f64, length: f64) -> f64 {
    let wrapped = delta.rem_euclid(length);
    if wrapped >= length / 2.0 {
        wrapped - length
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ReferenceProfile;

    fn make_grid() -> Grid {
        Grid::new(16, 16, 4, 1.6e6, 1.6e6, 2.0e4)
    }

    fn uniform_source(u: f64, v: f64) -> Box<dyn SteeringSource> {
        Box::new(move |sim_time: f64| {
            Ok(SteeringSample {
                data: SteeringData::Uniform { u, v },
                sim_time,
            })
        })
    }

    #[test]
    fn test_refresh_cadence() {
        let mut calls = 0usize;
        {
            let source = Box::new(|sim_time: f64| {
                Ok(SteeringSample {
                    data: SteeringData::Uniform { u: 1.0, v: 0.0 },
                    sim_time,
                })
            });
            let mut coupler = SteeringCoupler::from_config(&Config {
                steering_refresh_frames: 10,
                ..Config::default()
            })
            .with_source(source);
            for frame in 0..30 {
                coupler.maybe_refresh(frame, frame as f64 * 60.0);
                if frame % 10 == 0 {
                    calls += 1;
                }
            }
            assert!(coupler.cache().sample().is_some());
        }
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_fetch_failure_falls_back_to_cache() {
        let mut fail = false;
        let mut attempts = 0usize;
        let source = Box::new(move |sim_time: f64| {
            attempts += 1;
            if attempts > 1 {
                fail = true;
            }
            if fail {
                Err(SteeringError::new(sim_time, "connection refused"))
            } else {
                Ok(SteeringSample {
                    data: SteeringData::Uniform { u: 3.0, v: -1.0 },
                    sim_time,
                })
            }
        });
        let mut coupler = SteeringCoupler::from_config(&Config {
            steering_refresh_frames: 1,
            ..Config::default()
        })
        .with_source(source);
        let grid = make_grid();

        coupler.maybe_refresh(0, 0.0);
        assert!(!coupler.cache().is_stale());
        let first = coupler.steering_vector(&grid, None).unwrap();
        assert_eq!(first, (3.0, -1.0));

        // Second refresh fails: cached vector survives, marked stale.
        coupler.maybe_refresh(1, 60.0);
        assert!(coupler.cache().is_stale());
        let second = coupler.steering_vector(&grid, None).unwrap();
        assert_eq!(second, (3.0, -1.0));
    }

    #[test]
    fn test_no_source_no_legacy_yields_none() {
        let coupler = SteeringCoupler::from_config(&Config::default());
        assert!(coupler.steering_vector(&make_grid(), None).is_none());
    }

    #[test]
    fn test_legacy_drift_points_northwest() {
        let coupler = SteeringCoupler::from_config(&Config {
            legacy_drift_enabled: true,
            storm_latitude: 20.0,
            ..Config::default()
        });
        let (u, v) = coupler.legacy_drift();
        // Angles between 120° and 135° CCW from east: west-of-north motion.
        assert!(u < 0.0, "u = {u}");
        assert!(v > 0.0, "v = {v}");
        let speed = (u * u + v * v).sqrt();
        assert!(speed <= LEGACY_DRIFT_CAP + 1e-12);
        assert!(speed > 2.0);
    }

    #[test]
    fn test_legacy_drift_faster_at_higher_latitude() {
        let at = |lat: f64| {
            let coupler = SteeringCoupler::from_config(&Config {
                legacy_drift_enabled: true,
                storm_latitude: lat,
                ..Config::default()
            });
            let (u, v) = coupler.legacy_drift();
            (u * u + v * v).sqrt()
        };
        assert!(at(25.0) > at(15.0));
        // Cap binds far poleward.
        assert!((at(60.0) - LEGACY_DRIFT_CAP).abs() < 1e-12);
    }

    #[test]
    fn test_annular_sampling_excludes_core() {
        let grid = make_grid();
        // Field: +10 m/s inside the core radius, 2 m/s outside.
        let center = (grid.lx / 2.0, grid.ly / 2.0);
        let mut u = Array2::zeros((grid.nx, grid.ny));
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                let dx = i as f64 * grid.dx - center.0;
                let dy = j as f64 * grid.dy - center.1;
                let r = (dx * dx + dy * dy).sqrt();
                u[[i, j]] = if r < 2.0e5 { 10.0 } else { 2.0 };
            }
        }
        let v = Array2::zeros((grid.nx, grid.ny));
        let sample = SteeringSample {
            data: SteeringData::Field {
                u,
                v,
                confidence: None,
            },
            sim_time: 0.0,
        };
        let mut coupler = SteeringCoupler::from_config(&Config {
            annular_steering: true,
            annular_inner_m: 2.0e5,
            annular_outer_m: 6.0e5,
            steering_refresh_frames: 1,
            ..Config::default()
        })
        .with_source(Box::new(move |_| Ok(sample.clone())));
        coupler.maybe_refresh(0, 0.0);
        let (su, _) = coupler.steering_vector(&grid, Some(center)).unwrap();
        // Core excluded: the annulus sees only the 2 m/s environment.
        assert!((su - 2.0).abs() < 1e-9, "steering u = {su}");
    }

    #[test]
    fn test_injection_sets_level_means() {
        let grid = make_grid();
        let profile = ReferenceProfile::new(&grid, 300.0, 4e-3, 8500.0, 0.018, 2500.0);
        let mut state = State::new(&grid, &profile.q_ref);
        // A vortex-like perturbation with nonzero mean.
        for ((i, j, _), value) in state.u.indexed_iter_mut() {
            *value = 1.0 + ((i + j) as f64 * 0.37).sin() * 5.0;
        }
        let coupler = SteeringCoupler::from_config(&Config::default());
        let before_anomaly = state.u[[3, 7, 1]] - state.u.index_axis(Axis(2), 1).mean().unwrap();
        coupler.inject(&grid, &mut state, (-2.0, 1.5));
        for k in 0..grid.nz {
            let mean_u = state.u.index_axis(Axis(2), k).mean().unwrap();
            let mean_v = state.v.index_axis(Axis(2), k).mean().unwrap();
            assert!((mean_u + 2.0).abs() < 1e-12, "level {k} mean u {mean_u}");
            assert!((mean_v - 1.5).abs() < 1e-12);
        }
        // The vortex anomaly rides on top, unchanged.
        let after_anomaly = state.u[[3, 7, 1]] - state.u.index_axis(Axis(2), 1).mean().unwrap();
        assert!((after_anomaly - before_anomaly).abs() < 1e-12);
        // Idempotent.
        let snapshot = state.u.clone();
        coupler.inject(&grid, &mut state, (-2.0, 1.5));
        let max_change = state
            .u
            .iter()
            .zip(snapshot.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        assert!(max_change < 1e-12);
    }
}
