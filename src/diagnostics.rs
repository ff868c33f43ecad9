//! Per-frame diagnostics and run summaries.
//!
//! One [`DiagnosticsRecord`] is appended per completed frame; the vector is
//! append-only and survives an unstable abort, so the record trail always
//! ends at the last frame that was still finite.

use crate::error::ModelError;
use crate::physics::{ConvectionReport, FluxReport, ThermoReport};
use crate::solver::TurbulenceReport;

/// Snapshot of one completed frame.
#[derive(Debug, Clone)]
pub struct DiagnosticsRecord {
    pub frame: usize,
    /// Simulated time at the end of the frame (s).
    pub sim_time: f64,
    /// Maximum 3D wind speed (m/s).
    pub max_wind: f64,
    /// θ′ extremes (K).
    pub theta_min: f64,
    pub theta_max: f64,
    /// (governor name, fraction of cells modified), in application order.
    pub governor_fractions: Vec<(&'static str, f64)>,
    pub turbulence: TurbulenceReport,
    pub thermo: ThermoReport,
    pub convection: ConvectionReport,
    pub fluxes: FluxReport,
    /// Steering vector injected this frame, if any (m/s).
    pub steering: Option<(f64, f64)>,
    /// Whether the steering sample in use was stale.
    pub steering_stale: bool,
    /// Estimated storm center (m), periodic-aware vorticity centroid.
    pub storm_center: Option<(f64, f64)>,
}

/// Why a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The configured frame budget was exhausted.
    Completed,
    /// The state went non-finite or broke a core invariant at `frame`.
    Unstable { frame: usize, error: ModelError },
}

/// Result of [`Driver::run`](crate::simulation::Driver::run).
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Frames fully completed (equals the number of diagnostics records).
    pub frames_completed: usize,
    /// Largest wind speed seen over the run (m/s).
    pub peak_wind: f64,
}

impl RunSummary {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed)
    }
}
