//! Error taxonomy for the simulation core.
//!
//! Three failure classes with distinct propagation policies:
//! - [`ConfigError`]: contradictory or out-of-range parameters, detected at
//!   construction, fatal before any frame runs.
//! - [`ModelError`]: domain-wide numerical instability or a broken core
//!   invariant mid-run, fatal; the driver aborts but retains the last valid
//!   diagnostics record.
//! - [`SteeringError`]: external steering fetch failure, recovered locally
//!   via the cached sample, non-fatal.
//!
//! Single-cell anomalies are absorbed by the governor stack and never abort
//! a run; only non-finite values or a failed projection are fatal.

use thiserror::Error;

/// Invalid configuration, detected by [`Config::validate`](crate::Config::validate).
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A parameter that must be strictly positive is not.
    #[error("parameter `{name}` must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    /// A parameter fell outside its admissible interval.
    #[error("parameter `{name}` = {value} outside valid range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Two parameters that must be ordered are not (e.g. soft >= hard limit).
    #[error("`{lower}` ({lower_value}) must be strictly below `{upper}` ({upper_value})")]
    InvertedLimits {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    /// A grid dimension is too small for the discretization.
    #[error("grid dimension `{name}` = {value} is below the minimum of {min}")]
    GridTooSmall {
        name: &'static str,
        value: usize,
        min: usize,
    },
}

/// Fatal mid-run failure. The driver stops integrating and keeps every
/// diagnostics record produced up to the failing frame.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Configuration rejected before the first frame.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A field no longer contains only finite values.
    #[error("non-finite values detected in field `{field}` at frame {frame}")]
    NonFinite { frame: usize, field: &'static str },

    /// Post-projection divergence exceeded tolerance: the incompressibility
    /// invariant is broken and continuing would be meaningless.
    #[error("pressure projection failed: residual divergence {residual:.3e} exceeds {tolerance:.3e}")]
    ProjectionFailed { residual: f64, tolerance: f64 },

    /// A field's shape does not match the grid it is used with.
    #[error("field shape {actual:?} does not match grid dimensions {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
}

/// Non-fatal failure of an external steering refresh. The coupler falls back
/// to its cached sample and marks it stale.
#[derive(Debug, Clone, Error)]
#[error("steering data unavailable at t = {sim_time:.0} s: {reason}")]
pub struct SteeringError {
    /// Simulated time of the failed refresh (s).
    pub sim_time: f64,
    /// Human-readable cause, e.g. a transport error from the provider.
    pub reason: String,
}

impl SteeringError {
    pub fn new(sim_time: f64, reason: impl Into<String>) -> Self {
        Self {
            sim_time,
            reason: reason.into(),
        }
    }
}
