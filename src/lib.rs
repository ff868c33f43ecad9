//! # cyclone-rs
//!
//! A pseudo-spectral tropical-cyclone lifecycle simulator.
//!
//! The model integrates incompressible 3D flow on a horizontally periodic
//! domain, coupled to potential-temperature thermodynamics and a moisture
//! cycle:
//! - spectral transforms and derivatives (FFT, two-thirds dealiasing)
//! - semi-Lagrangian advection with a clamped vertical boundary
//! - spectral pressure projection enforcing incompressibility
//! - implicit, energy-conserving Coriolis rotation (f-plane or beta-plane)
//! - Smagorinsky subgrid turbulence
//! - Betts-Miller convective adjustment and bulk surface fluxes with WISHE
//! - sponge boundaries, a stability-governor stack, and environmental
//!   steering through a pluggable source trait
//!
//! The [`simulation::Driver`] owns the prognostic [`State`] and advances it
//! frame by frame in a fixed pipeline order, accumulating per-frame
//! [`diagnostics::DiagnosticsRecord`]s.

pub mod boundary;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod governor;
pub mod grid;
pub mod physics;
pub mod simulation;
pub mod solver;
pub mod spectral;
pub mod state;
pub mod steering;

pub use boundary::Sponge;
pub use config::{Backend, Config, ConvectionScheme};
pub use diagnostics::{DiagnosticsRecord, RunOutcome, RunSummary};
pub use error::{ConfigError, ModelError, SteeringError};
pub use governor::{Governor, GovernorReport, GovernorStack};
pub use grid::{Grid, ReferenceProfile};
pub use physics::{Convection, SurfaceFluxes, Thermodynamics};
pub use simulation::Driver;
pub use solver::{
    CoriolisParameter, InterpolationOrder, Projection, SemiLagrangian, Smagorinsky,
    TurbulenceReport,
};
pub use spectral::SpectralTransform;
pub use state::State;
pub use steering::{SteeringCoupler, SteeringData, SteeringSample, SteeringSource};
