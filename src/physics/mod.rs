//! Diabatic physics: thermodynamics, convective adjustment, and surface
//! exchange.
//!
//! Each operator freezes its parameters from [`Config`](crate::Config) at
//! construction and exposes a single `step` acting on the mutable
//! [`State`](crate::State), returning a per-step report consumed by the
//! diagnostics layer.

pub mod convection;
pub mod surface_flux;
pub mod thermodynamics;

pub use convection::{Convection, ConvectionReport};
pub use surface_flux::{FluxReport, SurfaceFluxes};
pub use thermodynamics::{ThermoReport, Thermodynamics};
