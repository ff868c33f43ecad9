//! Dynamical core: transport, rotation, subgrid closure, and the
//! incompressibility projection.

pub mod advection;
pub mod coriolis;
pub mod projection;
pub mod turbulence;

pub use advection::{InterpolationOrder, SemiLagrangian};
pub use coriolis::{apply_rotation, CoriolisParameter};
pub use projection::{remove_level_means, Projection};
pub use turbulence::{Smagorinsky, TurbulenceReport};
