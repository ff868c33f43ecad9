//! Domain-edge damping.
//!
//! The horizontal directions are periodic, so the only boundary treatment
//! the model needs is absorption: sponge bands that keep radiated waves
//! from re-entering the active region.

mod sponge;

pub use sponge::Sponge;
