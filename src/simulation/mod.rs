//! The integration driver.
//!
//! Ties the dynamical core, physics operators, boundary sponges, governor
//! stack, and steering coupler into the fixed per-frame sequence, owns the
//! prognostic [`State`](crate::State), and accumulates diagnostics.

mod driver;

pub use driver::Driver;
