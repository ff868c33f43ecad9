//! Pseudo-spectral transform layer.
//!
//! All spatial derivatives in the solver are spectral: a field is carried to
//! wavenumber space with a 3D FFT, multiplied by i·k along the relevant axis,
//! and carried back. With the angular wavenumbers precomputed on the
//! [`Grid`](crate::grid::Grid) this is exact for resolved modes, and the
//! two-thirds mask removes the quadratic aliasing products.

mod transform;

pub use transform::SpectralTransform;
