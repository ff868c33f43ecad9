//! Computational grid: dimensions, physical extents, and derived spectral
//! quantities.
//!
//! The domain is periodic in x and y. The vertical direction is formally
//! periodic for the transforms, but the advection engine clamps departure
//! points at the top and bottom so the periodicity is never exploited by
//! transport (see [`crate::solver::advection`]).
//!
//! Wavenumbers are angular (2π · fftfreq), so spectral differentiation is
//! multiplication by i·k with no hidden scale factors. All derived arrays
//! are computed once at construction; a `Grid` is immutable afterwards.

pub mod reference;

pub use reference::ReferenceProfile;

use ndarray::{Array1, Array3};

use crate::error::ModelError;

/// Immutable computational grid with precomputed wavenumber arrays and the
/// two-thirds dealiasing mask.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Number of cells in x.
    pub nx: usize,
    /// Number of cells in y.
    pub ny: usize,
    /// Number of vertical levels.
    pub nz: usize,
    /// Physical domain extent in x (m).
    pub lx: f64,
    /// Physical domain extent in y (m).
    pub ly: f64,
    /// Physical domain extent in z (m).
    pub lz: f64,
    /// Cell spacing in x (m).
    pub dx: f64,
    /// Cell spacing in y (m).
    pub dy: f64,
    /// Level spacing in z (m).
    pub dz: f64,
    /// Angular wavenumbers along x (rad/m), FFT ordering.
    pub kx: Array1<f64>,
    /// Angular wavenumbers along y (rad/m), FFT ordering.
    pub ky: Array1<f64>,
    /// Angular wavenumbers along z (rad/m), FFT ordering.
    pub kz: Array1<f64>,
    /// k² = kx² + ky² + kz², full 3D broadcast.
    pub k_squared: Array3<f64>,
    /// Two-thirds-rule dealiasing mask: 1.0 for retained modes, 0.0 for
    /// truncated modes.
    pub dealias_mask: Array3<f64>,
    /// Level heights z_k (m), surface at k = 0.
    pub z_levels: Array1<f64>,
}

impl Grid {
    /// Construct a grid from dimensions and physical extents in meters.
    pub fn new(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Self {
        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        let dz = lz / nz as f64;

        let kx = angular_wavenumbers(nx, dx);
        let ky = angular_wavenumbers(ny, dy);
        let kz = angular_wavenumbers(nz, dz);

        let mut k_squared = Array3::zeros((nx, ny, nz));
        let mut dealias_mask = Array3::zeros((nx, ny, nz));

        // Two-thirds rule: retain |mode index| <= floor(n/3) on each axis.
        let keep_x = nx / 3;
        let keep_y = ny / 3;
        let keep_z = nz / 3;

        for i in 0..nx {
            let mi = fft_mode_index(i, nx);
            for j in 0..ny {
                let mj = fft_mode_index(j, ny);
                for k in 0..nz {
                    let mk = fft_mode_index(k, nz);
                    k_squared[[i, j, k]] = kx[i] * kx[i] + ky[j] * ky[j] + kz[k] * kz[k];
                    let retained = mi.unsigned_abs() as usize <= keep_x
                        && mj.unsigned_abs() as usize <= keep_y
                        && mk.unsigned_abs() as usize <= keep_z;
                    dealias_mask[[i, j, k]] = if retained { 1.0 } else { 0.0 };
                }
            }
        }

        let z_levels = Array1::from_iter((0..nz).map(|k| k as f64 * dz));

        Self {
            nx,
            ny,
            nz,
            lx,
            ly,
            lz,
            dx,
            dy,
            dz,
            kx,
            ky,
            kz,
            k_squared,
            dealias_mask,
            z_levels,
        }
    }

    /// Grid shape as an ndarray dimension tuple.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    /// Total number of cells.
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Check that a field matches the grid dimensions.
    pub fn check_shape(&self, field: &Array3<f64>) -> Result<(), ModelError> {
        let dim = field.dim();
        if dim == self.shape() {
            Ok(())
        } else {
            Err(ModelError::ShapeMismatch {
                expected: self.shape(),
                actual: dim,
            })
        }
    }

    /// Allocate a zeroed field aligned to this grid.
    pub fn zeros(&self) -> Array3<f64> {
        Array3::zeros(self.shape())
    }
}

/// Angular wavenumbers in FFT ordering: k_i = 2π · m_i / (n·d) with
/// m_i ∈ {0, 1, …, n/2−1, −n/2, …, −1}.
///
/// For even n the Nyquist bin m = n/2 has no conjugate partner, so a first
/// derivative there is not representable on the real grid; its wavenumber
/// is set to zero and the mode is treated like the mean. Every spectral
/// operator (derivatives, divergence, k², Poisson) derives from this one
/// vector, so the Nyquist convention stays consistent across all of them.
fn angular_wavenumbers(n: usize, d: f64) -> Array1<f64> {
    let length = n as f64 * d;
    Array1::from_iter((0..n).map(|i| {
        if n % 2 == 0 && i == n / 2 {
            return 0.0;
        }
        let m = fft_mode_index(i, n);
        2.0 * std::f64::consts::PI * m as f64 / length
    }))
}

/// Signed mode index for FFT bin `i` of an `n`-point transform.
#[inline]
fn fft_mode_index(i: usize, n: usize) -> i64 {
    if i <= n / 2 {
        i as i64
    } else {
        i as i64 - n as i64
    }
}
