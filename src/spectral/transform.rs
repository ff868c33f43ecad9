//! FFT plans and spectral operators.
//!
//! Plans are built once per axis length at construction and reused for the
//! whole run. Transforms are applied axis by axis through a contiguous lane
//! buffer; the inverse carries the 1/n normalization so that
//! `inverse(forward(f)) == f` up to roundoff.

use std::sync::Arc;

use ndarray::{Array1, Array3, Axis, Zip};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::config::Backend;
use crate::grid::Grid;

/// Reusable 3D FFT engine with spectral derivative, divergence, Poisson, and
/// dealiasing operators.
pub struct SpectralTransform {
    shape: (usize, usize, usize),
    forward_plans: [Arc<dyn Fft<f64>>; 3],
    inverse_plans: [Arc<dyn Fft<f64>>; 3],
    backend: Backend,
}

impl SpectralTransform {
    /// Plan forward and inverse transforms for each grid axis.
    pub fn new(grid: &Grid, backend: Backend) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let forward_plans = [
            planner.plan_fft_forward(grid.nx),
            planner.plan_fft_forward(grid.ny),
            planner.plan_fft_forward(grid.nz),
        ];
        let inverse_plans = [
            planner.plan_fft_inverse(grid.nx),
            planner.plan_fft_inverse(grid.ny),
            planner.plan_fft_inverse(grid.nz),
        ];
        Self {
            shape: grid.shape(),
            forward_plans,
            inverse_plans,
            backend,
        }
    }

    /// Forward 3D transform of a real field.
    pub fn forward(&self, field: &Array3<f64>) -> Array3<Complex64> {
        let mut spec = field.mapv(|x| Complex64::new(x, 0.0));
        for axis in 0..3 {
            self.transform_axis(&mut spec, axis, false);
        }
        spec
    }

    /// Inverse 3D transform, discarding the imaginary residue of a
    /// conjugate-symmetric spectrum.
    pub fn inverse(&self, spec: &Array3<Complex64>) -> Array3<f64> {
        let mut work = spec.clone();
        for axis in 0..3 {
            self.transform_axis(&mut work, axis, true);
        }
        work.mapv(|c| c.re)
    }

    fn transform_axis(&self, data: &mut Array3<Complex64>, axis: usize, inverse: bool) {
        let plan = if inverse {
            &self.inverse_plans[axis]
        } else {
            &self.forward_plans[axis]
        };
        let n = plan.len();
        let scale = if inverse { 1.0 / n as f64 } else { 1.0 };

        let apply = |lane: &mut ndarray::ArrayViewMut1<Complex64>| {
            let mut buffer: Vec<Complex64> = lane.iter().copied().collect();
            plan.process(&mut buffer);
            for (dst, src) in lane.iter_mut().zip(buffer) {
                *dst = src * scale;
            }
        };

        match self.backend {
            Backend::Serial => {
                Zip::from(data.lanes_mut(Axis(axis))).for_each(|mut lane| apply(&mut lane));
            }
            #[cfg(feature = "parallel")]
            Backend::Parallel => {
                Zip::from(data.lanes_mut(Axis(axis))).par_for_each(|mut lane| apply(&mut lane));
            }
            #[cfg(not(feature = "parallel"))]
            Backend::Parallel => {
                Zip::from(data.lanes_mut(Axis(axis))).for_each(|mut lane| apply(&mut lane));
            }
        }
    }

    /// Multiply a spectrum by i·k along one axis in place.
    fn apply_ik(spec: &mut Array3<Complex64>, wavenumbers: &Array1<f64>, axis: usize) {
        for (index, mut plane) in spec.axis_iter_mut(Axis(axis)).enumerate() {
            let ik = Complex64::new(0.0, wavenumbers[index]);
            plane.mapv_inplace(|c| c * ik);
        }
    }

    /// Spectral ∂f/∂x.
    pub fn gradient_x(&self, grid: &Grid, field: &Array3<f64>) -> Array3<f64> {
        let mut spec = self.forward(field);
        Self::apply_ik(&mut spec, &grid.kx, 0);
        self.inverse(&spec)
    }

    /// Spectral ∂f/∂y.
    pub fn gradient_y(&self, grid: &Grid, field: &Array3<f64>) -> Array3<f64> {
        let mut spec = self.forward(field);
        Self::apply_ik(&mut spec, &grid.ky, 1);
        self.inverse(&spec)
    }

    /// Spectral ∂f/∂z.
    pub fn gradient_z(&self, grid: &Grid, field: &Array3<f64>) -> Array3<f64> {
        let mut spec = self.forward(field);
        Self::apply_ik(&mut spec, &grid.kz, 2);
        self.inverse(&spec)
    }

    /// Spectral divergence ∂u/∂x + ∂v/∂y + ∂w/∂z.
    pub fn divergence(
        &self,
        grid: &Grid,
        u: &Array3<f64>,
        v: &Array3<f64>,
        w: &Array3<f64>,
    ) -> Array3<f64> {
        let mut du = self.forward(u);
        let mut dv = self.forward(v);
        let mut dw = self.forward(w);
        Self::apply_ik(&mut du, &grid.kx, 0);
        Self::apply_ik(&mut dv, &grid.ky, 1);
        Self::apply_ik(&mut dw, &grid.kz, 2);
        du += &dv;
        du += &dw;
        self.inverse(&du)
    }

    /// Vertical vorticity ζ = ∂v/∂x − ∂u/∂y.
    pub fn vorticity_z(&self, grid: &Grid, u: &Array3<f64>, v: &Array3<f64>) -> Array3<f64> {
        let mut dv = self.forward(v);
        let mut du = self.forward(u);
        Self::apply_ik(&mut dv, &grid.kx, 0);
        Self::apply_ik(&mut du, &grid.ky, 1);
        dv -= &du;
        self.inverse(&dv)
    }

    /// Solve ∇²φ = rhs for the zero-mean φ: φ̂ = −rhŝ/k², with the k = 0
    /// mode pinned to zero (the mean of φ is not determined by the Poisson
    /// equation on a periodic domain).
    pub fn poisson_inverse(&self, grid: &Grid, rhs: &Array3<f64>) -> Array3<f64> {
        let mut spec = self.forward(rhs);
        Zip::from(&mut spec)
            .and(&grid.k_squared)
            .for_each(|c, &k_sq| {
                if k_sq > 0.0 {
                    *c = -*c / k_sq;
                } else {
                    *c = Complex64::new(0.0, 0.0);
                }
            });
        self.inverse(&spec)
    }

    /// Zero all modes outside the two-thirds retention region.
    pub fn dealias(&self, grid: &Grid, field: &mut Array3<f64>) {
        let mut spec = self.forward(field);
        Zip::from(&mut spec)
            .and(&grid.dealias_mask)
            .for_each(|c, &mask| *c *= mask);
        *field = self.inverse(&spec);
    }

    /// Shape this transform was planned for.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn make_grid() -> Grid {
        Grid::new(16, 16, 8, 1000.0, 2000.0, 500.0)
    }

    fn sine_x(grid: &Grid, mode: f64) -> Array3<f64> {
        let mut field = grid.zeros();
        for i in 0..grid.nx {
            let x = i as f64 * grid.dx;
            let value = (2.0 * PI * mode * x / grid.lx).sin();
            field.index_axis_mut(Axis(0), i).fill(value);
        }
        field
    }

    #[test]
    fn test_round_trip_identity() {
        let grid = make_grid();
        let transform = SpectralTransform::new(&grid, Backend::Serial);
        let mut field = grid.zeros();
        for ((i, j, k), value) in field.indexed_iter_mut() {
            *value = (i as f64 * 0.37 + j as f64 * 1.11 - k as f64 * 0.53).sin();
        }
        let back = transform.inverse(&transform.forward(&field));
        let max_err = field
            .iter()
            .zip(back.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        assert!(max_err < 1e-12, "round trip error {max_err}");
    }

    #[test]
    fn test_gradient_of_sine() {
        // d/dx sin(2πx/L) = (2π/L) cos(2πx/L), exact for a resolved mode.
        let grid = make_grid();
        let transform = SpectralTransform::new(&grid, Backend::Serial);
        let field = sine_x(&grid, 1.0);
        let grad = transform.gradient_x(&grid, &field);
        let k1 = 2.0 * PI / grid.lx;
        for i in 0..grid.nx {
            let x = i as f64 * grid.dx;
            let expected = k1 * (k1 * x).cos();
            let got = grad[[i, 3, 2]];
            assert!(
                (got - expected).abs() < 1e-10,
                "gradient at i={i}: {got} vs {expected}"
            );
        }
    }

    #[test]
    fn test_gradient_of_constant_is_zero() {
        let grid = make_grid();
        let transform = SpectralTransform::new(&grid, Backend::Serial);
        let field = Array3::from_elem(grid.shape(), 4.2);
        let grad = transform.gradient_y(&grid, &field);
        assert!(grad.iter().all(|g| g.abs() < 1e-12));
    }

    #[test]
    fn test_poisson_inverse_recovers_laplacian() {
        // ∇²φ for φ = sin(k₁x): rhs = -k₁² sin(k₁x); the solver must return φ.
        let grid = make_grid();
        let transform = SpectralTransform::new(&grid, Backend::Serial);
        let phi = sine_x(&grid, 1.0);
        let k1 = 2.0 * PI / grid.lx;
        let rhs = phi.mapv(|p| -k1 * k1 * p);
        let solved = transform.poisson_inverse(&grid, &rhs);
        let max_err = phi
            .iter()
            .zip(solved.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        assert!(max_err < 1e-10, "poisson error {max_err}");
    }

    #[test]
    fn test_dealias_removes_high_mode() {
        let grid = make_grid();
        let transform = SpectralTransform::new(&grid, Backend::Serial);
        // Mode 7 of 16 is beyond the retained band (16/3 = 5).
        let mut field = sine_x(&grid, 7.0);
        transform.dealias(&grid, &mut field);
        assert!(field.iter().all(|x| x.abs() < 1e-10));
        // Mode 2 survives untouched.
        let mut low = sine_x(&grid, 2.0);
        let before = low.clone();
        transform.dealias(&grid, &mut low);
        let max_err = low
            .iter()
            .zip(before.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        assert!(max_err < 1e-10);
    }

    #[test]
    fn test_nyquist_content_does_not_corrupt_gradient() {
        // A checkerboard along z is pure Nyquist: its spectral derivative is
        // zero, and superposing it must leave the derivative of the smooth
        // part untouched on every plane.
        let grid = make_grid();
        let transform = SpectralTransform::new(&grid, Backend::Serial);
        let smooth = sine_x(&grid, 1.0);
        let mut field = smooth.clone();
        for ((_, _, k), value) in field.indexed_iter_mut() {
            *value += if k % 2 == 0 { 1.0 } else { -1.0 };
        }
        let grad = transform.gradient_x(&grid, &field);
        let grad_smooth = transform.gradient_x(&grid, &smooth);
        let max_err = grad
            .iter()
            .zip(grad_smooth.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        assert!(max_err < 1e-10, "gradient corrupted by {max_err}");
    }

    #[test]
    fn test_divergence_of_rotational_field_is_zero() {
        // u = sin(2πy/Ly) depends only on y, v = sin(2πx/Lx) only on x.
        let grid = make_grid();
        let transform = SpectralTransform::new(&grid, Backend::Serial);
        let mut u = grid.zeros();
        let mut v = grid.zeros();
        for ((i, j, _), value) in u.indexed_iter_mut() {
            let _ = i;
            let y = j as f64 * grid.dy;
            *value = (2.0 * PI * y / grid.ly).sin();
        }
        for ((i, _, _), value) in v.indexed_iter_mut() {
            let x = i as f64 * grid.dx;
            *value = (2.0 * PI * x / grid.lx).sin();
        }
        let w = grid.zeros();
        let div = transform.divergence(&grid, &u, &v, &w);
        assert!(div.iter().all(|d| d.abs() < 1e-10));
    }
}
