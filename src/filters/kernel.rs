//! Frequency-domain kernels and the per-shape kernel cache.
//!
//! Every kernel lives on the zero-padded grid: an `(n, m)` input is padded to
//! `(2n, 2m)` before the transform, so kernels and shift matrices have that
//! doubled shape. Kernels are sampled on `[-1, 1]` in both axes and are
//! centred on the zero frequency, which the checkerboard shift matrix moves to
//! the middle of the spectrum.
//!
//! ## Degenerate kernels
//!
//! A kernel whose total energy is below [`EPSILON`] is replaced by the zero
//! kernel. Filtering with it yields a black image; this is not an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ndarray::Array2;
use rustfft::{Fft, FftPlanner};

use crate::error::{HybridError, Result};

/// Guard against kernels that are numerically all zero.
pub const EPSILON: f64 = 0.00001;

/// Cut-off softness used when a filter is built without an explicit sigma.
pub const DEFAULT_SIGMA: f64 = 0.0015;

/// Parameters of a single Gaussian-family filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    sigma: f64,
    epsilon: f64,
}

impl FilterConfig {
    /// Build a config, rejecting non-positive or non-finite sigma.
    pub fn new(sigma: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(HybridError::InvalidParameter(format!(
                "sigma must be a positive number, got {sigma}"
            )));
        }
        Ok(Self {
            sigma,
            epsilon: EPSILON,
        })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
            epsilon: EPSILON,
        }
    }
}

/// The closed set of frequency masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelShape {
    /// Gaussian bump around the zero frequency (blurs).
    LowPass,
    /// Exact complement of [`KernelShape::LowPass`] (keeps edges and detail).
    HighPass,
}

impl KernelShape {
    pub fn name(self) -> &'static str {
        match self {
            KernelShape::LowPass => "low-pass filter",
            KernelShape::HighPass => "high-pass filter",
        }
    }

    /// Mask value at frequency coordinates `(x, y)` in `[-1, 1]²`.
    #[inline]
    pub fn response(self, x: f64, y: f64, config: &FilterConfig) -> f64 {
        let bump = (-0.5 * (x * x + y * y) / (config.sigma + config.epsilon)).exp();
        match self {
            KernelShape::LowPass => bump,
            KernelShape::HighPass => 1.0 - bump,
        }
    }

    /// Sample the mask for an `(n, m)` input on the `(2n, 2m)` padded grid.
    ///
    /// Rows follow `x`, columns follow `y`. Returns the zero kernel when the
    /// sampled energy does not exceed `epsilon`.
    pub fn sample(self, shape: (usize, usize), config: &FilterConfig) -> Array2<f64> {
        let (n, m) = shape;
        let xs = linspace(2 * n);
        let ys = linspace(2 * m);

        let kernel = Array2::from_shape_fn((2 * n, 2 * m), |(i, j)| {
            self.response(xs[i], ys[j], config)
        });

        if kernel.sum() < config.epsilon {
            return Array2::zeros(kernel.raw_dim());
        }
        kernel
    }
}

/// `count` evenly spaced samples over `[-1, 1]`, endpoints included.
fn linspace(count: usize) -> Vec<f64> {
    if count < 2 {
        return vec![-1.0; count];
    }
    let step = 2.0 / (count - 1) as f64;
    (0..count).map(|i| -1.0 + step * i as f64).collect()
}

/// Checkerboard of `(-1)^(i + j)` on the padded grid of an `(n, m)` input.
///
/// Multiplying by it before the forward transform moves the zero frequency
/// to the centre of the spectrum; multiplying again after the inverse
/// transform undoes the move.
pub fn shift_matrix(shape: (usize, usize)) -> Array2<f64> {
    let (n, m) = shape;
    Array2::from_shape_fn((2 * n, 2 * m), |(i, j)| {
        if (i + j) % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    })
}

/// Everything the filter needs for one input shape.
pub struct CachedSpectrum {
    pub kernel: Array2<f64>,
    pub shift: Array2<f64>,
    /// Transforms along a padded row (length `2m`).
    pub(crate) row_forward: Arc<dyn Fft<f64>>,
    pub(crate) row_inverse: Arc<dyn Fft<f64>>,
    /// Transforms along a padded column (length `2n`).
    pub(crate) col_forward: Arc<dyn Fft<f64>>,
    pub(crate) col_inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for CachedSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSpectrum")
            .field("padded_dim", &self.kernel.dim())
            .field("kernel_sum", &self.kernel.sum())
            .finish()
    }
}

/// Lazily computed kernels, shift matrices and FFT plans, keyed by shape.
///
/// Owned by exactly one filter. Entries are written on first use of a shape
/// and only read afterwards; there is no eviction. Writing requires `&mut
/// self`, so a cache is never shared between concurrent writers. Give each
/// worker thread its own filter.
pub struct KernelCache {
    shape_kind: KernelShape,
    config: FilterConfig,
    planner: FftPlanner<f64>,
    entries: HashMap<(usize, usize), CachedSpectrum>,
}

impl KernelCache {
    pub fn new(shape_kind: KernelShape, config: FilterConfig) -> Self {
        Self {
            shape_kind,
            config,
            planner: FftPlanner::new(),
            entries: HashMap::new(),
        }
    }

    /// Fetch the entry for an `(n, m)` input, computing it on first request.
    pub fn get(&mut self, shape: (usize, usize)) -> &CachedSpectrum {
        let shape_kind = self.shape_kind;
        let config = self.config;
        let planner = &mut self.planner;

        self.entries.entry(shape).or_insert_with(|| {
            let (n, m) = shape;
            log::debug!(
                "computing {} kernel for {}x{} input (sigma = {})",
                shape_kind.name(),
                m,
                n,
                config.sigma()
            );
            CachedSpectrum {
                kernel: shape_kind.sample(shape, &config),
                shift: shift_matrix(shape),
                row_forward: planner.plan_fft_forward(2 * m),
                row_inverse: planner.plan_fft_inverse(2 * m),
                col_forward: planner.plan_fft_forward(2 * n),
                col_inverse: planner.plan_fft_inverse(2 * n),
            }
        })
    }

    pub fn kernel(&mut self, shape: (usize, usize)) -> &Array2<f64> {
        &self.get(shape).kernel
    }

    pub fn shift_matrix(&mut self, shape: (usize, usize)) -> &Array2<f64> {
        &self.get(shape).shift
    }

    pub fn contains(&self, shape: (usize, usize)) -> bool {
        self.entries.contains_key(&shape)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
