//! Frequency-domain convolution with a Gaussian low- or high-pass mask.
//!
//! ## Algorithm
//!
//! For an `(n, m)` input:
//! 1. zero-pad to `(2n, 2m)` with the data in the top-left quadrant, so the
//!    circular convolution of the DFT behaves like a linear one
//! 2. multiply by the checkerboard shift matrix to centre the spectrum
//! 3. forward 2-D FFT, multiply by the mask, inverse 2-D FFT
//! 4. multiply by the shift matrix again and keep the real part of the
//!    top-left `(n, m)` block
//!
//! Kernels, shift matrices and FFT plans are memoized per input shape in a
//! [`KernelCache`] owned by the filter.

use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayD, ArrayView2, ArrayView3, ArrayViewD, Ix2};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::Fft;

use super::grayscale::{gray_to_rgba, luminance_f64};
use super::kernel::{FilterConfig, KernelCache, KernelShape};
use crate::error::{HybridError, Result};

/// A Gaussian-family FFT filter over single-channel data.
pub struct SpectralFilter {
    shape_kind: KernelShape,
    config: FilterConfig,
    cache: KernelCache,
}

impl SpectralFilter {
    pub fn new(shape_kind: KernelShape, config: FilterConfig) -> Self {
        log::debug!("initiated {} (sigma = {})", shape_kind.name(), config.sigma());
        Self {
            shape_kind,
            config,
            cache: KernelCache::new(shape_kind, config),
        }
    }

    pub fn low_pass(sigma: f64) -> Result<Self> {
        Ok(Self::new(KernelShape::LowPass, FilterConfig::new(sigma)?))
    }

    pub fn high_pass(sigma: f64) -> Result<Self> {
        Ok(Self::new(KernelShape::HighPass, FilterConfig::new(sigma)?))
    }

    pub fn name(&self) -> &'static str {
        self.shape_kind.name()
    }

    pub fn shape_kind(&self) -> KernelShape {
        self.shape_kind
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn sigma(&self) -> f64 {
        self.config.sigma()
    }

    /// Frequency mask used for an `(n, m)` input (shape `(2n, 2m)`).
    pub fn kernel(&mut self, shape: (usize, usize)) -> &Array2<f64> {
        self.cache.kernel(shape)
    }

    /// Centring checkerboard used for an `(n, m)` input (shape `(2n, 2m)`).
    pub fn shift_matrix(&mut self, shape: (usize, usize)) -> &Array2<f64> {
        self.cache.shift_matrix(shape)
    }

    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }

    /// Filter a single-channel array, returning an array of the same shape.
    ///
    /// Fails with [`HybridError::InvalidShape`] when either axis is empty.
    pub fn filter(&mut self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        let (n, m) = data.dim();
        if n == 0 || m == 0 {
            return Err(HybridError::InvalidShape { shape: vec![n, m] });
        }
        let (rows, cols) = (2 * n, 2 * m);
        let spectrum = self.cache.get((n, m));

        // pad and centre; everything outside the top-left quadrant stays zero
        let mut buffer = vec![Complex::new(0.0f64, 0.0); rows * cols];
        for y in 0..n {
            for x in 0..m {
                buffer[y * cols + x] = Complex::new(data[[y, x]] * spectrum.shift[[y, x]], 0.0);
            }
        }

        transform_2d(
            &mut buffer,
            cols,
            &spectrum.row_forward,
            &spectrum.col_forward,
        );

        for (value, &k) in buffer.iter_mut().zip(spectrum.kernel.iter()) {
            *value *= k;
        }

        transform_2d(
            &mut buffer,
            cols,
            &spectrum.row_inverse,
            &spectrum.col_inverse,
        );

        // rustfft leaves the inverse unnormalized
        let scale = 1.0 / (rows * cols) as f64;
        let output = Array2::from_shape_fn((n, m), |(y, x)| {
            buffer[y * cols + x].re * scale * spectrum.shift[[y, x]]
        });

        Ok(output)
    }

    /// Like [`SpectralFilter::filter`] but for arrays of unknown rank.
    ///
    /// Anything that is not exactly 2-D fails with
    /// [`HybridError::InvalidShape`].
    pub fn filter_dyn(&mut self, data: ArrayViewD<f64>) -> Result<ArrayD<f64>> {
        let shape = data.shape().to_vec();
        let data = data
            .into_dimensionality::<Ix2>()
            .map_err(|_| HybridError::InvalidShape { shape })?;
        Ok(self.filter(data)?.into_dyn())
    }

    /// Filter the luminance of a raster and return an opaque RGBA raster of
    /// the same height and width.
    pub fn apply(&mut self, image: ArrayView3<u8>) -> Result<Array3<u8>> {
        let luma = luminance_f64(image)?;
        let filtered = self.filter(luma.view())?;
        Ok(gray_to_rgba(filtered.view()))
    }
}

/// In-place 2-D FFT of a row-major `(rows, cols)` buffer.
///
/// Rows and columns are transformed in parallel; columns go through a
/// transposed scratch buffer so each one is contiguous.
fn transform_2d(
    buffer: &mut [Complex<f64>],
    cols: usize,
    row_fft: &Arc<dyn Fft<f64>>,
    col_fft: &Arc<dyn Fft<f64>>,
) {
    let rows = buffer.len() / cols;

    buffer
        .par_chunks_mut(cols)
        .for_each(|row| row_fft.process(row));

    let mut transposed = vec![Complex::new(0.0f64, 0.0); buffer.len()];
    for y in 0..rows {
        for x in 0..cols {
            transposed[x * rows + y] = buffer[y * cols + x];
        }
    }

    transposed
        .par_chunks_mut(rows)
        .for_each(|col| col_fft.process(col));

    for x in 0..cols {
        for y in 0..rows {
            buffer[y * cols + x] = transposed[x * rows + y];
        }
    }
}
