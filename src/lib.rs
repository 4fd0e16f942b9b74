//! hybrid_face
//!
//! Hybrid images: a low-pass filtered picture that dominates from afar,
//! blended with a high-pass filtered picture that dominates up close.
//! Filtering happens in the frequency domain with Gaussian masks on a
//! zero-padded, centred FFT, optionally restricted to the single face found
//! in each picture.
//!
//! ## Image Format
//! Rasters are `ndarray` arrays of shape (height, width, channels), `u8`:
//! - **Grayscale**: (height, width, 1)
//! - **RGB**: (height, width, 3)
//! - **RGBA**: (height, width, 4)
//!
//! Filters reduce their input to luminance and return opaque RGBA.
//!
//! ## Pipeline
//! ```text
//! far  -> [face crop] -> luminance -> low-pass  --\
//!                                                  trim -> fit/pad -> blend
//! near -> [face crop] -> luminance -> high-pass --/
//! ```
//!
//! ## Bindings
//! - `cli` (default): the `hybrid-face` binary
//! - `python`: PyO3 module `hybrid_face`
//! - `wasm`: wasm-bindgen exports over flat RGBA buffers

pub mod compose;
pub mod config;
pub mod error;
pub mod filters;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use compose::{hybrid_merge, HybridComposer};
pub use config::{Emphasis, HybridConfig};
pub use error::{HybridError, Result};
pub use filters::face::{FaceAwareFilter, RegionFilter};
pub use filters::kernel::{FilterConfig, KernelCache, KernelShape, DEFAULT_SIGMA, EPSILON};
pub use filters::spectral::SpectralFilter;
pub use filters::subject::{
    FaceBox, FixedDetector, FnDetector, SubjectDetector, SubjectLocator, SubjectRegion,
};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use ndarray::ArrayView2;
    use numpy::{IntoPyArray, PyArray3, PyArrayDyn, PyReadonlyArray3, PyReadonlyArrayDyn};
    use pyo3::exceptions::{PyNotImplementedError, PyValueError};
    use pyo3::prelude::*;

    use crate::config::{Emphasis, HybridConfig};
    use crate::error::HybridError;
    use crate::filters::kernel::DEFAULT_SIGMA;
    use crate::filters::spectral::SpectralFilter;
    use crate::filters::subject::{FaceBox, FixedDetector, SubjectDetector};

    impl From<HybridError> for PyErr {
        fn from(err: HybridError) -> Self {
            match err {
                // multiple faces is a missing feature rather than bad input
                HybridError::UnsupportedMultiSubject { .. } => {
                    PyNotImplementedError::new_err(err.to_string())
                }
                _ => PyValueError::new_err(err.to_string()),
            }
        }
    }

    /// Python callable used as face detector.
    ///
    /// Called with the uint8 luminance array, must return a list of
    /// `(top, right, bottom, left)` tuples.
    struct PyDetector {
        callable: Py<PyAny>,
    }

    impl SubjectDetector for PyDetector {
        fn detect(&self, luma: ArrayView2<u8>) -> crate::Result<Vec<FaceBox>> {
            let boxes = Python::with_gil(|py| -> PyResult<Vec<(i64, i64, i64, i64)>> {
                let array = luma.to_owned().into_pyarray(py);
                self.callable.bind(py).call1((array,))?.extract()
            })
            .map_err(|e| HybridError::Detector(e.to_string()))?;

            Ok(boxes
                .into_iter()
                .map(|(top, right, bottom, left)| FaceBox::new(top, right, bottom, left))
                .collect())
        }
    }

    // ========================================================================
    // Whole-frame Filters
    // ========================================================================

    /// Low-pass filter the luminance of an image.
    ///
    /// # Arguments
    /// * `image` - (height, width, channels) uint8 array, 1, 3 or 4 channels
    /// * `sigma` - Soft cut-off of the Gaussian mask
    ///
    /// # Returns
    /// (height, width, 4) RGBA uint8 array
    #[pyfunction]
    #[pyo3(signature = (image, sigma=DEFAULT_SIGMA))]
    pub fn low_pass<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        sigma: f64,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let mut filter = SpectralFilter::low_pass(sigma)?;
        let result = filter.apply(image.as_array())?;
        Ok(result.into_pyarray(py))
    }

    /// High-pass filter the luminance of an image.
    #[pyfunction]
    #[pyo3(signature = (image, sigma=DEFAULT_SIGMA))]
    pub fn high_pass<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        sigma: f64,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let mut filter = SpectralFilter::high_pass(sigma)?;
        let result = filter.apply(image.as_array())?;
        Ok(result.into_pyarray(py))
    }

    /// Filter raw float64 data; raises ValueError unless it is 2-D.
    ///
    /// `kind` is "low" or "high".
    #[pyfunction]
    #[pyo3(signature = (data, sigma=DEFAULT_SIGMA, kind="low"))]
    pub fn spectral_filter<'py>(
        py: Python<'py>,
        data: PyReadonlyArrayDyn<'py, f64>,
        sigma: f64,
        kind: &str,
    ) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
        let mut filter = match kind {
            "low" => SpectralFilter::low_pass(sigma)?,
            "high" => SpectralFilter::high_pass(sigma)?,
            other => {
                return Err(PyValueError::new_err(format!(
                    "kind must be 'low' or 'high', got {other:?}"
                )))
            }
        };
        let result = filter.filter_dyn(data.as_array())?;
        Ok(result.into_pyarray(py))
    }

    /// Sigma used for an emphasis name ("far", "balanced" or "near").
    #[pyfunction]
    pub fn emphasis_sigma(emphasis: &str) -> PyResult<f64> {
        Ok(emphasis.parse::<Emphasis>()?.sigma())
    }

    // ========================================================================
    // Hybrid Merge
    // ========================================================================

    /// Blend the low-passed `image1` with the high-passed `image2`.
    ///
    /// Unless `ignore_faces` is set, `detector` must be a callable that finds
    /// faces in a uint8 luminance array.
    #[pyfunction]
    #[pyo3(signature = (
        image1,
        image2,
        sigma=0.002,
        alpha=0.5,
        ignore_faces=false,
        crop_margin=15,
        detector=None
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn hybrid_merge<'py>(
        py: Python<'py>,
        image1: PyReadonlyArray3<'py, u8>,
        image2: PyReadonlyArray3<'py, u8>,
        sigma: f64,
        alpha: f64,
        ignore_faces: bool,
        crop_margin: usize,
        detector: Option<Bound<'py, PyAny>>,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let config = HybridConfig {
            sigma,
            alpha,
            ignore_faces,
            crop_margin,
        };
        let far = image1.as_array();
        let near = image2.as_array();

        let result = match detector {
            Some(callable) => {
                let detector = PyDetector {
                    callable: callable.unbind(),
                };
                crate::compose::hybrid_merge(far, near, detector, &config)?
            }
            None if ignore_faces => {
                crate::compose::hybrid_merge(far, near, FixedDetector::default(), &config)?
            }
            None => {
                return Err(PyValueError::new_err(
                    "a face detector is required unless ignore_faces=True",
                ))
            }
        };
        Ok(result.into_pyarray(py))
    }

    /// hybrid_face Rust extension module
    #[pymodule]
    pub fn hybrid_face(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add("__version__", env!("CARGO_PKG_VERSION"))?;

        // Whole-frame filters
        m.add_function(wrap_pyfunction!(low_pass, m)?)?;
        m.add_function(wrap_pyfunction!(high_pass, m)?)?;
        m.add_function(wrap_pyfunction!(spectral_filter, m)?)?;
        m.add_function(wrap_pyfunction!(emphasis_sigma, m)?)?;

        // Hybrid merge
        m.add_function(wrap_pyfunction!(hybrid_merge, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::hybrid_face;
