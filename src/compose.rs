//! Blending a low-pass and a high-pass image into a hybrid image.
//!
//! The first image becomes the blurred component (seen from afar), the
//! second the sharp component (seen up close). In face mode both images are
//! cropped to their face first, and the second crop is made at least as tall
//! relative to its width as the first so the faces line up after resizing.

use std::sync::Arc;

use ndarray::{Array3, ArrayView3};

use crate::config::HybridConfig;
use crate::error::Result;
use crate::filters::face::{FaceAwareFilter, RegionFilter};
use crate::filters::geometry::{blend, fit_and_pad, trim_border};
use crate::filters::grayscale::{gray_to_rgba, luminance_f64};
use crate::filters::spectral::SpectralFilter;
use crate::filters::subject::{FixedDetector, SubjectDetector};

/// Reusable two-branch pipeline.
///
/// Each branch owns its kernel cache, so composing many image pairs of the
/// same size only computes the kernels once. A composer is meant for one
/// thread; build one per worker when running pairs in parallel.
pub struct HybridComposer<D: ?Sized> {
    config: HybridConfig,
    low: RegionFilter<Arc<D>>,
    high: RegionFilter<Arc<D>>,
}

impl HybridComposer<FixedDetector> {
    /// Composer that filters whole frames and never runs face detection.
    pub fn whole_frame(config: HybridConfig) -> Result<Self> {
        let config = HybridConfig {
            ignore_faces: true,
            ..config
        };
        Self::new(config, FixedDetector::default())
    }
}

impl<D: SubjectDetector> HybridComposer<D> {
    pub fn new(config: HybridConfig, detector: D) -> Result<Self> {
        Self::with_shared_detector(config, Arc::new(detector))
    }
}

impl<D: SubjectDetector + ?Sized> HybridComposer<D> {
    pub fn with_shared_detector(config: HybridConfig, detector: Arc<D>) -> Result<Self> {
        Self::with_detectors(config, detector.clone(), detector)
    }

    /// Separate detectors for the far (low-pass) and near (high-pass) image.
    pub fn with_detectors(
        config: HybridConfig,
        far_detector: Arc<D>,
        near_detector: Arc<D>,
    ) -> Result<Self> {
        config.validate()?;

        let (low, high) = if config.ignore_faces {
            (
                RegionFilter::WholeFrame(SpectralFilter::low_pass(config.sigma)?),
                RegionFilter::WholeFrame(SpectralFilter::high_pass(config.sigma)?),
            )
        } else {
            (
                RegionFilter::Subject(FaceAwareFilter::low_pass(config.sigma, far_detector)?),
                RegionFilter::Subject(FaceAwareFilter::high_pass(config.sigma, near_detector)?),
            )
        };
        log::info!("initiated {} (sigma = {})", low.name(), low.sigma());
        log::info!("initiated {} (sigma = {})", high.name(), high.sigma());

        Ok(Self { config, low, high })
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Build the hybrid of `far` (low-pass) and `near` (high-pass).
    ///
    /// Returns an opaque RGBA image with the size of the trimmed low-pass
    /// result.
    pub fn compose(&mut self, far: ArrayView3<u8>, near: ArrayView3<u8>) -> Result<Array3<u8>> {
        log::info!("applying filters");
        let low = self.low.apply(far, None)?;

        let min_aspect_ratio = if self.low.is_face_aware() {
            let (height, width, _) = low.dim();
            Some(height as f64 / width as f64)
        } else {
            None
        };
        let high = self.high.apply(near, min_aspect_ratio)?;

        let margin = self.config.crop_margin;
        log::info!("removing {margin} px from each side to avoid convolution artifacts");
        let low = trim_border(low.view(), margin)?;
        let high = trim_border(high.view(), margin)?;

        let (height, width, _) = low.dim();
        let (high_height, high_width, _) = high.dim();
        log::info!(
            "resizing high-pass image from {high_width}x{high_height} to {width}x{height} so it can be blended"
        );
        let high_luma = luminance_f64(high.view())?;
        let high = gray_to_rgba(fit_and_pad(high_luma.view(), (height, width)).view());

        log::info!("blending with alpha = {}", self.config.alpha);
        blend(low.view(), high.view(), self.config.alpha)
    }
}

/// One-shot hybrid merge of `far` (blurred) and `near` (sharp).
///
/// `detector` is only consulted when `config.ignore_faces` is false.
pub fn hybrid_merge<D: SubjectDetector>(
    far: ArrayView3<u8>,
    near: ArrayView3<u8>,
    detector: D,
    config: &HybridConfig,
) -> Result<Array3<u8>> {
    HybridComposer::new(*config, detector)?.compose(far, near)
}
