//! Face-aware filtering: crop to the detected face, then filter the crop.
//!
//! Built by composition: a [`SpectralFilter`] decides *what* happens to the
//! frequencies, a [`SubjectLocator`] decides *which part* of the frame is
//! filtered.

use ndarray::{Array3, ArrayView3};

use super::grayscale::{gray_to_rgba, luminance_u8};
use super::kernel::{FilterConfig, KernelShape};
use super::spectral::SpectralFilter;
use super::subject::{SubjectDetector, SubjectLocator};
use crate::error::Result;

pub struct FaceAwareFilter<D> {
    filter: SpectralFilter,
    locator: SubjectLocator<D>,
}

impl<D: SubjectDetector> FaceAwareFilter<D> {
    pub fn new(filter: SpectralFilter, detector: D) -> Self {
        Self {
            filter,
            locator: SubjectLocator::new(detector),
        }
    }

    pub fn low_pass(sigma: f64, detector: D) -> Result<Self> {
        Ok(Self::new(
            SpectralFilter::new(KernelShape::LowPass, FilterConfig::new(sigma)?),
            detector,
        ))
    }

    pub fn high_pass(sigma: f64, detector: D) -> Result<Self> {
        Ok(Self::new(
            SpectralFilter::new(KernelShape::HighPass, FilterConfig::new(sigma)?),
            detector,
        ))
    }

    pub fn name(&self) -> &'static str {
        match self.filter.shape_kind() {
            KernelShape::LowPass => "face-aware low-pass filter",
            KernelShape::HighPass => "face-aware high-pass filter",
        }
    }

    pub fn sigma(&self) -> f64 {
        self.filter.sigma()
    }

    /// Filter the face region of `image` and return it as opaque RGBA.
    ///
    /// The output has the size of the (expanded, possibly aspect-padded)
    /// face region, not of the whole frame.
    pub fn apply(
        &mut self,
        image: ArrayView3<u8>,
        min_aspect_ratio: Option<f64>,
    ) -> Result<Array3<u8>> {
        let (height, width, _) = image.dim();
        log::info!("applying {} to a {}x{} image", self.name(), width, height);

        let luma = luminance_u8(image)?;
        let face = self.locator.locate(luma.view(), min_aspect_ratio)?;
        let (face_height, face_width) = face.dim();
        log::debug!(
            "applying {} to cropped {}x{} facial region",
            self.name(),
            face_width,
            face_height
        );

        let filtered = self.filter.filter(face.mapv(f64::from).view())?;
        Ok(gray_to_rgba(filtered.view()))
    }
}

/// A spectral filter paired with the part of the frame it sees.
pub enum RegionFilter<D> {
    /// Filter every pixel.
    WholeFrame(SpectralFilter),
    /// Filter only the crop around the single detected face.
    Subject(FaceAwareFilter<D>),
}

impl<D: SubjectDetector> RegionFilter<D> {
    pub fn name(&self) -> &'static str {
        match self {
            RegionFilter::WholeFrame(filter) => filter.name(),
            RegionFilter::Subject(filter) => filter.name(),
        }
    }

    pub fn sigma(&self) -> f64 {
        match self {
            RegionFilter::WholeFrame(filter) => filter.sigma(),
            RegionFilter::Subject(filter) => filter.sigma(),
        }
    }

    pub fn is_face_aware(&self) -> bool {
        matches!(self, RegionFilter::Subject(_))
    }

    /// Filter `image`; `min_aspect_ratio` only affects face crops.
    pub fn apply(
        &mut self,
        image: ArrayView3<u8>,
        min_aspect_ratio: Option<f64>,
    ) -> Result<Array3<u8>> {
        match self {
            RegionFilter::WholeFrame(filter) => filter.apply(image),
            RegionFilter::Subject(filter) => filter.apply(image, min_aspect_ratio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HybridError;
    use crate::filters::subject::{FaceBox, FixedDetector};
    use ndarray::Array3;

    const SIGMAS: [f64; 6] = [0.001, 0.25, 0.75, 1.0, 2.0, 1000.0];

    /// Dark frame with a lighter oval where the detector will report a face.
    fn portrait(height: usize, width: usize) -> (Array3<u8>, FaceBox) {
        let face = FaceBox::new(
            (height * 2 / 5) as i64,
            (width * 2 / 3) as i64,
            (height * 3 / 4) as i64,
            (width / 3) as i64,
        );
        let cy = (face.top + face.bottom) as f64 / 2.0;
        let cx = (face.left + face.right) as f64 / 2.0;
        let ry = face.height() as f64 / 2.0;
        let rx = face.width() as f64 / 2.0;

        let img = Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            let dy = (y as f64 - cy) / ry;
            let dx = (x as f64 - cx) / rx;
            let base = if dy * dy + dx * dx <= 1.0 { 200 } else { 40 };
            (base + c * 5) as u8
        });
        (img, face)
    }

    #[test]
    fn test_face_filters_crop_and_return_rgba() {
        let (img, face) = portrait(120, 90);
        for &sigma in &SIGMAS {
            for mut filter in [
                FaceAwareFilter::low_pass(sigma, FixedDetector::single(face)).unwrap(),
                FaceAwareFilter::high_pass(sigma, FixedDetector::single(face)).unwrap(),
            ] {
                let out = filter.apply(img.view(), None).unwrap();
                let (h, w, c) = out.dim();

                assert_eq!(c, 4);
                assert!(10 < h && h <= 120, "height {h}");
                assert!(10 < w && w <= 90, "width {w}");
            }
        }
    }

    #[test]
    fn test_min_aspect_ratio_makes_crop_taller() {
        let (img, face) = portrait(200, 120);
        let mut filter = FaceAwareFilter::high_pass(0.002, FixedDetector::single(face)).unwrap();

        let plain = filter.apply(img.view(), None).unwrap();
        let tall = filter.apply(img.view(), Some(3.0)).unwrap();

        assert_eq!(plain.dim().1, tall.dim().1);
        assert!(tall.dim().0 > plain.dim().0);
    }

    #[test]
    fn test_missing_face_propagates() {
        let (img, _) = portrait(60, 60);
        let mut filter = FaceAwareFilter::low_pass(0.002, FixedDetector::default()).unwrap();
        assert!(matches!(
            filter.apply(img.view(), None),
            Err(HybridError::SubjectNotFound)
        ));
    }

    #[test]
    fn test_region_filter_whole_frame_keeps_size() {
        let (img, _) = portrait(40, 30);
        let mut filter: RegionFilter<FixedDetector> =
            RegionFilter::WholeFrame(SpectralFilter::low_pass(0.25).unwrap());

        let out = filter.apply(img.view(), Some(5.0)).unwrap();
        assert_eq!(out.dim(), (40, 30, 4));
        assert!(!filter.is_face_aware());
        assert_eq!(filter.name(), "low-pass filter");
    }

    #[test]
    fn test_region_filter_subject_crops() {
        let (img, face) = portrait(120, 90);
        let mut filter = RegionFilter::Subject(
            FaceAwareFilter::high_pass(0.25, FixedDetector::single(face)).unwrap(),
        );

        let out = filter.apply(img.view(), None).unwrap();
        assert!(out.dim().0 < 120);
        assert!(filter.is_face_aware());
    }

    #[test]
    fn test_names() {
        let low = FaceAwareFilter::low_pass(0.5, FixedDetector::default()).unwrap();
        let high = FaceAwareFilter::high_pass(0.5, FixedDetector::default()).unwrap();
        assert_eq!(low.name(), "face-aware low-pass filter");
        assert_eq!(high.name(), "face-aware high-pass filter");
        assert_eq!(low.sigma(), 0.5);
    }
}
