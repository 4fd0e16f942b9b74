//! Locating the single face to crop before filtering.
//!
//! Detection itself is a collaborator behind [`SubjectDetector`]. The locator
//! insists on exactly one detection, widens the detector's tight box with a
//! fixed asymmetric margin (mostly upwards, to include forehead and hair),
//! optionally grows it vertically to reach a minimum height/width ratio, and
//! crops the luminance image to the result.

use std::sync::Arc;

use ndarray::{s, Array2, ArrayView2};

use crate::error::{HybridError, Result};

/// Expansion of the detected box, as fractions of its height/width.
const EXPAND_TOP: f64 = 0.8;
const EXPAND_BOTTOM: f64 = 0.2;
const EXPAND_SIDES: f64 = 0.3;

/// Detector output in pixel coordinates.
///
/// Field order follows the common `(top, right, bottom, left)` convention of
/// face detection libraries. Coordinates may lie outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub left: i64,
}

impl FaceBox {
    pub fn new(top: i64, right: i64, bottom: i64, left: i64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Parse `"top,right,bottom,left"`.
    pub fn parse(text: &str) -> Result<Self> {
        let values = text
            .split(',')
            .map(|part| part.trim().parse::<i64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| HybridError::InvalidParameter(format!("face box {text:?}: {e}")))?;

        match values.as_slice() {
            &[top, right, bottom, left] => Ok(Self::new(top, right, bottom, left)),
            _ => Err(HybridError::InvalidParameter(format!(
                "face box {text:?} must be TOP,RIGHT,BOTTOM,LEFT"
            ))),
        }
    }

    pub fn height(&self) -> i64 {
        (self.bottom - self.top).abs()
    }

    pub fn width(&self) -> i64 {
        (self.right - self.left).abs()
    }
}

/// Pluggable face detection backend.
///
/// Receives the row-major `(height, width)` luminance image and returns every
/// face found, in any order. An empty vector means no face.
pub trait SubjectDetector {
    fn detect(&self, luma: ArrayView2<u8>) -> Result<Vec<FaceBox>>;
}

impl<D: SubjectDetector + ?Sized> SubjectDetector for &D {
    fn detect(&self, luma: ArrayView2<u8>) -> Result<Vec<FaceBox>> {
        (**self).detect(luma)
    }
}

impl<D: SubjectDetector + ?Sized> SubjectDetector for Arc<D> {
    fn detect(&self, luma: ArrayView2<u8>) -> Result<Vec<FaceBox>> {
        (**self).detect(luma)
    }
}

/// Adapts a plain function or closure into a [`SubjectDetector`].
#[derive(Debug, Clone, Copy)]
pub struct FnDetector<F>(pub F);

impl<F> SubjectDetector for FnDetector<F>
where
    F: Fn(ArrayView2<u8>) -> Result<Vec<FaceBox>>,
{
    fn detect(&self, luma: ArrayView2<u8>) -> Result<Vec<FaceBox>> {
        (self.0)(luma)
    }
}

/// Detector that reports boxes known in advance (e.g. from the command line
/// or from an external detection run).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedDetector {
    boxes: Vec<FaceBox>,
}

impl FixedDetector {
    pub fn new(boxes: Vec<FaceBox>) -> Self {
        Self { boxes }
    }

    pub fn single(face: FaceBox) -> Self {
        Self { boxes: vec![face] }
    }
}

impl SubjectDetector for FixedDetector {
    fn detect(&self, _luma: ArrayView2<u8>) -> Result<Vec<FaceBox>> {
        Ok(self.boxes.clone())
    }
}

/// Crop rectangle in pixel coordinates, `left < right <= width` and
/// `top < bottom <= height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectRegion {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl SubjectRegion {
    pub fn width(&self) -> usize {
        self.right - self.left
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f64 {
        self.height() as f64 / self.width() as f64
    }

    pub fn crop<'a>(&self, luma: ArrayView2<'a, u8>) -> ArrayView2<'a, u8> {
        luma.slice_move(s![self.top..self.bottom, self.left..self.right])
    }
}

/// Finds the one face in an image and computes the crop around it.
#[derive(Debug, Clone)]
pub struct SubjectLocator<D> {
    detector: D,
}

impl<D: SubjectDetector> SubjectLocator<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    /// Crop region for the single face in `luma`.
    ///
    /// `min_aspect_ratio` (height / width) grows the region vertically,
    /// half above and half below, until the ratio is reached or the image
    /// border stops it.
    pub fn locate_region(
        &self,
        luma: ArrayView2<u8>,
        min_aspect_ratio: Option<f64>,
    ) -> Result<SubjectRegion> {
        if let Some(ratio) = min_aspect_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(HybridError::InvalidParameter(format!(
                    "minimum aspect ratio must be positive, got {ratio}"
                )));
            }
        }

        let faces = self.detector.detect(luma)?;
        let face = match faces.as_slice() {
            [] => return Err(HybridError::SubjectNotFound),
            [face] => *face,
            _ => {
                return Err(HybridError::UnsupportedMultiSubject { count: faces.len() });
            }
        };

        let (height, width) = luma.dim();
        let (h, w) = (height as f64, width as f64);
        let dy = face.height() as f64;
        let dx = face.width() as f64;
        log::info!(
            "detected a {} x {} face with an aspect ratio of {:.2} located at {:?}",
            face.width(),
            face.height(),
            dy / dx,
            face
        );

        // the detector's box is tight around the features
        let mut top = (face.top as f64 - dy * EXPAND_TOP).clamp(0.0, h);
        let mut bottom = (face.bottom as f64 + dy * EXPAND_BOTTOM).clamp(0.0, h);
        let left = (face.left as f64 - dx * EXPAND_SIDES).clamp(0.0, w);
        let right = (face.right as f64 + dx * EXPAND_SIDES).clamp(0.0, w);

        if let Some(ratio) = min_aspect_ratio {
            let crop_dy = bottom - top;
            let crop_dx = right - left;
            let min_dy = crop_dx * ratio;

            if crop_dy < min_dy {
                let half = (min_dy - crop_dy) / 2.0;
                top = (top - half).clamp(0.0, h);
                bottom = (bottom + half).clamp(0.0, h);
                log::info!(
                    "padded face region from aspect ratio {:.2} to {:.2} (requested at least {:.2})",
                    crop_dy / crop_dx,
                    (bottom - top) / crop_dx,
                    ratio
                );
            }
        }

        let region = SubjectRegion {
            left: left.round() as usize,
            top: top.round() as usize,
            right: right.round() as usize,
            bottom: bottom.round() as usize,
        };
        if region.left >= region.right || region.top >= region.bottom {
            return Err(HybridError::EmptySubjectRegion);
        }

        Ok(region)
    }

    /// Crop `luma` to the region of its single face.
    pub fn locate(
        &self,
        luma: ArrayView2<u8>,
        min_aspect_ratio: Option<f64>,
    ) -> Result<Array2<u8>> {
        let region = self.locate_region(luma, min_aspect_ratio)?;
        Ok(region.crop(luma).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(faces: Vec<FaceBox>) -> SubjectLocator<FixedDetector> {
        SubjectLocator::new(FixedDetector::new(faces))
    }

    #[test]
    fn test_parse_face_box() {
        assert_eq!(FaceBox::parse("10, 60,70,20").unwrap(), FaceBox::new(10, 60, 70, 20));
        assert!(FaceBox::parse("1,2,3").is_err());
        assert!(FaceBox::parse("a,b,c,d").is_err());
    }

    #[test]
    fn test_no_face_is_an_error() {
        let luma = Array2::<u8>::zeros((50, 50));
        let err = locator(vec![]).locate(luma.view(), None).unwrap_err();
        assert!(matches!(err, HybridError::SubjectNotFound));
    }

    #[test]
    fn test_two_faces_are_rejected() {
        let luma = Array2::<u8>::zeros((50, 50));
        let faces = vec![FaceBox::new(5, 20, 20, 5), FaceBox::new(25, 45, 45, 25)];
        let err = locator(faces).locate(luma.view(), None).unwrap_err();
        assert!(matches!(err, HybridError::UnsupportedMultiSubject { count: 2 }));
    }

    #[test]
    fn test_asymmetric_expansion() {
        let luma = Array2::<u8>::zeros((200, 200));
        // 40 px tall, 50 px wide
        let face = FaceBox::new(100, 110, 140, 60);
        let region = locator(vec![face]).locate_region(luma.view(), None).unwrap();

        assert_eq!(region.top, 100 - 32);
        assert_eq!(region.bottom, 140 + 8);
        assert_eq!(region.left, 60 - 15);
        assert_eq!(region.right, 110 + 15);
    }

    #[test]
    fn test_expansion_is_clipped_to_bounds() {
        let luma = Array2::<u8>::zeros((100, 80));
        let face = FaceBox::new(10, 78, 95, 2);
        let region = locator(vec![face]).locate_region(luma.view(), None).unwrap();

        assert_eq!(region.top, 0);
        assert_eq!(region.left, 0);
        assert_eq!(region.bottom, 100);
        assert_eq!(region.right, 80);
    }

    #[test]
    fn test_min_aspect_ratio_grows_height_evenly() {
        let luma = Array2::<u8>::zeros((400, 400));
        // expands to rows 168..248 (80 tall) and cols 136..264 (128 wide)
        let face = FaceBox::new(200, 240, 240, 160);
        let loc = locator(vec![face]);

        let plain = loc.locate_region(luma.view(), None).unwrap();
        assert_eq!((plain.top, plain.bottom), (168, 248));
        assert_eq!((plain.left, plain.right), (136, 264));

        let padded = loc.locate_region(luma.view(), Some(1.5)).unwrap();
        assert_eq!((padded.left, padded.right), (plain.left, plain.right));
        assert!(padded.aspect_ratio() >= 1.5 - 1e-2);
        let grown_top = plain.top - padded.top;
        let grown_bottom = padded.bottom - plain.bottom;
        assert!((grown_top as i64 - grown_bottom as i64).abs() <= 1);
    }

    #[test]
    fn test_min_aspect_ratio_already_met_is_noop() {
        let luma = Array2::<u8>::zeros((400, 400));
        let face = FaceBox::new(200, 240, 240, 160);
        let loc = locator(vec![face]);

        let plain = loc.locate_region(luma.view(), None).unwrap();
        let constrained = loc.locate_region(luma.view(), Some(0.1)).unwrap();
        assert_eq!(plain, constrained);
    }

    #[test]
    fn test_min_aspect_ratio_stops_at_border() {
        let luma = Array2::<u8>::zeros((60, 200));
        let face = FaceBox::new(20, 150, 40, 50);
        let region = locator(vec![face]).locate_region(luma.view(), Some(3.0)).unwrap();

        assert_eq!(region.top, 0);
        assert_eq!(region.bottom, 60);
    }

    #[test]
    fn test_rejects_bad_aspect_ratio() {
        let luma = Array2::<u8>::zeros((60, 60));
        let face = FaceBox::new(20, 40, 40, 20);
        assert!(matches!(
            locator(vec![face]).locate_region(luma.view(), Some(-1.0)),
            Err(HybridError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_box_outside_image_is_empty() {
        let luma = Array2::<u8>::zeros((60, 60));
        let face = FaceBox::new(200, 300, 260, 240);
        assert!(matches!(
            locator(vec![face]).locate_region(luma.view(), None),
            Err(HybridError::EmptySubjectRegion)
        ));
    }

    #[test]
    fn test_locate_crops_pixels() {
        let luma = Array2::from_shape_fn((100, 100), |(y, x)| ((y + x) % 256) as u8);
        let face = FaceBox::new(40, 70, 60, 30);
        let loc = locator(vec![face]);

        let region = loc.locate_region(luma.view(), None).unwrap();
        let crop = loc.locate(luma.view(), None).unwrap();

        assert_eq!(crop.dim(), (region.height(), region.width()));
        assert_eq!(crop[[0, 0]], luma[[region.top, region.left]]);
    }

    #[test]
    fn test_detector_by_reference() {
        let luma = Array2::<u8>::zeros((60, 60));
        let shared = FixedDetector::single(FaceBox::new(20, 40, 40, 20));
        let first = SubjectLocator::new(&shared).locate_region(luma.view(), None).unwrap();
        let second = SubjectLocator::new(&shared).locate_region(luma.view(), None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_closure_detector_sees_luminance() {
        let luma = Array2::<u8>::from_elem((30, 40), 9);
        let detector = |view: ArrayView2<u8>| -> Result<Vec<FaceBox>> {
            assert_eq!(view.dim(), (30, 40));
            assert_eq!(view[[0, 0]], 9);
            Ok(vec![FaceBox::new(10, 30, 20, 10)])
        };
        let region = SubjectLocator::new(FnDetector(detector))
            .locate_region(luma.view(), None)
            .unwrap();
        assert_eq!(region.top, 2);
    }
}
