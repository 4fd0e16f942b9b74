//! WebAssembly exports for hybrid-image filters.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! All buffers are flat RGBA u8 (length = width * height * 4), the layout of
//! `ImageData.data`. Results are RGBA as well. Face detection is not
//! available in the browser build; callers pass face boxes found by a
//! JavaScript detector instead.

use std::sync::Arc;

use ndarray::Array3;
use wasm_bindgen::prelude::*;

use crate::compose::HybridComposer;
use crate::config::HybridConfig;
use crate::error::{HybridError, Result};
use crate::filters::spectral::SpectralFilter;
use crate::filters::subject::{FaceBox, FixedDetector};

fn rgba_from_slice(data: &[u8], width: usize, height: usize) -> Result<Array3<u8>> {
    Array3::from_shape_vec((height, width, 4), data.to_vec()).map_err(|_| {
        HybridError::InvalidParameter(format!(
            "expected {} bytes for a {width}x{height} RGBA image, got {}",
            width * height * 4,
            data.len()
        ))
    })
}

/// `[top, right, bottom, left]`, or empty for no box.
fn face_from_slice(face: &[i32]) -> Result<Option<FaceBox>> {
    match face {
        [] => Ok(None),
        &[top, right, bottom, left] => Ok(Some(FaceBox::new(
            top as i64,
            right as i64,
            bottom as i64,
            left as i64,
        ))),
        _ => Err(HybridError::InvalidParameter(format!(
            "face box needs 4 values (top, right, bottom, left), got {}",
            face.len()
        ))),
    }
}

// ============================================================================
// Whole-frame Filters
// ============================================================================

/// Low-pass filter the luminance of an RGBA image.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `sigma` - Soft cut-off of the Gaussian mask
///
/// # Returns
/// Flat array of opaque RGBA bytes with the filtered luminance
#[wasm_bindgen]
pub fn low_pass_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    sigma: f64,
) -> std::result::Result<Vec<u8>, JsError> {
    let input = rgba_from_slice(data, width, height)?;
    let result = SpectralFilter::low_pass(sigma)?.apply(input.view())?;
    Ok(result.into_raw_vec_and_offset().0)
}

/// High-pass filter the luminance of an RGBA image.
#[wasm_bindgen]
pub fn high_pass_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    sigma: f64,
) -> std::result::Result<Vec<u8>, JsError> {
    let input = rgba_from_slice(data, width, height)?;
    let result = SpectralFilter::high_pass(sigma)?.apply(input.view())?;
    Ok(result.into_raw_vec_and_offset().0)
}

// ============================================================================
// Hybrid Merge
// ============================================================================

/// Blend the low-passed `far` image with the high-passed `near` image.
///
/// With both face boxes empty the whole frames are filtered. With both
/// given as `[top, right, bottom, left]` each image is cropped to its face
/// first. The output size is that of the trimmed far image, which differs
/// from the inputs, so it is returned as `[width, height, ...rgba]`.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn hybrid_merge_rgba_wasm(
    far: &[u8],
    far_width: usize,
    far_height: usize,
    near: &[u8],
    near_width: usize,
    near_height: usize,
    sigma: f64,
    alpha: f64,
    crop_margin: usize,
    far_face: &[i32],
    near_face: &[i32],
) -> std::result::Result<Vec<u32>, JsError> {
    let far = rgba_from_slice(far, far_width, far_height)?;
    let near = rgba_from_slice(near, near_width, near_height)?;

    let (far_detector, near_detector, ignore_faces) =
        match (face_from_slice(far_face)?, face_from_slice(near_face)?) {
            (None, None) => (FixedDetector::default(), FixedDetector::default(), true),
            (Some(far_box), Some(near_box)) => (
                FixedDetector::single(far_box),
                FixedDetector::single(near_box),
                false,
            ),
            _ => {
                return Err(JsError::new(
                    "face boxes must be given for both images or for neither",
                ))
            }
        };

    let config = HybridConfig {
        sigma,
        alpha,
        ignore_faces,
        crop_margin,
    };
    let result = HybridComposer::with_detectors(
        config,
        Arc::new(far_detector),
        Arc::new(near_detector),
    )?
    .compose(far.view(), near.view())?;

    let (height, width, _) = result.dim();
    let mut output = Vec::with_capacity(2 + result.len());
    output.push(width as u32);
    output.push(height as u32);
    output.extend(result.iter().map(|&v| v as u32));
    Ok(output)
}
