//! Canvas helpers used when combining two filtered branches.
//!
//! - border trimming (drops convolution artifacts along the edges)
//! - aspect-preserving bicubic resize onto a fixed-size black canvas
//! - per-channel alpha blending

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Zip};

use crate::error::{HybridError, Result};

/// Free parameter of the cubic convolution kernel (Catmull-Rom).
const BICUBIC_A: f64 = -0.5;

/// Remove `margin` pixels from every side.
///
/// # Arguments
/// * `image` - Image of shape (height, width, channels)
/// * `margin` - Pixels to drop on each side
///
/// # Returns
/// Image of shape (height - 2·margin, width - 2·margin, channels); fails when
/// nothing would remain.
pub fn trim_border(image: ArrayView3<u8>, margin: usize) -> Result<Array3<u8>> {
    let (height, width, _) = image.dim();
    let fits = margin
        .checked_mul(2)
        .is_some_and(|both| both < height && both < width);
    if !fits {
        return Err(HybridError::MarginTooLarge {
            margin,
            width,
            height,
        });
    }

    Ok(image
        .slice(s![margin..height - margin, margin..width - margin, ..])
        .to_owned())
}

#[inline]
fn bicubic(x: f64) -> f64 {
    let x = x.abs();
    if x < 1.0 {
        ((BICUBIC_A + 2.0) * x - (BICUBIC_A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        (((x - 5.0) * x + 8.0) * x - 4.0) * BICUBIC_A
    } else {
        0.0
    }
}

/// First source index and normalised taps for every output sample.
///
/// The kernel is widened by the scale factor when shrinking, so downscaling
/// averages instead of skipping pixels.
fn resample_taps(in_size: usize, out_size: usize) -> Vec<(usize, Vec<f64>)> {
    let scale = in_size as f64 / out_size as f64;
    let filter_scale = scale.max(1.0);
    let support = 2.0 * filter_scale;

    (0..out_size)
        .map(|i| {
            let center = (i as f64 + 0.5) * scale;
            let start = (center - support + 0.5).floor().max(0.0) as usize;
            let end = ((center + support + 0.5).floor() as usize).min(in_size);

            let mut weights: Vec<f64> = (start..end)
                .map(|j| bicubic((j as f64 - center + 0.5) / filter_scale))
                .collect();
            let total: f64 = weights.iter().sum();
            if total != 0.0 {
                weights.iter_mut().for_each(|w| *w /= total);
            }
            (start, weights)
        })
        .collect()
}

/// Separable bicubic resize of single-channel data to `size` = (height, width).
pub fn resize_bicubic(src: ArrayView2<f64>, size: (usize, usize)) -> Array2<f64> {
    let (src_h, src_w) = src.dim();
    let (dst_h, dst_w) = size;
    if src_h == 0 || src_w == 0 || dst_h == 0 || dst_w == 0 {
        return Array2::zeros(size);
    }

    let col_taps = resample_taps(src_w, dst_w);
    let row_taps = resample_taps(src_h, dst_h);

    let mut horizontal = Array2::<f64>::zeros((src_h, dst_w));
    for y in 0..src_h {
        for (x, (start, weights)) in col_taps.iter().enumerate() {
            horizontal[[y, x]] = weights
                .iter()
                .enumerate()
                .map(|(k, w)| src[[y, start + k]] * w)
                .sum();
        }
    }

    let mut output = Array2::<f64>::zeros(size);
    for (y, (start, weights)) in row_taps.iter().enumerate() {
        for x in 0..dst_w {
            output[[y, x]] = weights
                .iter()
                .enumerate()
                .map(|(k, w)| horizontal[[start + k, x]] * w)
                .sum();
        }
    }

    output
}

/// Fit `src` into `size` = (height, width) without distortion.
///
/// The content is scaled to touch the canvas on one axis and centred on the
/// other, with sizes and offsets rounded half to even; the rest of the
/// canvas is black. Matching aspect ratios resize straight to `size`.
pub fn fit_and_pad(src: ArrayView2<f64>, size: (usize, usize)) -> Array2<f64> {
    let (src_h, src_w) = src.dim();
    let (dst_h, dst_w) = size;
    if src_h == 0 || src_w == 0 || dst_h == 0 || dst_w == 0 {
        return Array2::zeros(size);
    }

    let src_ratio = src_w as f64 / src_h as f64;
    let dst_ratio = dst_w as f64 / dst_h as f64;

    // cross-multiplied so equal ratios compare exactly
    let (fit_h, fit_w) = match (src_w * dst_h).cmp(&(dst_w * src_h)) {
        std::cmp::Ordering::Equal => (dst_h, dst_w),
        std::cmp::Ordering::Greater => {
            let h = ((dst_w as f64 / src_ratio).round_ties_even() as usize).clamp(1, dst_h);
            (h, dst_w)
        }
        std::cmp::Ordering::Less => {
            let w = ((dst_h as f64 * src_ratio).round_ties_even() as usize).clamp(1, dst_w);
            (dst_h, w)
        }
    };
    log::debug!(
        "fitting {}x{} into {}x{} as {}x{} (ratio {:.3} -> {:.3})",
        src_w,
        src_h,
        dst_w,
        dst_h,
        fit_w,
        fit_h,
        src_ratio,
        dst_ratio
    );

    let resized = resize_bicubic(src, (fit_h, fit_w));
    let mut canvas = Array2::<f64>::zeros(size);
    let off_y = ((dst_h - fit_h) as f64 * 0.5).round_ties_even() as usize;
    let off_x = ((dst_w - fit_w) as f64 * 0.5).round_ties_even() as usize;
    canvas
        .slice_mut(s![off_y..off_y + fit_h, off_x..off_x + fit_w])
        .assign(&resized);

    canvas
}

/// `(1 - alpha) * base + alpha * overlay` on every channel, including alpha.
pub fn blend(base: ArrayView3<u8>, overlay: ArrayView3<u8>, alpha: f64) -> Result<Array3<u8>> {
    if base.dim() != overlay.dim() {
        return Err(HybridError::InvalidParameter(format!(
            "cannot blend images of shape {:?} and {:?}",
            base.dim(),
            overlay.dim()
        )));
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(HybridError::InvalidParameter(format!(
            "alpha must be within [0, 1], got {alpha}"
        )));
    }

    let mut output = Array3::<u8>::zeros(base.raw_dim());
    Zip::from(&mut output)
        .and(&base)
        .and(&overlay)
        .for_each(|out, &b, &o| {
            let v = (1.0 - alpha) * b as f64 + alpha * o as f64;
            *out = v.round().clamp(0.0, 255.0) as u8;
        });

    Ok(output)
}
