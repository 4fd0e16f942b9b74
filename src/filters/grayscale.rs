//! Luminance conversion between rasters and single-channel arrays.
//!
//! Filtering only ever sees one channel. Rasters enter as `(height, width,
//! channels)` u8 arrays with 1, 3 or 4 channels and are reduced to luminance
//! using ITU-R 601-2 coefficients; alpha is ignored. Filtered `f64` data goes
//! back out as opaque RGBA with R=G=B so two branches can be alpha-blended.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use crate::error::{HybridError, Result};

/// ITU-R 601-2 luma coefficients
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Reduce a gray, RGB or RGBA u8 raster to a single luminance channel.
///
/// # Arguments
/// * `input` - 3D array view of shape (height, width, channels), channels in {1, 3, 4}
///
/// # Returns
/// (height, width) luminance array, 0-255
pub fn luminance_u8(input: ArrayView3<u8>) -> Result<Array2<u8>> {
    let (height, width, channels) = input.dim();
    let mut output = Array2::<u8>::zeros((height, width));

    match channels {
        1 => {
            for y in 0..height {
                for x in 0..width {
                    output[[y, x]] = input[[y, x, 0]];
                }
            }
        }
        3 | 4 => {
            for y in 0..height {
                for x in 0..width {
                    let r = input[[y, x, 0]] as f64;
                    let g = input[[y, x, 1]] as f64;
                    let b = input[[y, x, 2]] as f64;

                    let gray = LUMA_R * r + LUMA_G * g + LUMA_B * b;
                    output[[y, x]] = gray.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        _ => return Err(HybridError::InvalidChannels { channels }),
    }

    Ok(output)
}

/// Luminance as real-valued samples, ready for spectral filtering.
pub fn luminance_f64(input: ArrayView3<u8>) -> Result<Array2<f64>> {
    Ok(luminance_u8(input)?.mapv(f64::from))
}

/// Convert real-valued filter output to an opaque RGBA raster.
///
/// Values are rounded and clamped to 0-255 and written to R, G and B.
pub fn gray_to_rgba(data: ArrayView2<f64>) -> Array3<u8> {
    let (height, width) = data.dim();
    let mut output = Array3::<u8>::zeros((height, width, 4));

    for y in 0..height {
        for x in 0..width {
            let v = data[[y, x]].round().clamp(0.0, 255.0) as u8;
            output[[y, x, 0]] = v;
            output[[y, x, 1]] = v;
            output[[y, x, 2]] = v;
            output[[y, x, 3]] = 255;
        }
    }

    output
}
