//! Filter modules for hybrid-image construction.
//!
//! ## Supported Formats
//!
//! Rasters are `(height, width, channels)` u8 arrays:
//!
//! | Format | Shape | Description |
//! |--------|-------|-------------|
//! | Grayscale8 | (H, W, 1) | Single luminance channel, 0-255 |
//! | RGB8 | (H, W, 3) | Red, green, blue, 0-255 |
//! | RGBA8 | (H, W, 4) | RGB + alpha, 0-255 |
//!
//! Filtering always runs on the luminance of the input and always returns
//! opaque RGBA, so two results can be alpha-blended.
//!
//! ## Modules
//!
//! - **grayscale**: luminance reduction and RGBA re-expansion
//! - **kernel**: Gaussian frequency masks, shift matrix, per-shape cache
//! - **spectral**: padded FFT convolution (whole frame)
//! - **subject**: face detector seam and crop-region logic
//! - **face**: face-aware filtering, region selection
//! - **geometry**: trimming, resize-and-pad, blending

pub mod face;
pub mod geometry;
pub mod grayscale;
pub mod kernel;
pub mod spectral;
pub mod subject;
