//! Error type shared by the filters, the composer and the bindings.

use thiserror::Error;

/// Everything that can abort a hybrid-image pipeline.
///
/// A degenerate (near-zero) frequency kernel is deliberately absent: it is a
/// defined outcome that produces a black image, not a failure.
#[derive(Debug, Error)]
pub enum HybridError {
    /// Filter input is not a non-empty 2-D array.
    #[error("image data must have shape (n, m), got {shape:?}")]
    InvalidShape { shape: Vec<usize> },

    /// Raster channel count other than 1, 3 or 4.
    #[error("expected 1, 3 or 4 channels, got {channels}")]
    InvalidChannels { channels: usize },

    #[error("cannot find a face in the image")]
    SubjectNotFound,

    /// Several faces were detected; choosing one is intentionally unsupported.
    #[error("found {count} faces, only a single face is supported")]
    UnsupportedMultiSubject { count: usize },

    #[error("detected face collapses to an empty region")]
    EmptySubjectRegion,

    #[error("cannot remove {margin} px from each side of a {width}x{height} image")]
    MarginTooLarge {
        margin: usize,
        width: usize,
        height: usize,
    },

    /// The face detection backend itself failed.
    #[error("face detector failed: {0}")]
    Detector(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, HybridError>;
