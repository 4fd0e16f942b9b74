//! Hybrid-image settings, loadable from TOML.
//!
//! ```toml
//! sigma = 0.002
//! alpha = 0.5
//! ignore_faces = false
//! crop_margin = 15
//! ```
//!
//! Missing keys fall back to [`HybridConfig::default`].

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{HybridError, Result};

/// Parameters of one hybrid merge.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HybridConfig {
    /// Soft cut-off of both Gaussian masks.
    pub sigma: f64,
    /// Weight of the high-pass image in the final blend.
    pub alpha: f64,
    /// Filter whole frames instead of cropping to the detected faces.
    pub ignore_faces: bool,
    /// Pixels removed from every side of both branches before blending.
    pub crop_margin: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            sigma: Emphasis::Balanced.sigma(),
            alpha: 0.5,
            ignore_faces: false,
            crop_margin: 15,
        }
    }
}

impl HybridConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(HybridError::InvalidParameter(format!(
                "sigma must be a positive number, got {}",
                self.sigma
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(HybridError::InvalidParameter(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }

    pub fn with_emphasis(mut self, emphasis: Emphasis) -> Self {
        self.sigma = emphasis.sigma();
        self
    }
}

/// Which of the two images should dominate the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emphasis {
    Far,
    #[default]
    Balanced,
    Near,
}

impl Emphasis {
    pub fn sigma(self) -> f64 {
        match self {
            Emphasis::Far => 0.005,
            Emphasis::Balanced => 0.002,
            Emphasis::Near => 0.0005,
        }
    }
}

impl FromStr for Emphasis {
    type Err = HybridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "far" => Ok(Emphasis::Far),
            "balanced" => Ok(Emphasis::Balanced),
            "near" => Ok(Emphasis::Near),
            other => Err(HybridError::InvalidParameter(format!(
                "unknown emphasis {other:?}, expected far, balanced or near"
            ))),
        }
    }
}
