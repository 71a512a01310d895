// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.
//
// The numeric constants below were tuned by hand on scanned pages; they have no
// closed-form derivation, so every one of them is exposed for override.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UprightError};

/// How the local (adaptive) threshold computes its neighbourhood mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptiveMethod {
    /// Gaussian-weighted mean, sigma derived from the block size.
    Gaussian,
    /// Unweighted box mean from a summed-area table.
    Mean,
}

/// Thresholds and weights used by the scorers and the fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Added to the vertical-profile variance before dividing.
    pub projection_epsilon: f64,
    /// Added to the bottom margin before dividing.
    pub whitespace_epsilon: f64,
    /// Whitespace ratios closer than this are a tie.
    pub whitespace_dead_zone: f64,
    /// Weight of the `ln(1 + count)` bonus in confidence fusion.
    pub confidence_bonus_weight: f64,
    /// Sigma of the denoising blur (0.8 matches a 3x3 Gaussian kernel).
    pub blur_sigma: f32,
    /// Side of the adaptive-threshold neighbourhood, in pixels. Odd, >= 3.
    pub adaptive_block_size: u32,
    /// How far above the local mean a pixel must be to count as ink.
    pub adaptive_bias: i32,
    pub adaptive_method: AdaptiveMethod,
    /// A row is ink when its foreground count exceeds
    /// `max(noise_floor_min, noise_floor_fraction * width)`.
    pub noise_floor_fraction: f64,
    pub noise_floor_min: u32,
    /// Long side of the working copy used for Stage A.
    pub analysis_max_dimension: u32,
    /// Renderings shorter than this (long side) are upscaled before recognition.
    pub recognition_min_dimension: u32,
    /// Renderings longer than this (long side) are downscaled before script detection.
    pub script_detection_max_dimension: u32,
    /// Consult the backend's script-orientation guess before Stage A.
    pub use_script_detection: bool,
    /// When the script guess says sideways, re-check 90 against 270 with
    /// confidence fusion instead of returning the guess as-is.
    pub verify_script_sideways: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            projection_epsilon: 1e-9,
            whitespace_epsilon: 1e-6,
            whitespace_dead_zone: 0.05,
            confidence_bonus_weight: 0.05,
            blur_sigma: 0.8,
            adaptive_block_size: 35,
            adaptive_bias: 15,
            adaptive_method: AdaptiveMethod::Gaussian,
            noise_floor_fraction: 0.01,
            noise_floor_min: 10,
            analysis_max_dimension: 1600,
            recognition_min_dimension: 900,
            script_detection_max_dimension: 2000,
            use_script_detection: true,
            verify_script_sideways: false,
        }
    }
}

impl TuningConfig {
    /// Reject values the scorers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.projection_epsilon > 0.0) || !(self.whitespace_epsilon > 0.0) {
            return Err(UprightError::Config(
                "epsilons must be strictly positive".into(),
            ));
        }
        if !(self.whitespace_dead_zone >= 0.0) {
            return Err(UprightError::Config(format!(
                "whitespace_dead_zone must be >= 0, got {}",
                self.whitespace_dead_zone
            )));
        }
        if !(self.confidence_bonus_weight >= 0.0) {
            return Err(UprightError::Config(format!(
                "confidence_bonus_weight must be >= 0, got {}",
                self.confidence_bonus_weight
            )));
        }
        if !(self.blur_sigma > 0.0) {
            return Err(UprightError::Config(format!(
                "blur_sigma must be > 0, got {}",
                self.blur_sigma
            )));
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(UprightError::Config(format!(
                "adaptive_block_size must be odd and >= 3, got {}",
                self.adaptive_block_size
            )));
        }
        if !(0.0..=1.0).contains(&self.noise_floor_fraction) {
            return Err(UprightError::Config(format!(
                "noise_floor_fraction must be within [0, 1], got {}",
                self.noise_floor_fraction
            )));
        }
        if self.analysis_max_dimension == 0
            || self.recognition_min_dimension == 0
            || self.script_detection_max_dimension == 0
        {
            return Err(UprightError::Config(
                "working dimensions must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Sigma of the Gaussian-weighted local mean, following the usual
    /// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule for a `k`-wide kernel.
    pub fn adaptive_sigma(&self) -> f32 {
        let k = self.adaptive_block_size as f32;
        0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
    }
}

/// Settings for the external recognition backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Executable name or path of the Tesseract CLI.
    pub command: String,
    /// Wall-clock budget per backend invocation; exceeding it counts as "unavailable".
    pub timeout_ms: u64,
    /// Optional `--psm` override for confidence scoring.
    pub page_segmentation_mode: Option<u8>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".into(),
            timeout_ms: 30_000,
            page_segmentation_mode: None,
        }
    }
}

/// Everything a caller can put in a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UprightConfig {
    pub tuning: TuningConfig,
    pub recognition: RecognitionConfig,
}

impl UprightConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: UprightConfig = serde_json::from_str(&raw)?;
        config.tuning.validate()?;
        Ok(config)
    }
}
