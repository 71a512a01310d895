// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition adapter — capability-gated access to an external OCR engine.
//
// The engine is consumed through two operations only: a coarse
// script-orientation guess and per-token confidence scoring. Backends
// implement [`Recognizer`]; the [`RecognitionAdapter`] probes the backend once
// and turns every failure (absent binary, crash, timeout, garbage output) into
// an explicit "no signal" value, so call sites never branch on availability.

pub mod tesseract;

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info, warn};
use upright_core::error::Result;
use upright_core::{Orientation, TuningConfig};

use crate::image::ImageProcessor;

pub use tesseract::TesseractRecognizer;

/// One token reported by a recognition backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedToken {
    pub text: String,
    /// Backend confidence in `[0, 100]`; non-positive values mean "not scored".
    pub confidence: f64,
}

/// A pluggable OCR backend.
///
/// Implementations may fail freely; the adapter absorbs every error.
pub trait Recognizer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Whether the backend can be used at all. Called once per adapter.
    fn probe(&self) -> bool;

    /// The backend's own layout-based guess at the clockwise rotation needed.
    fn detect_script_orientation(&self, image: &DynamicImage) -> Result<Option<Orientation>>;

    /// Recognise text, returning every token with its confidence.
    fn recognize(&self, image: &DynamicImage, lang: Option<&str>) -> Result<Vec<RecognizedToken>>;
}

/// Mean per-token confidence and alphanumeric symbol count for one rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceSample {
    /// Mean confidence in `[0, 100]`, or `-1.0` when there is no evidence.
    pub mean_confidence: f64,
    pub recognized_count: u32,
}

impl ConfidenceSample {
    /// Sentinel for "capability absent or recognition failed".
    pub const UNAVAILABLE: ConfidenceSample = ConfidenceSample {
        mean_confidence: -1.0,
        recognized_count: 0,
    };

    /// Aggregate backend tokens. Tokens with a non-positive confidence are
    /// ignored; of the rest, only tokens holding at least one alphanumeric
    /// character contribute to the mean and to the symbol count.
    pub fn from_tokens(tokens: &[RecognizedToken]) -> Self {
        let mut sum = 0.0;
        let mut scored = 0usize;
        let mut recognized_count = 0u32;
        for token in tokens {
            if !(token.confidence > 0.0) {
                continue;
            }
            let alnum = token.text.chars().filter(|c| c.is_alphanumeric()).count() as u32;
            if alnum == 0 {
                continue;
            }
            sum += token.confidence;
            scored += 1;
            recognized_count += alnum;
        }
        if scored == 0 {
            return Self::UNAVAILABLE;
        }
        Self {
            mean_confidence: sum / scored as f64,
            recognized_count,
        }
    }

    pub fn is_available(&self) -> bool {
        self.mean_confidence >= 0.0
    }

    /// Confidence fusion: `mean + weight * ln(1 + count)`, or `-inf` when
    /// there is no evidence.
    pub fn fused(&self, bonus_weight: f64) -> f64 {
        if !self.is_available() {
            return f64::NEG_INFINITY;
        }
        self.mean_confidence + bonus_weight * (self.recognized_count as f64).ln_1p()
    }
}

/// Availability-probed front for an optional [`Recognizer`].
#[derive(Clone)]
pub struct RecognitionAdapter {
    backend: Option<Arc<dyn Recognizer>>,
    recognition_min_dimension: u32,
    script_detection_max_dimension: u32,
}

impl std::fmt::Debug for RecognitionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionAdapter")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

impl RecognitionAdapter {
    /// Wrap `backend`, probing it once. An unusable backend leaves the
    /// adapter permanently disabled.
    pub fn new(backend: Arc<dyn Recognizer>, tuning: &TuningConfig) -> Self {
        let available = backend.probe();
        if available {
            info!(backend = backend.name(), "Recognition backend available");
        } else {
            warn!(
                backend = backend.name(),
                "Recognition backend unavailable; falling back to layout heuristics"
            );
        }
        Self {
            backend: available.then_some(backend),
            recognition_min_dimension: tuning.recognition_min_dimension,
            script_detection_max_dimension: tuning.script_detection_max_dimension,
        }
    }

    /// An adapter with no backend: every call reports "no signal".
    pub fn disabled() -> Self {
        let tuning = TuningConfig::default();
        Self {
            backend: None,
            recognition_min_dimension: tuning.recognition_min_dimension,
            script_detection_max_dimension: tuning.script_detection_max_dimension,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Coarse orientation hint, `None` when absent or failed.
    pub fn detect_script_orientation(&self, image: &DynamicImage) -> Option<Orientation> {
        let backend = self.backend.as_ref()?;
        let prepared = ImageProcessor::from_dynamic(image.clone())
            .fit_within(self.script_detection_max_dimension)
            .into_dynamic();
        match backend.detect_script_orientation(&prepared) {
            Ok(found) => {
                debug!(backend = backend.name(), orientation = ?found, "Script orientation");
                found
            }
            Err(err) => {
                log_downgrade(backend.name(), "script detection", &err);
                None
            }
        }
    }

    /// Confidence sample for one rendering, [`ConfidenceSample::UNAVAILABLE`]
    /// when absent or failed. `lang` is passed through untouched.
    pub fn score_confidence(&self, image: &DynamicImage, lang: Option<&str>) -> ConfidenceSample {
        let Some(backend) = self.backend.as_ref() else {
            return ConfidenceSample::UNAVAILABLE;
        };
        let prepared = ImageProcessor::from_dynamic(image.clone())
            .enlarge_to(self.recognition_min_dimension)
            .into_dynamic();
        match backend.recognize(&prepared, lang) {
            Ok(tokens) => {
                let sample = ConfidenceSample::from_tokens(&tokens);
                debug!(
                    backend = backend.name(),
                    tokens = tokens.len(),
                    mean = sample.mean_confidence,
                    count = sample.recognized_count,
                    "Confidence scored"
                );
                sample
            }
            Err(err) => {
                log_downgrade(backend.name(), "confidence scoring", &err);
                ConfidenceSample::UNAVAILABLE
            }
        }
    }
}

fn log_downgrade(backend: &str, operation: &str, err: &upright_core::UprightError) {
    if err.is_unavailable() {
        debug!(backend, operation, error = %err, "Recognition signal unavailable");
    } else {
        warn!(backend, operation, error = %err, "Recognition failed; treating as no signal");
    }
}
