// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page signal sources consumed by the decision chain.

use std::cell::OnceCell;

use image::DynamicImage;
use tracing::debug;
use upright_core::{Orientation, TuningConfig};

use crate::image::{ImageProcessor, rotated};
use crate::recognize::{ConfidenceSample, RecognitionAdapter};
use crate::scan::{BinaryMask, Preprocessor, top_bottom_ratio, variance_ratio};

/// Everything the decision chain may ask about one page, per candidate.
///
/// A candidate's measurement is always taken on the page rotated clockwise by
/// that candidate, i.e. on the page as it would look after the correction.
pub trait OrientationSignals {
    /// The recognition backend's own rotation guess.
    fn script_orientation(&self) -> Option<Orientation>;

    /// Projection variance ratio of the candidate rendering.
    fn projection_ratio(&self, candidate: Orientation) -> f64;

    /// Recognition confidence of the candidate rendering.
    fn confidence(&self, candidate: Orientation) -> ConfidenceSample;

    /// Top/bottom whitespace ratio, `None` when the rendering has no content rows.
    fn whitespace_ratio(&self, candidate: Orientation) -> Option<f64>;
}

/// Signals measured from a real page.
///
/// Renderings, masks and scores are computed on first use and cached, so a
/// candidate consulted by two steps is only rendered once. Each rendering is a
/// fresh buffer; the source page is never modified.
pub struct PageSignals<'a> {
    source: &'a DynamicImage,
    lang: Option<&'a str>,
    tuning: &'a TuningConfig,
    preprocessor: &'a Preprocessor,
    adapter: &'a RecognitionAdapter,
    working: OnceCell<DynamicImage>,
    renderings: [OnceCell<DynamicImage>; 4],
    projection: [OnceCell<f64>; 4],
    confidence: [OnceCell<ConfidenceSample>; 4],
}

impl<'a> PageSignals<'a> {
    pub fn new(
        source: &'a DynamicImage,
        lang: Option<&'a str>,
        tuning: &'a TuningConfig,
        preprocessor: &'a Preprocessor,
        adapter: &'a RecognitionAdapter,
    ) -> Self {
        Self {
            source,
            lang,
            tuning,
            preprocessor,
            adapter,
            working: OnceCell::new(),
            renderings: Default::default(),
            projection: Default::default(),
            confidence: Default::default(),
        }
    }

    /// Downscaled copy used for projection scoring.
    fn working(&self) -> &DynamicImage {
        self.working.get_or_init(|| {
            ImageProcessor::from_dynamic(self.source.clone())
                .fit_within(self.tuning.analysis_max_dimension)
                .into_dynamic()
        })
    }

    /// Full-resolution rendering of `candidate`.
    fn rendering(&self, candidate: Orientation) -> &DynamicImage {
        self.renderings[candidate.index()].get_or_init(|| rotated(self.source, candidate))
    }

    fn mask(&self, image: &DynamicImage) -> BinaryMask {
        self.preprocessor.prepare(image)
    }
}

impl OrientationSignals for PageSignals<'_> {
    fn script_orientation(&self) -> Option<Orientation> {
        self.adapter.detect_script_orientation(self.source)
    }

    fn projection_ratio(&self, candidate: Orientation) -> f64 {
        *self.projection[candidate.index()].get_or_init(|| {
            let rendering = rotated(self.working(), candidate);
            let ratio = variance_ratio(&self.mask(&rendering), self.tuning.projection_epsilon);
            debug!(candidate = %candidate, ratio, "Projection ratio");
            ratio
        })
    }

    fn confidence(&self, candidate: Orientation) -> ConfidenceSample {
        if !self.adapter.is_available() {
            return ConfidenceSample::UNAVAILABLE;
        }
        *self.confidence[candidate.index()]
            .get_or_init(|| self.adapter.score_confidence(self.rendering(candidate), self.lang))
    }

    fn whitespace_ratio(&self, candidate: Orientation) -> Option<f64> {
        let ratio = top_bottom_ratio(&self.mask(self.rendering(candidate)), self.tuning);
        debug!(candidate = %candidate, ratio = ?ratio, "Whitespace ratio");
        ratio
    }
}
