// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Orientation orchestrator — the fixed-precedence fallback chain.
//
// Steps run in order and the first conclusive one wins:
//
// 1. Script detection: a sideways hint from the backend settles the page.
// 2. Projection pair: row/column variance at 0 and 90 picks {0,180} or
//    {90,270}. Sideways pages are resolved here by confidence fusion, then by
//    projection ratio.
// 3. Upright confidence: fused recognition confidence at 0 against 180.
// 4. Whitespace: top/bottom margin ratio at 0 against 180, outside a dead-zone.
// 5. Default: no rotation.
//
// Higher-precision signals always preempt weaker ones; nothing is averaged.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info, instrument};
use upright_core::{
    Decision, Orientation, Provenance, ScoreResult, Stage, TraceEntry, TuningConfig,
    UprightConfig,
};

use super::signals::{OrientationSignals, PageSignals};
use crate::recognize::{RecognitionAdapter, TesseractRecognizer};
use crate::scan::Preprocessor;

/// Result of one step of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Resolved(Orientation),
    Inconclusive,
}

/// A chain step: reads signals, appends to the trace, maybe resolves.
type Step<S> = fn(&S, &TuningConfig, &mut Vec<TraceEntry>) -> StepOutcome;

/// Shared, immutable decision engine. One instance serves any number of
/// pages, concurrently if needed.
#[derive(Debug, Clone)]
pub struct OrientationEngine {
    tuning: TuningConfig,
    preprocessor: Preprocessor,
    adapter: RecognitionAdapter,
}

impl OrientationEngine {
    pub fn new(tuning: TuningConfig, adapter: RecognitionAdapter) -> Self {
        Self {
            preprocessor: Preprocessor::new(&tuning),
            tuning,
            adapter,
        }
    }

    /// Engine that relies on layout heuristics only.
    pub fn without_recognition(tuning: TuningConfig) -> Self {
        Self::new(tuning, RecognitionAdapter::disabled())
    }

    /// Engine backed by the Tesseract CLI described in `config`. Falls back
    /// to layout heuristics if the CLI cannot be probed.
    pub fn with_tesseract(config: &UprightConfig) -> Self {
        let backend = Arc::new(TesseractRecognizer::new(config.recognition.clone()));
        let adapter = RecognitionAdapter::new(backend, &config.tuning);
        Self::new(config.tuning.clone(), adapter)
    }

    pub fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    pub fn recognition_available(&self) -> bool {
        self.adapter.is_available()
    }

    /// Decide the clockwise rotation that brings `image` upright.
    ///
    /// Never fails: missing signals fall through the chain and genuine
    /// ambiguity (including zero-area input) yields [`Orientation::Deg0`].
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn decide(&self, image: &DynamicImage, lang: Option<&str>) -> Decision {
        if image.width() == 0 || image.height() == 0 {
            debug!("Zero-area image; keeping identity");
            let mut trace = Vec::new();
            return Decision {
                orientation: default_step(&mut trace),
                trace,
            };
        }
        let signals = PageSignals::new(
            image,
            lang,
            &self.tuning,
            &self.preprocessor,
            &self.adapter,
        );
        let decision = decide_with(&signals, &self.tuning);
        info!(
            orientation = %decision.orientation,
            stage = ?decision.resolved_by(),
            "Orientation decided"
        );
        decision
    }

    /// Shorthand for `decide(..).orientation`.
    pub fn decide_orientation(&self, image: &DynamicImage, lang: Option<&str>) -> Orientation {
        self.decide(image, lang).orientation
    }
}

/// Run the chain against any signal source.
pub fn decide_with<S: OrientationSignals + ?Sized>(signals: &S, tuning: &TuningConfig) -> Decision {
    let steps: [Step<S>; 4] = [
        script_detection_step::<S>,
        projection_pair_step::<S>,
        upright_confidence_step::<S>,
        whitespace_step::<S>,
    ];

    let mut trace = Vec::new();
    for step in steps {
        if let StepOutcome::Resolved(orientation) = step(signals, tuning, &mut trace) {
            return Decision { orientation, trace };
        }
    }
    Decision {
        orientation: default_step(&mut trace),
        trace,
    }
}

fn script_detection_step<S: OrientationSignals + ?Sized>(
    signals: &S,
    tuning: &TuningConfig,
    trace: &mut Vec<TraceEntry>,
) -> StepOutcome {
    if !tuning.use_script_detection {
        return StepOutcome::Inconclusive;
    }
    let hint = signals.script_orientation();
    let score = match hint {
        Some(found) => ScoreResult::new(found, Provenance::ScriptDetection, found.degrees() as f64),
        None => ScoreResult::no_signal(Orientation::Deg0, Provenance::ScriptDetection),
    };

    // 0/180 from layout alone is unreliable; only a sideways hint is trusted.
    let sideways = hint.filter(|found| found.is_sideways());
    match sideways {
        Some(found) if !tuning.verify_script_sideways => {
            trace.push(entry(Stage::ScriptDetection, vec![score], Some(found)));
            StepOutcome::Resolved(found)
        }
        Some(_) => {
            trace.push(entry(Stage::ScriptDetection, vec![score], None));
            StepOutcome::Resolved(resolve_sideways(signals, tuning, trace))
        }
        None => {
            trace.push(entry(Stage::ScriptDetection, vec![score], None));
            StepOutcome::Inconclusive
        }
    }
}

fn projection_pair_step<S: OrientationSignals + ?Sized>(
    signals: &S,
    tuning: &TuningConfig,
    trace: &mut Vec<TraceEntry>,
) -> StepOutcome {
    let upright = projection_score(signals, Orientation::Deg0);
    let sideways = projection_score(signals, Orientation::Deg90);
    debug!(upright = upright.value, sideways = sideways.value, "Projection pair");

    // 0/180 and 90/270 share their variance character, so two renderings
    // are enough to pick the pair.
    trace.push(entry(Stage::ProjectionPair, vec![upright, sideways], None));
    if upright.value >= sideways.value {
        StepOutcome::Inconclusive
    } else {
        StepOutcome::Resolved(resolve_sideways(signals, tuning, trace))
    }
}

fn upright_confidence_step<S: OrientationSignals + ?Sized>(
    signals: &S,
    tuning: &TuningConfig,
    trace: &mut Vec<TraceEntry>,
) -> StepOutcome {
    let upright = confidence_score(signals, Orientation::Deg0, tuning);
    let flipped = confidence_score(signals, Orientation::Deg180, tuning);
    debug!(upright = upright.value, flipped = flipped.value, "Upright confidence");

    let resolved = if (upright.is_valid() || flipped.is_valid()) && upright.value != flipped.value {
        Some(if upright.value > flipped.value {
            Orientation::Deg0
        } else {
            Orientation::Deg180
        })
    } else {
        None
    };
    trace.push(entry(Stage::UprightConfidence, vec![upright, flipped], resolved));
    resolved.map_or(StepOutcome::Inconclusive, StepOutcome::Resolved)
}

fn whitespace_step<S: OrientationSignals + ?Sized>(
    signals: &S,
    tuning: &TuningConfig,
    trace: &mut Vec<TraceEntry>,
) -> StepOutcome {
    let upright = whitespace_score(signals, Orientation::Deg0);
    let flipped = whitespace_score(signals, Orientation::Deg180);
    debug!(upright = upright.value, flipped = flipped.value, "Whitespace ratios");

    let resolved = if upright.is_valid()
        && flipped.is_valid()
        && (upright.value - flipped.value).abs() > tuning.whitespace_dead_zone
    {
        Some(if upright.value < flipped.value {
            Orientation::Deg0
        } else {
            Orientation::Deg180
        })
    } else {
        None
    };
    trace.push(entry(Stage::Whitespace, vec![upright, flipped], resolved));
    resolved.map_or(StepOutcome::Inconclusive, StepOutcome::Resolved)
}

/// Leaving a page alone is cheaper to get wrong than flipping it.
fn default_step(trace: &mut Vec<TraceEntry>) -> Orientation {
    trace.push(entry(Stage::Default, Vec::new(), Some(Orientation::Deg0)));
    Orientation::Deg0
}

/// Pick 90 or 270: confidence fusion first, projection ratio otherwise.
/// Ties go to 90.
fn resolve_sideways<S: OrientationSignals + ?Sized>(
    signals: &S,
    tuning: &TuningConfig,
    trace: &mut Vec<TraceEntry>,
) -> Orientation {
    let cw = confidence_score(signals, Orientation::Deg90, tuning);
    let ccw = confidence_score(signals, Orientation::Deg270, tuning);
    if cw.is_valid() || ccw.is_valid() {
        let pick = if cw.value >= ccw.value {
            Orientation::Deg90
        } else {
            Orientation::Deg270
        };
        trace.push(entry(Stage::SidewaysConfidence, vec![cw, ccw], Some(pick)));
        return pick;
    }
    trace.push(entry(Stage::SidewaysConfidence, vec![cw, ccw], None));

    let cw = projection_score(signals, Orientation::Deg90);
    let ccw = projection_score(signals, Orientation::Deg270);
    let pick = if cw.value >= ccw.value {
        Orientation::Deg90
    } else {
        Orientation::Deg270
    };
    trace.push(entry(Stage::SidewaysProjection, vec![cw, ccw], Some(pick)));
    pick
}

fn projection_score<S: OrientationSignals + ?Sized>(signals: &S, candidate: Orientation) -> ScoreResult {
    ScoreResult::new(candidate, Provenance::Projection, signals.projection_ratio(candidate))
}

fn confidence_score<S: OrientationSignals + ?Sized>(
    signals: &S,
    candidate: Orientation,
    tuning: &TuningConfig,
) -> ScoreResult {
    let sample = signals.confidence(candidate);
    if !sample.is_available() {
        return ScoreResult::no_signal(candidate, Provenance::Confidence);
    }
    ScoreResult::new(
        candidate,
        Provenance::Confidence,
        sample.fused(tuning.confidence_bonus_weight),
    )
}

fn whitespace_score<S: OrientationSignals + ?Sized>(signals: &S, candidate: Orientation) -> ScoreResult {
    match signals.whitespace_ratio(candidate) {
        Some(ratio) => ScoreResult::new(candidate, Provenance::Whitespace, ratio),
        None => ScoreResult::no_signal(candidate, Provenance::Whitespace),
    }
}

fn entry(stage: Stage, scores: Vec<ScoreResult>, resolved: Option<Orientation>) -> TraceEntry {
    TraceEntry {
        stage,
        scores,
        resolved,
    }
}
