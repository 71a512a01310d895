// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Upright orientation engine.

use serde::{Deserialize, Serialize};

/// Clockwise rotation needed to bring a page upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    /// All four candidates, in clockwise order.
    pub const ALL: [Orientation; 4] = [
        Orientation::Deg0,
        Orientation::Deg90,
        Orientation::Deg180,
        Orientation::Deg270,
    ];

    /// Clockwise degrees (0, 90, 180 or 270).
    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }

    /// Map any multiple of 90 (negative values included) onto a candidate.
    /// Returns `None` for angles that are not quarter turns.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Orientation::Deg0),
            90 => Some(Orientation::Deg90),
            180 => Some(Orientation::Deg180),
            270 => Some(Orientation::Deg270),
            _ => None,
        }
    }

    /// Index into per-candidate tables.
    pub fn index(self) -> usize {
        self.degrees() as usize / 90
    }

    /// True for the {90, 270} partition.
    pub fn is_sideways(self) -> bool {
        matches!(self, Orientation::Deg90 | Orientation::Deg270)
    }

    /// Rotation applied after `self`, i.e. `(self + other) mod 360`.
    pub fn then(self, other: Orientation) -> Orientation {
        Self::ALL[(self.index() + other.index()) % 4]
    }

    /// The candidate half a turn away.
    pub fn flipped(self) -> Orientation {
        self.then(Orientation::Deg180)
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Which scorer produced a [`ScoreResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Projection variance ratio (Stage A and the sideways fallback).
    Projection,
    /// Fused recognition confidence.
    Confidence,
    /// Top/bottom whitespace ratio.
    Whitespace,
    /// The recognition backend's own layout-based orientation guess.
    ScriptDetection,
}

/// A single scorer output for one candidate.
///
/// Invalid results carry `f64::NEG_INFINITY` so that comparisons rank them
/// below every real score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// The candidate this score was computed for.
    pub candidate: Orientation,
    pub value: f64,
    pub provenance: Provenance,
    pub valid: bool,
}

impl ScoreResult {
    pub fn new(candidate: Orientation, provenance: Provenance, value: f64) -> Self {
        Self {
            candidate,
            value,
            provenance,
            valid: value.is_finite(),
        }
    }

    /// A scorer that ran but found nothing to measure.
    pub fn no_signal(candidate: Orientation, provenance: Provenance) -> Self {
        Self {
            candidate,
            value: f64::NEG_INFINITY,
            provenance,
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Steps of the orientation fallback chain, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    ScriptDetection,
    ProjectionPair,
    SidewaysConfidence,
    SidewaysProjection,
    UprightConfidence,
    Whitespace,
    Default,
}

/// One visited step: what it measured and whether it settled the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage: Stage,
    pub scores: Vec<ScoreResult>,
    pub resolved: Option<Orientation>,
}

/// Final verdict for one image plus the ordered trace of the steps visited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub orientation: Orientation,
    pub trace: Vec<TraceEntry>,
}

impl Decision {
    /// The stage that produced the verdict.
    pub fn resolved_by(&self) -> Stage {
        self.trace
            .iter()
            .rev()
            .find(|entry| entry.resolved.is_some())
            .map(|entry| entry.stage)
            .unwrap_or(Stage::Default)
    }

    /// Whether the caller has to touch the pixels at all.
    pub fn needs_rotation(&self) -> bool {
        self.orientation != Orientation::Deg0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_degrees_wraps_quarter_turns() {
        assert_eq!(Orientation::from_degrees(-90), Some(Orientation::Deg270));
        assert_eq!(Orientation::from_degrees(450), Some(Orientation::Deg90));
        assert_eq!(Orientation::from_degrees(360), Some(Orientation::Deg0));
        assert_eq!(Orientation::from_degrees(45), None);
    }

    #[test]
    fn composition_is_modular() {
        assert_eq!(Orientation::Deg270.then(Orientation::Deg180), Orientation::Deg90);
        assert_eq!(Orientation::Deg90.flipped(), Orientation::Deg270);
        assert_eq!(Orientation::Deg0.flipped(), Orientation::Deg180);
    }

    #[test]
    fn sideways_partition() {
        let sideways: Vec<_> = Orientation::ALL
            .iter()
            .filter(|o| o.is_sideways())
            .map(|o| o.degrees())
            .collect();
        assert_eq!(sideways, vec![90, 270]);
    }

    #[test]
    fn non_finite_scores_are_invalid() {
        let nan = ScoreResult::new(Orientation::Deg0, Provenance::Projection, f64::NAN);
        assert!(!nan.is_valid());
        let ok = ScoreResult::new(Orientation::Deg0, Provenance::Projection, 0.25);
        assert!(ok.is_valid());
        let none = ScoreResult::no_signal(Orientation::Deg180, Provenance::Confidence);
        assert_eq!(none.value, f64::NEG_INFINITY);
    }

    #[test]
    fn resolved_by_reports_last_resolving_stage() {
        let decision = Decision {
            orientation: Orientation::Deg180,
            trace: vec![
                TraceEntry {
                    stage: Stage::ProjectionPair,
                    scores: vec![],
                    resolved: None,
                },
                TraceEntry {
                    stage: Stage::Whitespace,
                    scores: vec![],
                    resolved: Some(Orientation::Deg180),
                },
            ],
        };
        assert_eq!(decision.resolved_by(), Stage::Whitespace);
        assert!(decision.needs_rotation());
    }

    #[test]
    fn display_uses_degree_sign() {
        assert_eq!(Orientation::Deg90.to_string(), "90°");
    }
}
