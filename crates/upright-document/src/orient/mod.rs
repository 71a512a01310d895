// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Orientation module — per-page signals and the decision chain over them.

pub mod engine;
pub mod signals;

pub use engine::{OrientationEngine, StepOutcome, decide_with};
pub use signals::{OrientationSignals, PageSignals};
