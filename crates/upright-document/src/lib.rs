// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// upright-document — Orientation analysis for scanned and photographed pages.
//
// Provides image handling (EXIF-aware loading, quarter-turn rotation, rescaling),
// a mask pipeline (denoise, dual-threshold binarization, projection and
// whitespace scorers), a capability-gated recognition adapter, and the
// orientation engine that combines them in a fixed precedence chain.

pub mod image;
pub mod orient;
pub mod recognize;
pub mod scan;

// Re-export the primary types so callers can use `upright_document::OrientationEngine` etc.
pub use self::image::processor::ImageProcessor;
pub use orient::engine::OrientationEngine;
pub use recognize::{RecognitionAdapter, Recognizer, TesseractRecognizer};
pub use scan::binarize::Preprocessor;
