// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mask pipeline — binarization and the two layout scorers that read the
// resulting masks (projection variance and whitespace asymmetry).

pub mod binarize;
pub mod mask;
pub mod projection;
pub mod whitespace;

pub use binarize::Preprocessor;
pub use mask::BinaryMask;
pub use projection::variance_ratio;
pub use whitespace::top_bottom_ratio;
