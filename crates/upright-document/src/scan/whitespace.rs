// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whitespace asymmetry scorer — top margin against bottom margin.
//
// Pages usually leave at least as much room below the last line as above the
// first, so a lower ratio is read as "more likely upright". Weak and
// convention-dependent: only consulted when recognition has nothing to say.

use upright_core::TuningConfig;

use super::mask::BinaryMask;

/// Minimum ink count for a row to count as content rather than noise.
pub fn noise_floor(width: u32, tuning: &TuningConfig) -> u32 {
    let scaled = (tuning.noise_floor_fraction * width as f64) as u32;
    scaled.max(tuning.noise_floor_min)
}

/// Blank rows above the first and below the last content row, or `None`
/// when no row clears the noise floor.
pub fn margins(mask: &BinaryMask, tuning: &TuningConfig) -> Option<(usize, usize)> {
    let floor = noise_floor(mask.width(), tuning);
    let rows = mask.row_sums();
    let top = rows.iter().position(|&count| count > floor)?;
    let bottom = rows.iter().rev().position(|&count| count > floor)?;
    Some((top, bottom))
}

/// `top_margin / (bottom_margin + epsilon)`; `None` when the mask has no
/// content rows.
pub fn top_bottom_ratio(mask: &BinaryMask, tuning: &TuningConfig) -> Option<f64> {
    let (top, bottom) = margins(mask, tuning)?;
    Some(top as f64 / (bottom as f64 + tuning.whitespace_epsilon))
}
