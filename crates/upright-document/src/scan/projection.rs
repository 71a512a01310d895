// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Projection scorer — row/column profile variance ratio.
//
// Upright or upside-down text alternates lines and gaps down the page, so the
// row profile swings while the column profile stays flat. Sideways text flips
// that relationship.

use super::mask::BinaryMask;

/// Row-wise ink sums divided by the width, and column-wise sums divided by
/// the height.
pub fn profiles(mask: &BinaryMask) -> (Vec<f64>, Vec<f64>) {
    let width = mask.width() as f64;
    let height = mask.height() as f64;
    let horizontal = mask
        .row_sums()
        .into_iter()
        .map(|sum| sum as f64 / width)
        .collect();
    let vertical = mask
        .column_sums()
        .into_iter()
        .map(|sum| sum as f64 / height)
        .collect();
    (horizontal, vertical)
}

/// `var(horizontal) / (var(vertical) + epsilon)`. Zero for degenerate masks.
pub fn variance_ratio(mask: &BinaryMask, epsilon: f64) -> f64 {
    if mask.is_degenerate() {
        return 0.0;
    }
    let (horizontal, vertical) = profiles(mask);
    variance(&horizontal) / (variance(&vertical) + epsilon)
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
