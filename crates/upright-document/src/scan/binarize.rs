// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessor — turns a page rendering into a binary ink mask.
//
// Global (Otsu) thresholding misses faint strokes under uneven illumination;
// local thresholding alone speckles blank regions. The mask is the union of
// both, which favours recall of faint handwriting. The downstream scorers
// tolerate mild over-segmentation.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::gaussian_blur_f32;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use tracing::{debug, instrument};
use upright_core::{AdaptiveMethod, TuningConfig};

use super::mask::BinaryMask;

/// Converts renderings into [`BinaryMask`]s using the configured thresholds.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    blur_sigma: f32,
    block_size: u32,
    bias: i32,
    method: AdaptiveMethod,
    adaptive_sigma: f32,
}

impl Preprocessor {
    pub fn new(tuning: &TuningConfig) -> Self {
        Self {
            blur_sigma: tuning.blur_sigma,
            block_size: tuning.adaptive_block_size,
            bias: tuning.adaptive_bias,
            method: tuning.adaptive_method,
            adaptive_sigma: tuning.adaptive_sigma(),
        }
    }

    /// Binarize any decoded image (converted to luma first).
    pub fn prepare(&self, image: &DynamicImage) -> BinaryMask {
        self.prepare_gray(&image.to_luma8())
    }

    /// Binarize a grayscale page: blur, invert, then mark a pixel as ink when
    /// either the global or the local threshold says so.
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn prepare_gray(&self, gray: &GrayImage) -> BinaryMask {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return BinaryMask::empty(width, height);
        }

        let blurred = gaussian_blur_f32(gray, self.blur_sigma);
        let inverted = GrayImage::from_fn(width, height, |x, y| {
            Luma([255 - blurred.get_pixel(x, y).0[0]])
        });

        let global = otsu_level(&inverted);
        let local = self.local_means(&inverted);
        debug!(otsu = ?global, method = ?self.method, "Thresholds computed");

        BinaryMask::from_fn(width, height, |x, y| {
            let value = inverted.get_pixel(x, y).0[0];
            let above_global = global.is_some_and(|level| value > level);
            let above_local = value as i32 > local.get_pixel(x, y).0[0] as i32 + self.bias;
            above_global || above_local
        })
    }

    /// Per-pixel neighbourhood means of the inverted page.
    fn local_means(&self, inverted: &GrayImage) -> GrayImage {
        match self.method {
            AdaptiveMethod::Gaussian => gaussian_blur_f32(inverted, self.adaptive_sigma),
            AdaptiveMethod::Mean => {
                let (width, height) = inverted.dimensions();
                let integral = integral_image::<_, u64>(inverted);
                let radius = self.block_size / 2;
                GrayImage::from_fn(width, height, |x, y| {
                    let mean = box_mean(&integral, x, y, radius);
                    Luma([mean.round().clamp(0.0, 255.0) as u8])
                })
            }
        }
    }
}

/// Mean of the square window of `radius` around (cx, cy), clipped to the
/// image, read from a summed-area table.
fn box_mean(integral: &Image<Luma<u64>>, cx: u32, cy: u32, radius: u32) -> f64 {
    // The table carries a zero row and column, so it is one larger than the page.
    let (width, height) = (integral.width() - 1, integral.height() - 1);
    let left = cx.saturating_sub(radius);
    let top = cy.saturating_sub(radius);
    let right = cx.saturating_add(radius).min(width - 1);
    let bottom = cy.saturating_add(radius).min(height - 1);
    let area = ((right - left + 1) * (bottom - top + 1)) as f64;
    sum_image_pixels(integral, left, top, right, bottom)[0] as f64 / area
}

/// Otsu level: the threshold maximising between-class variance. Pixels
/// strictly above it are foreground.
///
/// Returns `None` when no split separates two non-empty classes (a single
/// occupied intensity level), i.e. the page has no global contrast.
pub(crate) fn otsu_level(gray: &GrayImage) -> Option<u8> {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return None;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: Option<u8> = None;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = Some(t as u8);
        }
    }

    best_threshold
}
