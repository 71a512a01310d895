// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binary foreground mask produced by the preprocessor.

/// Ink = 1, background = 0, stored row-major.
///
/// Masks are derived per candidate rendering and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    /// All-background mask of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `is_ink` at every pixel.
    pub fn from_fn(width: u32, height: u32, mut is_ink: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(is_ink(x, y) as u8);
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Zero-area masks carry no signal.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] != 0
    }

    pub fn foreground_count(&self) -> u64 {
        self.data.iter().map(|&v| v as u64).sum()
    }

    /// Foreground pixels per row, top to bottom.
    pub fn row_sums(&self) -> Vec<u32> {
        if self.width == 0 {
            return vec![0; self.height as usize];
        }
        self.data
            .chunks_exact(self.width as usize)
            .map(|row| row.iter().map(|&v| v as u32).sum())
            .collect()
    }

    /// Foreground pixels per column, left to right.
    pub fn column_sums(&self) -> Vec<u32> {
        let mut sums = vec![0u32; self.width as usize];
        if self.width == 0 {
            return sums;
        }
        for row in self.data.chunks_exact(self.width as usize) {
            for (sum, &v) in sums.iter_mut().zip(row) {
                *sum += v as u32;
            }
        }
        sums
    }
}
