// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Upright.
//
// None of these ever escape the orientation decision itself: the engine turns
// recognition failures into "no signal" and keeps walking its fallback chain.
// They surface only at the fallible edges (decoding, encoding, config loading,
// spawning the recognition backend).

use thiserror::Error;

/// Top-level error type for all Upright operations.
#[derive(Debug, Error)]
pub enum UprightError {
    // -- Image errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("unsupported image file: {0}")]
    UnsupportedImage(String),

    // -- Recognition errors --
    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("recognition backend unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("recognition timed out after {after_ms} ms")]
    RecognitionTimeout { after_ms: u64 },

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl UprightError {
    /// True for errors that mean "this signal is missing", as opposed to a
    /// malformed request. The adapter downgrades both the same way, but logs
    /// them at different levels.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            UprightError::RecognizerUnavailable(_) | UprightError::RecognitionTimeout { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, UprightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_counts_as_unavailable() {
        assert!(UprightError::RecognitionTimeout { after_ms: 10 }.is_unavailable());
        assert!(UprightError::RecognizerUnavailable("gone".into()).is_unavailable());
        assert!(!UprightError::Recognition("bad tsv".into()).is_unavailable());
    }

    #[test]
    fn io_errors_convert() {
        let err: UprightError = std::io::Error::new(std::io::ErrorKind::NotFound, "x").into();
        assert!(err.to_string().starts_with("file I/O error"));
    }
}
