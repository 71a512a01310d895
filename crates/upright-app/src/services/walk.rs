// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input discovery — expands a file or directory argument into image paths.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Extensions the image stack can decode and write back.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp", "webp"];

/// Whether `path` carries a supported image extension (case-insensitive).
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Every supported image under `root`, sorted, each file at most once.
///
/// A file argument yields itself if supported. Directories are listed one
/// level deep unless `recursive` is set. Symlinked directories are never
/// descended into; symlinked files are kept unless they resolve to a file
/// already listed. Unreadable subdirectories are logged and skipped; an
/// unreadable `root` is an error.
pub fn image_paths(root: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if is_image_path(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let mut first = true;
    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if !first => {
                warn!(path = %dir.display(), error = %err, "Skipping unreadable directory");
                continue;
            }
            Err(err) => return Err(err),
        };
        first = false;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            // `file_type` does not follow symlinks.
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if (file_type.is_file() || (file_type.is_symlink() && path.is_file()))
                && is_image_path(&path)
            {
                found.push(path);
            }
        }
    }

    // Two names for one file would have it rewritten twice, concurrently.
    // Real files claim their identity before any link to them.
    found.sort_by_key(|path| (path.is_symlink(), path.clone()));
    let mut seen = HashSet::new();
    found.retain(|path| match path.canonicalize() {
        Ok(real) => seen.insert(real),
        Err(_) => true,
    });
    found.sort();
    Ok(found)
}
