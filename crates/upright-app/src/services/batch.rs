// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch runner — decides and applies orientation for many files.
//
// The engine is immutable and shared through an `Arc`; each file is decoded,
// decided and (optionally) written on a tokio blocking worker. A semaphore
// caps how many files are in flight, which bounds peak memory as much as CPU.
// Results come back in input order regardless of completion order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, instrument};
use upright_core::Orientation;
use upright_core::error::Result;
use upright_document::{ImageProcessor, OrientationEngine};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Rotated (or would be, on a dry run) clockwise by the given amount.
    Rotated(Orientation),
    AlreadyUpright,
    /// Could not be read, decoded or written.
    Skipped,
}

/// Batch-wide settings.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub lang: Option<String>,
    pub dry_run: bool,
    pub jobs: usize,
}

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: Outcome,
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Rotated(orientation) => {
                write!(f, "[ROTATED {:>3}°] {}", orientation.degrees(), self.path.display())
            }
            Outcome::AlreadyUpright => write!(f, "[ALREADY UPRIGHT] {}", self.path.display()),
            Outcome::Skipped => write!(f, "[SKIP] {}", self.path.display()),
        }
    }
}

/// Closing line for a finished batch.
pub fn summary(reports: &[FileReport], dry_run: bool) -> String {
    let changed = reports
        .iter()
        .filter(|report| matches!(report.outcome, Outcome::Rotated(_)))
        .count();
    let total = reports.len();
    if dry_run {
        format!("Dry-run: {changed}/{total} would be rotated.")
    } else {
        format!("Done: rotated {changed}/{total} images.")
    }
}

/// Decide one file and, unless `dry_run`, rewrite it upright in place.
#[instrument(skip(engine), fields(path = %path.display()))]
pub fn process_image(
    engine: &OrientationEngine,
    path: &Path,
    lang: Option<&str>,
    dry_run: bool,
) -> Result<Outcome> {
    // EXIF orientation is applied on open, so the engine sees display pixels.
    let processor = ImageProcessor::open(path)?;
    let decision = engine.decide(processor.as_dynamic(), lang);
    if !decision.needs_rotation() {
        return Ok(Outcome::AlreadyUpright);
    }
    if !dry_run {
        processor.rotate(decision.orientation).save(path)?;
        debug!(orientation = %decision.orientation, "Rewritten upright");
    }
    Ok(Outcome::Rotated(decision.orientation))
}

/// Process `paths` concurrently, at most `options.jobs` at a time.
pub async fn run_batch(
    engine: Arc<OrientationEngine>,
    paths: Vec<PathBuf>,
    options: &BatchOptions,
) -> Vec<FileReport> {
    let permits = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let engine = Arc::clone(&engine);
        let permits = Arc::clone(&permits);
        let lang = options.lang.clone();
        let dry_run = options.dry_run;
        handles.push((
            path.clone(),
            tokio::spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = permits.acquire_owned().await.ok();
                tokio::task::spawn_blocking(move || {
                    process_image(&engine, &path, lang.as_deref(), dry_run)
                })
                .await
            }),
        ));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let outcome = match handle.await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(err))) => {
                error!(path = %path.display(), error = %err, "Failed to process image");
                Outcome::Skipped
            }
            Ok(Err(join_err)) | Err(join_err) => {
                error!(path = %path.display(), error = %join_err, "Worker failed");
                Outcome::Skipped
            }
        };
        reports.push(FileReport { path, outcome });
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};
    use upright_core::TuningConfig;
    use upright_document::image::rotated;

    /// Page with six text lines near the top, as a letter would have.
    fn letter_page() -> DynamicImage {
        let mut gray = GrayImage::from_pixel(400, 500, Luma([255u8]));
        for line in 0..6u32 {
            let top = 40 + line * 30;
            for y in top..top + 12 {
                for x in 40..360u32 {
                    if (x / 6) % 5 != 4 {
                        gray.put_pixel(x, y, Luma([0u8]));
                    }
                }
            }
        }
        DynamicImage::ImageLuma8(gray)
    }

    fn engine() -> Arc<OrientationEngine> {
        Arc::new(OrientationEngine::without_recognition(TuningConfig::default()))
    }

    fn options(dry_run: bool) -> BatchOptions {
        BatchOptions {
            lang: None,
            dry_run,
            jobs: 2,
        }
    }

    #[test]
    fn report_lines_formatted() {
        let rotated = FileReport {
            path: PathBuf::from("scans/a.jpg"),
            outcome: Outcome::Rotated(Orientation::Deg90),
        };
        let upright = FileReport {
            path: PathBuf::from("b.png"),
            outcome: Outcome::AlreadyUpright,
        };
        let skipped = FileReport {
            path: PathBuf::from("c.tif"),
            outcome: Outcome::Skipped,
        };
        assert_eq!(rotated.to_string(), "[ROTATED  90°] scans/a.jpg");
        assert_eq!(upright.to_string(), "[ALREADY UPRIGHT] b.png");
        assert_eq!(skipped.to_string(), "[SKIP] c.tif");
    }

    #[test]
    fn summary_counts_rotations() {
        let reports = vec![
            FileReport {
                path: PathBuf::from("a.png"),
                outcome: Outcome::Rotated(Orientation::Deg180),
            },
            FileReport {
                path: PathBuf::from("b.png"),
                outcome: Outcome::Skipped,
            },
            FileReport {
                path: PathBuf::from("c.png"),
                outcome: Outcome::AlreadyUpright,
            },
        ];
        assert_eq!(summary(&reports, true), "Dry-run: 1/3 would be rotated.");
        assert_eq!(summary(&reports, false), "Done: rotated 1/3 images.");
    }

    #[test]
    fn upside_down_file_rewritten_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.png");
        rotated(&letter_page(), Orientation::Deg180)
            .save(&path)
            .expect("save");

        let outcome = process_image(&engine(), &path, None, false).expect("process");
        assert_eq!(outcome, Outcome::Rotated(Orientation::Deg180));

        let rewritten = image::open(&path).expect("reopen");
        assert_eq!(rewritten, letter_page());
        let again = process_image(&engine(), &path, None, false).expect("process");
        assert_eq!(again, Outcome::AlreadyUpright);
    }

    #[test]
    fn dry_run_leaves_file_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.png");
        rotated(&letter_page(), Orientation::Deg180)
            .save(&path)
            .expect("save");
        let before = std::fs::read(&path).expect("read");

        let outcome = process_image(&engine(), &path, None, true).expect("process");
        assert_eq!(outcome, Outcome::Rotated(Orientation::Deg180));
        assert_eq!(std::fs::read(&path).expect("read"), before);
    }

    #[tokio::test]
    async fn batch_keeps_input_order_and_skips_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let upright = dir.path().join("a.png");
        let broken = dir.path().join("b.png");
        let flipped = dir.path().join("c.png");
        letter_page().save(&upright).expect("save");
        std::fs::write(&broken, b"not a png").expect("write");
        rotated(&letter_page(), Orientation::Deg180)
            .save(&flipped)
            .expect("save");

        let paths = vec![upright.clone(), broken.clone(), flipped.clone()];
        let reports = run_batch(engine(), paths, &options(true)).await;

        let outcomes: Vec<_> = reports.iter().map(|r| (r.path.clone(), r.outcome)).collect();
        assert_eq!(
            outcomes,
            vec![
                (upright, Outcome::AlreadyUpright),
                (broken, Outcome::Skipped),
                (flipped, Outcome::Rotated(Orientation::Deg180)),
            ]
        );
        assert_eq!(summary(&reports, true), "Dry-run: 1/3 would be rotated.");
    }
}
