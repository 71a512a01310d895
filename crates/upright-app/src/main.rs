// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upright — batch auto-rotation of document images.
//
// Entry point. Parses arguments, initialises logging, builds the shared
// orientation engine, and runs it over every image found under the input.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use upright_core::UprightConfig;
use upright_document::OrientationEngine;

use services::batch::{self, BatchOptions};
use services::walk;

/// Rotate scanned or photographed document pages upright, in place.
#[derive(Parser, Debug)]
#[command(name = "upright", version)]
#[command(about = "Auto-rotate document images upright (left-to-right text)")]
struct Args {
    /// Image file or directory.
    input: PathBuf,

    /// Recurse into subdirectories.
    #[arg(long)]
    recursive: bool,

    /// Report decisions without writing any file.
    #[arg(long)]
    dry_run: bool,

    /// Recognition language(s), e.g. "srp+srp_latn+eng". Passed to the
    /// backend as-is; ignored when recognition is unavailable.
    #[arg(long)]
    lang: Option<String>,

    /// JSON config file with `tuning` and `recognition` sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Images processed concurrently (default: available parallelism).
    #[arg(long)]
    jobs: Option<usize>,

    /// Skip the recognition backend and use layout heuristics only.
    #[arg(long)]
    no_ocr: bool,

    /// Tesseract executable (overrides the config file).
    #[arg(long)]
    tesseract: Option<String>,

    /// Per-invocation recognition timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log every scoring step.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Upright starting");

    let mut config = match args.config.as_deref() {
        Some(path) => match UprightConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => UprightConfig::default(),
    };
    if let Some(command) = args.tesseract.clone() {
        config.recognition.command = command;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.recognition.timeout_ms = timeout_ms;
    }

    let paths = match walk::image_paths(&args.input, args.recursive) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::error!(path = %args.input.display(), error = %e, "Cannot read input");
            return ExitCode::FAILURE;
        }
    };
    if paths.is_empty() {
        println!("No supported images found.");
        return ExitCode::SUCCESS;
    }

    let engine = if args.no_ocr {
        OrientationEngine::without_recognition(config.tuning.clone())
    } else {
        OrientationEngine::with_tesseract(&config)
    };

    let options = BatchOptions {
        lang: args.lang.clone(),
        dry_run: args.dry_run,
        jobs: args.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }),
    };
    tracing::info!(
        images = paths.len(),
        jobs = options.jobs,
        recognition = engine.recognition_available(),
        "Processing"
    );

    let reports = batch::run_batch(Arc::new(engine), paths, &options).await;
    for report in &reports {
        println!("{report}");
    }
    println!();
    println!("{}", batch::summary(&reports, options.dry_run));

    ExitCode::SUCCESS
}
