// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tesseract backend for the recognition adapter.
//
// Drives the `tesseract` command-line tool: each rendering is written to a
// temporary PNG, script detection runs page segmentation mode 0 and reads the
// `Rotate:` line, confidence scoring reads the TSV word table. Every
// invocation runs under a wall-clock deadline; a child that overruns it is
// killed and reported as a timeout.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};
use upright_core::error::{Result, UprightError};
use upright_core::{Orientation, RecognitionConfig};

use super::{RecognizedToken, Recognizer};
use crate::image::ImageProcessor;

/// Poll interval while waiting for a child process.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Recogniser backed by the Tesseract CLI.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    config: RecognitionConfig,
}

impl TesseractRecognizer {
    pub fn new(config: RecognitionConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    /// Write `image` to a temporary PNG the CLI can read.
    fn stage_image(&self, image: &DynamicImage) -> Result<NamedTempFile> {
        let png = ImageProcessor::from_dynamic(image.clone()).to_png_bytes()?;
        let mut staged = tempfile::Builder::new().suffix(".png").tempfile()?;
        std::io::Write::write_all(&mut staged, &png)?;
        Ok(staged)
    }

    /// Run the CLI, returning `(stdout, stderr)` on success.
    fn run(&self, args: &[&str]) -> Result<(String, String)> {
        let mut command = Command::new(&self.config.command);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let (status, stdout, stderr) = run_with_deadline(command, self.timeout())?;
        if !status.success() {
            return Err(UprightError::Recognition(format!(
                "{} exited with {}: {}",
                self.config.command,
                status,
                stderr.trim()
            )));
        }
        Ok((stdout, stderr))
    }
}

impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn probe(&self) -> bool {
        match self.run(&["--version"]) {
            Ok((stdout, stderr)) => {
                // Older releases print the banner on stderr.
                let banner = if stdout.trim().is_empty() { stderr } else { stdout };
                debug!(version = banner.lines().next().unwrap_or(""), "Tesseract probed");
                true
            }
            Err(err) => {
                debug!(error = %err, "Tesseract probe failed");
                false
            }
        }
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn detect_script_orientation(&self, image: &DynamicImage) -> Result<Option<Orientation>> {
        let staged = self.stage_image(image)?;
        let input = staged.path().to_string_lossy().into_owned();
        let (stdout, stderr) = self.run(&[input.as_str(), "stdout", "--psm", "0"])?;
        // Depending on the build, the OSD report lands on either stream.
        Ok(parse_osd_rotation(&stdout).or_else(|| parse_osd_rotation(&stderr)))
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height(), lang = ?lang))]
    fn recognize(&self, image: &DynamicImage, lang: Option<&str>) -> Result<Vec<RecognizedToken>> {
        let staged = self.stage_image(image)?;
        let input = staged.path().to_string_lossy().into_owned();
        let psm = self.config.page_segmentation_mode.map(|mode| mode.to_string());

        let mut args: Vec<&str> = vec![input.as_str(), "stdout"];
        if let Some(lang) = lang.filter(|l| !l.trim().is_empty()) {
            args.extend(["-l", lang]);
        }
        if let Some(psm) = psm.as_deref() {
            args.extend(["--psm", psm]);
        }
        args.push("tsv");

        let (stdout, _) = self.run(&args)?;
        let tokens = parse_tsv_tokens(&stdout);
        debug!(tokens = tokens.len(), "TSV parsed");
        Ok(tokens)
    }
}

/// Spawn `command` and wait for it, killing it once `timeout` elapses.
///
/// Both pipes are drained on helper threads so a chatty child cannot block on
/// a full pipe while we poll.
fn run_with_deadline(
    mut command: Command,
    timeout: Duration,
) -> Result<(ExitStatus, String, String)> {
    let mut child = command.spawn().map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => {
            UprightError::RecognizerUnavailable(format!("{:?} not found", command.get_program()))
        }
        _ => UprightError::Recognition(format!("failed to spawn recogniser: {}", err)),
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || drain(stdout));
    let stderr_reader = thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(UprightError::RecognitionTimeout {
                after_ms: timeout.as_millis() as u64,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout_reader
        .join()
        .map_err(|_| UprightError::Recognition("stdout reader panicked".into()))?;
    let stderr = stderr_reader
        .join()
        .map_err(|_| UprightError::Recognition("stderr reader panicked".into()))?;
    Ok((status, stdout, stderr))
}

fn drain(pipe: Option<impl Read>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buffer);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Extract the `Rotate: N` value from an OSD report.
pub(crate) fn parse_osd_rotation(report: &str) -> Option<Orientation> {
    report.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() != "Rotate" {
            return None;
        }
        value
            .trim()
            .parse::<i32>()
            .ok()
            .and_then(Orientation::from_degrees)
    })
}

/// Parse Tesseract's TSV output into tokens.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left,
/// top, width, height, conf, text. Rows whose confidence does not parse are
/// dropped; structural rows (conf -1, empty text) are kept and filtered later.
pub(crate) fn parse_tsv_tokens(tsv: &str) -> Vec<RecognizedToken> {
    tsv.lines()
        .filter(|line| !line.starts_with("level"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 12 {
                return None;
            }
            let confidence = fields[10].trim().parse::<f64>().ok()?;
            Some(RecognizedToken {
                text: fields[11].trim().to_string(),
                confidence,
            })
        })
        .collect()
}
