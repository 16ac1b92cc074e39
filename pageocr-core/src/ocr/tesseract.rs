//! External OCR process runner.
//!
//! Invokes the configured executable as
//! `<engine> <image> <output_stem> [hocr]`. Arguments are passed as separate
//! argv entries, never through a shell, so nothing in a path is interpreted.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::{Artifact, OcrEngine};
use crate::config::PageConfig;
use crate::error::OcrError;
use crate::key::with_appended_extension;
use crate::variant::TranscriptVariant;

/// Bytes of engine stderr kept for logging.
const MAX_DIAGNOSTIC_BYTES: usize = 2048;

/// Tesseract-compatible engine run as a child process.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &PageConfig) -> Self {
        Self::new(config.engine_path.clone(), config.ocr_timeout)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument vector for one run: image, output stem and, for HTML only,
    /// the format selector.
    pub fn command_args(
        image: &Path,
        output_stem: &Path,
        variant: TranscriptVariant,
    ) -> Vec<OsString> {
        let mut args = vec![
            image.as_os_str().to_owned(),
            output_stem.as_os_str().to_owned(),
        ];
        if let Some(selector) = variant.format_selector() {
            args.push(OsString::from(selector));
        }
        args
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    #[instrument(
        level = "debug",
        skip_all,
        fields(engine = %self.program.display(), image = %image.display(), variant = %variant)
    )]
    async fn run(
        &self,
        image: &Path,
        output_stem: &Path,
        variant: TranscriptVariant,
    ) -> Result<Artifact, OcrError> {
        let args = Self::command_args(image, output_stem, variant);
        debug!(?args, "Launching OCR engine");

        let start = Instant::now();
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::Launch(format!("{}: {e}", self.program.display())))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| OcrError::Launch(format!("Failed to wait for engine: {e}")))?,
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "OCR engine timed out and was killed"
                );
                return Err(OcrError::Timeout(self.timeout));
            }
        };
        let duration = start.elapsed();

        if !output.status.success() {
            let diagnostics = diagnostic_tail(&output.stderr);
            warn!(
                exit_code = ?output.status.code(),
                duration_ms = duration.as_millis() as u64,
                stderr = %diagnostics,
                "OCR engine exited with failure"
            );
            return Err(OcrError::NonZeroExit {
                code: output.status.code(),
                diagnostics,
            });
        }

        let path = with_appended_extension(output_stem, variant.extension());
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Engine output unreadable");
                } else {
                    warn!(path = %path.display(), "Engine reported success without output");
                }
                return Err(OcrError::OutputMissing(path));
            }
        };

        info!(
            duration_ms = duration.as_millis() as u64,
            bytes = bytes.len(),
            "Transcript generated"
        );

        Ok(Artifact {
            variant,
            path,
            bytes,
            generated_at: Utc::now(),
            duration,
        })
    }

    async fn is_available(&self) -> bool {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        matches!(
            tokio::time::timeout(Duration::from_secs(5), status).await,
            Ok(Ok(status)) if status.success()
        )
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Last `MAX_DIAGNOSTIC_BYTES` of stderr, lossily decoded and trimmed.
fn diagnostic_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_DIAGNOSTIC_BYTES {
        return text.to_string();
    }
    let cut = text.len() - MAX_DIAGNOSTIC_BYTES;
    let start = text
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= cut)
        .unwrap_or(0);
    text[start..].to_string()
}
