//! Mock OCR engine for testing.
//!
//! Writes a transcript derived from the image bytes, so tests can check that
//! a response came from the image they uploaded. Can be slowed down or told
//! to fail in the same ways a real engine does.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;

use super::{Artifact, OcrEngine};
use crate::error::OcrError;
use crate::key::with_appended_extension;
use crate::variant::TranscriptVariant;

/// How the mock behaves on each run.
#[derive(Debug, Clone, Default)]
enum Behavior {
    #[default]
    Succeed,
    /// Return this error without writing anything.
    Fail(OcrError),
    /// Write a truncated file, then report a non-zero exit.
    FailWithPartialOutput(i32),
    /// Report success without writing the output file.
    SkipOutput,
}

/// Deterministic in-process OCR engine.
/// WARNING: Do not use in production - performs no recognition!
#[derive(Debug, Default)]
pub struct MockEngine {
    behavior: Behavior,
    delay: Duration,
    text_runs: AtomicUsize,
    html_runs: AtomicUsize,
    probes: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before producing output.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every run with `error`.
    pub fn failing(error: OcrError) -> Self {
        Self {
            behavior: Behavior::Fail(error),
            ..Self::default()
        }
    }

    /// Write partial output, then exit with `code`.
    pub fn failing_with_partial_output(code: i32) -> Self {
        Self {
            behavior: Behavior::FailWithPartialOutput(code),
            ..Self::default()
        }
    }

    /// Exit successfully without writing output.
    pub fn without_output() -> Self {
        Self {
            behavior: Behavior::SkipOutput,
            ..Self::default()
        }
    }

    /// Total number of runs started.
    pub fn runs(&self) -> usize {
        self.text_runs.load(Ordering::SeqCst) + self.html_runs.load(Ordering::SeqCst)
    }

    pub fn runs_for(&self, variant: TranscriptVariant) -> usize {
        match variant {
            TranscriptVariant::Text => self.text_runs.load(Ordering::SeqCst),
            TranscriptVariant::Html => self.html_runs.load(Ordering::SeqCst),
        }
    }

    /// Number of availability checks answered.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// The transcript the mock produces for `image_bytes`.
    pub fn render(image_bytes: &[u8], variant: TranscriptVariant) -> Vec<u8> {
        let text = String::from_utf8_lossy(image_bytes);
        match variant {
            TranscriptVariant::Text => format!("{text}\n").into_bytes(),
            TranscriptVariant::Html => {
                format!("<div class='ocr_page'><span class='ocrx_word'>{text}</span></div>\n")
                    .into_bytes()
            }
        }
    }
}

#[async_trait]
impl OcrEngine for MockEngine {
    async fn run(
        &self,
        image: &Path,
        output_stem: &Path,
        variant: TranscriptVariant,
    ) -> Result<Artifact, OcrError> {
        match variant {
            TranscriptVariant::Text => self.text_runs.fetch_add(1, Ordering::SeqCst),
            TranscriptVariant::Html => self.html_runs.fetch_add(1, Ordering::SeqCst),
        };

        let start = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let path = with_appended_extension(output_stem, variant.extension());
        let image_bytes = tokio::fs::read(image)
            .await
            .map_err(|e| OcrError::NonZeroExit {
                code: Some(1),
                diagnostics: format!("cannot read {}: {e}", image.display()),
            })?;

        match &self.behavior {
            Behavior::Succeed => {}
            Behavior::Fail(error) => return Err(error.clone()),
            Behavior::FailWithPartialOutput(code) => {
                let rendered = Self::render(&image_bytes, variant);
                let partial = &rendered[..rendered.len() / 2];
                let _ = tokio::fs::write(&path, partial).await;
                return Err(OcrError::NonZeroExit {
                    code: Some(*code),
                    diagnostics: "mock engine crashed mid-write".to_string(),
                });
            }
            Behavior::SkipOutput => return Err(OcrError::OutputMissing(path)),
        }

        let bytes = Self::render(&image_bytes, variant);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|_| OcrError::OutputMissing(path.clone()))?;

        Ok(Artifact {
            variant,
            path,
            bytes,
            generated_at: Utc::now(),
            duration: start.elapsed(),
        })
    }

    async fn is_available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}
