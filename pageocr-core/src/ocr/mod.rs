//! OCR engine invocation.
//!
//! The engine is a black box: it reads an image and writes
//! `<output_stem>.<ext>` as a side effect. Implementations classify the run
//! and hand back the produced bytes.
//!
//! - [`TesseractEngine`] - external process with an argument vector
//! - [`MockEngine`] - in-process stub for tests

mod mock;
mod tesseract;

pub use mock::MockEngine;
pub use tesseract::TesseractEngine;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::OcrError;
use crate::variant::TranscriptVariant;

/// Output of one successful engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub variant: TranscriptVariant,
    /// Where the engine wrote the file (`output_stem` + extension)
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the engine run
    pub duration: Duration,
}

/// An OCR engine that can be invoked for one image and one representation.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Run the engine on `image`, producing `output_stem` + variant extension.
    ///
    /// Succeeds only if the run reported success and the expected file
    /// exists and is readable. Both conditions are checked independently.
    async fn run(
        &self,
        image: &Path,
        output_stem: &Path,
        variant: TranscriptVariant,
    ) -> Result<Artifact, OcrError>;

    /// Whether the engine can currently be invoked.
    async fn is_available(&self) -> bool;

    /// Short name for logs and health output.
    fn name(&self) -> &str;
}
