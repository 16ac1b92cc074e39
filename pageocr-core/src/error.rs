use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors from page operations.
///
/// Cloneable so one generation outcome can be handed to every waiter.
#[derive(Error, Debug, Clone)]
pub enum PageError {
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Unsupported image extension for {key:?} (allowed: {allowed})")]
    UnsupportedExtension { key: String, allowed: String },

    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Transcript generation failed: {0}")]
    Generation(#[from] OcrError),
}

impl PageError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier(_) | Self::UnsupportedExtension { .. }
        )
    }
}

/// Failure of a single OCR engine run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    #[error("OCR engine exited with status {code:?}")]
    NonZeroExit {
        /// `None` when the process was terminated by a signal.
        code: Option<i32>,
        /// Tail of the engine's stderr, for logs only.
        diagnostics: String,
    },

    #[error("OCR engine succeeded but produced no output at {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("OCR engine did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Failed to launch OCR engine: {0}")]
    Launch(String),

    #[error("Generation task aborted: {0}")]
    Aborted(String),
}

impl OcrError {
    /// Short machine-readable classification used in logs and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NonZeroExit { .. } => "non_zero_exit",
            Self::OutputMissing(_) => "output_missing",
            Self::Timeout(_) => "timeout",
            Self::Launch(_) => "launch",
            Self::Aborted(_) => "aborted",
        }
    }
}

pub type Result<T> = std::result::Result<T, PageError>;
