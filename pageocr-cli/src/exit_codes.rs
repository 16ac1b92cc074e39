//! Exit codes following sysexits.h conventions.
//!
//! Scripts driving batch ingestion can tell a bad identifier from a missing
//! page, an unreadable scan or a broken OCR installation.

use pageocr_core::{OcrError, PageError};

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Invalid page identifier or extension.
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// The OCR engine could not process the image.
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Input file or stored page not found.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// OCR engine missing, hung, or otherwise unusable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// Storage or output file failure.
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Message prefix for a page that is not stored.
pub const NO_SUCH_PAGE: &str = "No page stored under";

/// Represents an exit code with optional error context.
#[derive(Debug)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let page_error = err.chain().find_map(|e| e.downcast_ref::<PageError>());
        let code = match page_error {
            Some(PageError::InvalidIdentifier(_)) | Some(PageError::UnsupportedExtension { .. }) => {
                USAGE_ERROR
            }
            Some(PageError::Storage { .. }) => IO_ERROR,
            Some(PageError::Generation(ocr)) => match ocr {
                OcrError::Launch(_) | OcrError::Timeout(_) => UNAVAILABLE,
                OcrError::NonZeroExit { .. }
                | OcrError::OutputMissing(_)
                | OcrError::Aborted(_) => DATA_ERROR,
            },
            None if message.contains("Failed to read file") || message.contains(NO_SUCH_PAGE) => {
                INPUT_ERROR
            }
            None if message.contains("Failed to write") => IO_ERROR,
            None if message.contains("OCR engine unavailable") => UNAVAILABLE,
            None => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
