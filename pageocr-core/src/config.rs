//! Page store configuration
//!
//! One immutable value describing where images and transcripts live and how
//! the OCR engine is reached. Built once at process start and shared.

use std::path::PathBuf;
use std::time::Duration;

/// Default OCR ceiling in seconds.
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 120;

/// Storage layout and OCR engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    /// Directory holding uploaded page images (default: /tmp/ocr_images)
    pub image_root: PathBuf,
    /// Directory holding generated transcripts (default: /tmp/ocr_transcripts)
    pub transcript_root: PathBuf,
    /// OCR engine executable (default: /usr/bin/tesseract)
    pub engine_path: PathBuf,
    /// Lower-case image extensions accepted as identifiers (default: jpg, tif)
    pub allowed_extensions: Vec<String>,
    /// Ceiling on a single engine run (default: 120s)
    pub ocr_timeout: Duration,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            image_root: PathBuf::from("/tmp/ocr_images"),
            transcript_root: PathBuf::from("/tmp/ocr_transcripts"),
            engine_path: PathBuf::from("/usr/bin/tesseract"),
            allowed_extensions: vec!["jpg".to_string(), "tif".to_string()],
            ocr_timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
        }
    }
}

impl PageConfig {
    /// Load configuration from environment variables.
    ///
    /// - `PAGEOCR_IMAGE_DIR`
    /// - `PAGEOCR_TRANSCRIPT_DIR`
    /// - `PAGEOCR_ENGINE`
    /// - `PAGEOCR_IMAGE_EXTENSIONS` (`jpg|tif` or `jpg,tif`)
    /// - `PAGEOCR_OCR_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let image_root = std::env::var("PAGEOCR_IMAGE_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.image_root);

        let transcript_root = std::env::var("PAGEOCR_TRANSCRIPT_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.transcript_root);

        let engine_path = std::env::var("PAGEOCR_ENGINE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.engine_path);

        let allowed_extensions = std::env::var("PAGEOCR_IMAGE_EXTENSIONS")
            .ok()
            .map(|v| parse_extension_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.allowed_extensions);

        let ocr_timeout = std::env::var("PAGEOCR_OCR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.ocr_timeout);

        Self {
            image_root,
            transcript_root,
            engine_path,
            allowed_extensions,
            ocr_timeout,
        }
    }

    /// Convenience constructor rooting both directories under `base`.
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            image_root: base.join("images"),
            transcript_root: base.join("transcripts"),
            ..Self::default()
        }
    }

    /// Whether `ext` is on the allow-list (case-insensitive).
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

/// Parse a `|`- or `,`-separated extension list, dropping leading dots.
pub fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.split(['|', ','])
        .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
