//! Resource identifiers and storage path derivation.
//!
//! A [`ResourceKey`] is a validated single-component filename. The image lives
//! at `image_root/<key>` and its transcripts at `transcript_root/<stem>.<ext>`,
//! so the two layouts differ only in base directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::PageConfig;
use crate::error::{PageError, Result};
use crate::variant::TranscriptVariant;

/// Longest identifier accepted, matching common filesystem name limits.
pub const MAX_KEY_LEN: usize = 255;

/// Suffix marking in-progress files that are never served.
const SCRATCH_SUFFIX: &str = "partial";

/// Sanitized identifier addressing one page image and its transcripts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    name: String,
    stem_len: usize,
}

impl ResourceKey {
    /// Validate a client-supplied filename.
    ///
    /// Anything that would not survive as the same single path component is
    /// rejected rather than rewritten: separators, `..`, leading dots,
    /// control characters. The extension must be on the allow-list.
    pub fn parse(raw: &str, config: &PageConfig) -> Result<Self> {
        let invalid = || PageError::InvalidIdentifier(raw.to_string());

        if raw.is_empty() || raw.len() > MAX_KEY_LEN {
            return Err(invalid());
        }
        if raw.starts_with('.')
            || raw.contains("..")
            || raw.contains(['/', '\\'])
            || raw.chars().any(char::is_control)
        {
            return Err(invalid());
        }

        // Must round-trip as exactly one normal path component.
        let path = Path::new(raw);
        if path.file_name().and_then(|n| n.to_str()) != Some(raw) {
            return Err(invalid());
        }

        let (stem, ext) = match raw.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, ext),
            _ => {
                return Err(PageError::UnsupportedExtension {
                    key: raw.to_string(),
                    allowed: config.allowed_extensions.join("|"),
                })
            }
        };

        if !config.allows_extension(ext) {
            return Err(PageError::UnsupportedExtension {
                key: raw.to_string(),
                allowed: config.allowed_extensions.join("|"),
            });
        }

        Ok(Self {
            name: raw.to_string(),
            stem_len: stem.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Filename without its extension; shared by every transcript variant.
    pub fn stem(&self) -> &str {
        &self.name[..self.stem_len]
    }

    pub fn extension(&self) -> &str {
        &self.name[self.stem_len + 1..]
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Pure mapping from keys to storage paths.
#[derive(Debug, Clone)]
pub struct PathDeriver {
    image_root: PathBuf,
    transcript_root: PathBuf,
}

impl PathDeriver {
    pub fn new(config: &PageConfig) -> Self {
        Self {
            image_root: config.image_root.clone(),
            transcript_root: config.transcript_root.clone(),
        }
    }

    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    pub fn transcript_root(&self) -> &Path {
        &self.transcript_root
    }

    pub fn image_path(&self, key: &ResourceKey) -> PathBuf {
        self.image_root.join(key.as_str())
    }

    /// Transcript path without a representation-specific extension.
    pub fn transcript_stem(&self, key: &ResourceKey) -> PathBuf {
        self.transcript_root.join(key.stem())
    }

    pub fn transcript_path(&self, key: &ResourceKey, variant: TranscriptVariant) -> PathBuf {
        with_appended_extension(&self.transcript_stem(key), variant.extension())
    }

    /// Unique stem for an engine run; the output is renamed into place on success.
    pub fn scratch_transcript_stem(&self, key: &ResourceKey) -> PathBuf {
        self.transcript_root.join(format!(
            ".{}.{}.{}",
            key.stem(),
            uuid::Uuid::new_v4().simple(),
            SCRATCH_SUFFIX
        ))
    }

    /// Unique temporary path for an image upload in the image root.
    pub fn scratch_image_path(&self, key: &ResourceKey) -> PathBuf {
        self.image_root.join(format!(
            ".{}.{}.{}",
            key.as_str(),
            uuid::Uuid::new_v4().simple(),
            SCRATCH_SUFFIX
        ))
    }
}

/// `stem` + `.` + `ext`, without replacing any dot already in the stem.
pub fn with_appended_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut raw: OsString = stem.as_os_str().to_owned();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PageConfig {
        PageConfig {
            image_root: PathBuf::from("/data/images"),
            transcript_root: PathBuf::from("/data/transcripts"),
            ..PageConfig::default()
        }
    }

    #[test]
    fn test_parse_valid_key() {
        let key = ResourceKey::parse("Hutchinson1794-1-0253.jpg", &config()).unwrap();
        assert_eq!(key.as_str(), "Hutchinson1794-1-0253.jpg");
        assert_eq!(key.stem(), "Hutchinson1794-1-0253");
        assert_eq!(key.extension(), "jpg");
    }

    #[test]
    fn test_parse_rejects_traversal() {
        for raw in [
            "../../etc/passwd",
            "../page.jpg",
            "a/../b.jpg",
            "dir/page.jpg",
            "dir\\page.jpg",
            "..",
            ".",
            ".hidden.jpg",
            "page..jpg",
            "",
            "pa\nge.jpg",
        ] {
            let err = ResourceKey::parse(raw, &config()).unwrap_err();
            assert!(
                matches!(err, PageError::InvalidIdentifier(_)),
                "{raw:?} should be an invalid identifier, got {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overlong() {
        let raw = format!("{}.jpg", "a".repeat(MAX_KEY_LEN));
        assert!(matches!(
            ResourceKey::parse(&raw, &config()),
            Err(PageError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_parse_rejects_extension_outside_allow_list() {
        for raw in ["page.png", "page", "page.", "notes.txt"] {
            assert!(
                matches!(
                    ResourceKey::parse(raw, &config()),
                    Err(PageError::UnsupportedExtension { .. })
                ),
                "{raw:?} should be rejected by the extension allow-list"
            );
        }
    }

    #[test]
    fn test_parse_extension_case_insensitive() {
        assert!(ResourceKey::parse("SCAN.TIF", &config()).is_ok());
    }

    #[test]
    fn test_paths_differ_only_in_root() {
        let deriver = PathDeriver::new(&config());
        let key = ResourceKey::parse("page-7.jpg", &config()).unwrap();

        assert_eq!(deriver.image_path(&key), PathBuf::from("/data/images/page-7.jpg"));
        assert_eq!(
            deriver.transcript_stem(&key),
            PathBuf::from("/data/transcripts/page-7")
        );
        assert_eq!(
            deriver.transcript_path(&key, TranscriptVariant::Text),
            PathBuf::from("/data/transcripts/page-7.txt")
        );
        assert_eq!(
            deriver.transcript_path(&key, TranscriptVariant::Html),
            PathBuf::from("/data/transcripts/page-7.html")
        );
    }

    #[test]
    fn test_transcript_path_keeps_inner_dots() {
        let deriver = PathDeriver::new(&config());
        let key = ResourceKey::parse("vol.2.page.jpg", &config()).unwrap();
        assert_eq!(
            deriver.transcript_path(&key, TranscriptVariant::Text),
            PathBuf::from("/data/transcripts/vol.2.page.txt")
        );
    }

    #[test]
    fn test_scratch_paths_stay_in_roots_and_are_unique() {
        let deriver = PathDeriver::new(&config());
        let key = ResourceKey::parse("page.jpg", &config()).unwrap();

        let a = deriver.scratch_transcript_stem(&key);
        let b = deriver.scratch_transcript_stem(&key);
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(Path::new("/data/transcripts")));

        let img = deriver.scratch_image_path(&key);
        assert_eq!(img.parent(), Some(Path::new("/data/images")));
        assert!(img.file_name().unwrap().to_str().unwrap().starts_with('.'));
    }
}
