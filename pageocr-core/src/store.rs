//! On-disk storage of page images and transcripts.
//!
//! Every file becomes visible under its final name only through a rename, so
//! an unsynchronized reader sees either nothing or a complete file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::error::{PageError, Result};
use crate::key::{PathDeriver, ResourceKey};
use crate::ocr::Artifact;
use crate::variant::TranscriptVariant;

/// Which files a delete actually removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub image: bool,
    pub text: bool,
    pub html: bool,
}

impl DeletionReport {
    fn record(&mut self, variant: TranscriptVariant, removed: bool) {
        match variant {
            TranscriptVariant::Text => self.text = removed,
            TranscriptVariant::Html => self.html = removed,
        }
    }
}

/// Owns the image and transcript files for every key.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    paths: PathDeriver,
}

impl ResourceStore {
    pub fn new(paths: PathDeriver) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &PathDeriver {
        &self.paths
    }

    /// Create both roots if missing. Idempotent.
    pub async fn ensure_roots(&self) -> Result<()> {
        for root in [self.paths.image_root(), self.paths.transcript_root()] {
            let mut builder = tokio::fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            builder.mode(0o750);
            builder
                .create(root)
                .await
                .map_err(|e| PageError::storage(root, e))?;
        }
        Ok(())
    }

    /// Write (or replace) the image for `key`. Returns the byte count.
    pub async fn put(&self, key: &ResourceKey, bytes: &[u8]) -> Result<u64> {
        self.ensure_roots().await?;

        let target = self.paths.image_path(key);
        let scratch = self.paths.scratch_image_path(key);

        if let Err(e) = tokio::fs::write(&scratch, bytes).await {
            discard(&scratch).await;
            return Err(PageError::storage(&target, e));
        }
        if let Err(e) = tokio::fs::rename(&scratch, &target).await {
            discard(&scratch).await;
            return Err(PageError::storage(&target, e));
        }

        debug!(key = %key, path = %target.display(), bytes = bytes.len(), "Image stored");
        Ok(bytes.len() as u64)
    }

    /// Whether the image for `key` is present.
    ///
    /// Only a missing file counts as absent; any other metadata error is a
    /// storage failure.
    pub async fn exists(&self, key: &ResourceKey) -> Result<bool> {
        let path = self.paths.image_path(key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                error!(key = %key, path = %path.display(), error = %e, "Image metadata unreadable");
                Err(PageError::storage(path, e))
            }
        }
    }

    /// Load a cached transcript. `Ok(None)` means it has not been generated.
    pub async fn read_transcript(
        &self,
        key: &ResourceKey,
        variant: TranscriptVariant,
    ) -> Result<Option<Vec<u8>>> {
        let path = self.paths.transcript_path(key, variant);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PageError::storage(path, e)),
        }
    }

    /// Move a freshly generated artifact onto its cache path.
    pub async fn commit_transcript(&self, key: &ResourceKey, artifact: &Artifact) -> Result<PathBuf> {
        let target = self.paths.transcript_path(key, artifact.variant);
        if let Err(e) = tokio::fs::rename(&artifact.path, &target).await {
            discard(&artifact.path).await;
            return Err(PageError::storage(&target, e));
        }
        debug!(key = %key, path = %target.display(), "Transcript committed");
        Ok(target)
    }

    /// Remove whatever an engine run left at a scratch stem.
    pub async fn discard_scratch(&self, stem: &Path) {
        for variant in TranscriptVariant::ALL {
            discard(&crate::key::with_appended_extension(stem, variant.extension())).await;
        }
    }

    /// Remove both cached transcripts, leaving the image alone.
    pub async fn remove_transcripts(&self, key: &ResourceKey) -> Result<DeletionReport> {
        let mut report = DeletionReport::default();
        let mut first_error = None;

        for variant in TranscriptVariant::ALL {
            let path = self.paths.transcript_path(key, variant);
            match remove_if_present(&path).await {
                Ok(removed) => report.record(variant, removed),
                Err(e) => {
                    error!(key = %key, path = %path.display(), error = %e, "Transcript removal failed");
                    first_error.get_or_insert(PageError::storage(path, e));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Remove the image and each transcript variant.
    ///
    /// Every removal is attempted even if an earlier one fails; the first
    /// failure is returned after all attempts. `report.image == false` means
    /// there was no image to delete.
    pub async fn delete_all(&self, key: &ResourceKey) -> Result<DeletionReport> {
        let image_path = self.paths.image_path(key);
        let image = remove_if_present(&image_path).await;

        let transcripts = self.remove_transcripts(key).await;

        let image = image.map_err(|e| {
            error!(key = %key, path = %image_path.display(), error = %e, "Image removal failed");
            PageError::storage(image_path, e)
        })?;
        let mut report = transcripts?;
        report.image = image;
        Ok(report)
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

async fn discard(path: &Path) {
    if let Err(e) = remove_if_present(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
    }
}
