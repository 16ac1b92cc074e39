//! Page resource lifecycle.
//!
//! Decides, per verb, which store and engine calls happen and in what order.
//! State-changing sequences (generate-then-commit, replace, delete) run under
//! a per-key lock; cache hits are served without one.
//!
//! Generation runs on its own task. Concurrent reads of the same key and
//! variant subscribe to that task's outcome instead of starting another engine
//! run, and a reader going away does not cancel it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::PageConfig;
use crate::error::{OcrError, PageError, Result};
use crate::key::{PathDeriver, ResourceKey};
use crate::locks::KeyLocks;
use crate::ocr::OcrEngine;
use crate::store::{DeletionReport, ResourceStore};
use crate::variant::TranscriptVariant;

/// Where a served transcript came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Already on disk
    Hit,
    /// Produced by an engine run for this request (or one it joined)
    Generated {
        generated_at: DateTime<Utc>,
        duration: Duration,
    },
}

/// Transcript bytes ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub variant: TranscriptVariant,
    pub bytes: Vec<u8>,
    pub cache: CacheStatus,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub key: ResourceKey,
    pub bytes: u64,
    /// Cached transcripts of the previous image that were discarded
    pub invalidated: DeletionReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Transcript(Transcript),
    /// No image under this key
    NoContent,
    /// The client named no representation we can produce
    NotAcceptable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(DeletionReport),
    /// No image under this key
    NoContent,
}

type GenerationResult = Result<ReadOutcome>;
type InflightMap = DashMap<(String, TranscriptVariant), watch::Receiver<Option<GenerationResult>>>;

struct Inner {
    config: PageConfig,
    store: ResourceStore,
    engine: Arc<dyn OcrEngine>,
    locks: KeyLocks,
    inflight: Arc<InflightMap>,
}

/// Orchestrates create, read and delete for page resources.
#[derive(Clone)]
pub struct PageController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageController")
            .field("config", &self.inner.config)
            .field("engine", &self.inner.engine.name())
            .field("active_locks", &self.inner.locks.active())
            .field("inflight", &self.inner.inflight.len())
            .finish()
    }
}

impl PageController {
    pub fn new(config: PageConfig, engine: Arc<dyn OcrEngine>) -> Self {
        let store = ResourceStore::new(PathDeriver::new(&config));
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                engine,
                locks: KeyLocks::new(),
                inflight: Arc::new(DashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &PageConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &ResourceStore {
        &self.inner.store
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.inner.engine
    }

    /// Validate a client-supplied identifier against this controller's config.
    pub fn parse_key(&self, raw: &str) -> Result<ResourceKey> {
        ResourceKey::parse(raw, &self.inner.config).inspect_err(|e| {
            debug!(key = raw, error = %e, "Rejected identifier");
        })
    }

    /// Store (or replace) the image for `raw_key`.
    ///
    /// Replacing an image discards its cached transcripts; the next read
    /// regenerates from the new bytes.
    #[instrument(level = "info", skip_all, fields(key = raw_key, bytes = bytes.len()))]
    pub async fn create(&self, raw_key: &str, bytes: &[u8]) -> Result<Created> {
        let key = self.parse_key(raw_key)?;
        let _guard = self.inner.locks.acquire(key.stem()).await;

        let written = self.inner.store.put(&key, bytes).await?;
        let invalidated = self.inner.store.remove_transcripts(&key).await?;

        info!(
            invalidated_text = invalidated.text,
            invalidated_html = invalidated.html,
            "Page image stored"
        );
        Ok(Created {
            key,
            bytes: written,
            invalidated,
        })
    }

    /// Serve the transcript for `raw_key`, generating it on first request.
    #[instrument(level = "info", skip_all, fields(key = raw_key, variant = ?variant))]
    pub async fn read(
        &self,
        raw_key: &str,
        variant: Option<TranscriptVariant>,
    ) -> Result<ReadOutcome> {
        let key = self.parse_key(raw_key)?;

        if !self.inner.store.exists(&key).await? {
            debug!("Image not found");
            return Ok(ReadOutcome::NoContent);
        }

        let Some(variant) = variant else {
            debug!("No acceptable representation requested");
            return Ok(ReadOutcome::NotAcceptable);
        };

        if let Some(bytes) = self.inner.store.read_transcript(&key, variant).await? {
            debug!(%variant, bytes = bytes.len(), "Transcript cache hit");
            return Ok(ReadOutcome::Transcript(Transcript {
                variant,
                bytes,
                cache: CacheStatus::Hit,
            }));
        }

        self.generate(key, variant).await
    }

    /// Remove the image and every cached transcript for `raw_key`.
    #[instrument(level = "info", skip_all, fields(key = raw_key))]
    pub async fn delete(&self, raw_key: &str) -> Result<DeleteOutcome> {
        let key = self.parse_key(raw_key)?;

        if !self.inner.store.exists(&key).await? {
            debug!("Image not found");
            return Ok(DeleteOutcome::NoContent);
        }

        // Waits out any generation in flight for this key.
        let _guard = self.inner.locks.acquire(key.stem()).await;
        let report = self.inner.store.delete_all(&key).await?;

        if !report.image {
            // Removed by a concurrent delete while we waited.
            return Ok(DeleteOutcome::NoContent);
        }

        info!(text = report.text, html = report.html, "Page deleted");
        Ok(DeleteOutcome::Deleted(report))
    }

    /// Join the generation in flight for (key, variant), or start one.
    async fn generate(&self, key: ResourceKey, variant: TranscriptVariant) -> Result<ReadOutcome> {
        let slot = (key.as_str().to_string(), variant);

        let mut outcome = match self.inner.inflight.entry(slot.clone()) {
            Entry::Occupied(entry) => {
                debug!(%variant, "Joining in-flight generation");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(rx.clone());
                self.spawn_generation(slot, key, variant, tx);
                rx
            }
        };

        let result = outcome
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|value| value.clone());

        result.unwrap_or_else(|| {
            Err(PageError::Generation(OcrError::Aborted(
                "generation task ended without a result".to_string(),
            )))
        })
    }

    fn spawn_generation(
        &self,
        slot: (String, TranscriptVariant),
        key: ResourceKey,
        variant: TranscriptVariant,
        tx: watch::Sender<Option<GenerationResult>>,
    ) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // Clears the slot even if generation panics.
            let slot = InflightSlot {
                map: Arc::clone(&inner.inflight),
                slot: Some(slot),
            };
            let guard = inner.locks.acquire(key.stem()).await;
            let result = inner.generate_locked(&key, variant).await;
            let _ = tx.send(Some(result));

            // Retire the slot before releasing the key: once a replace holds
            // the lock, no reader may join this generation.
            drop(slot);
            drop(guard);
        });
    }
}

impl Inner {
    /// Produce a transcript. The caller holds the key lock.
    async fn generate_locked(
        &self,
        key: &ResourceKey,
        variant: TranscriptVariant,
    ) -> Result<ReadOutcome> {
        // Re-check under the lock: a delete or another generation may have
        // finished while we waited.
        if !self.store.exists(key).await? {
            debug!(key = %key, "Image deleted before generation started");
            return Ok(ReadOutcome::NoContent);
        }
        if let Some(bytes) = self.store.read_transcript(key, variant).await? {
            return Ok(ReadOutcome::Transcript(Transcript {
                variant,
                bytes,
                cache: CacheStatus::Hit,
            }));
        }

        self.store.ensure_roots().await?;
        let paths = self.store.paths();
        let image = paths.image_path(key);
        let scratch = paths.scratch_transcript_stem(key);

        let artifact = match self.engine.run(&image, &scratch, variant).await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.store.discard_scratch(&scratch).await;
                warn!(
                    key = %key,
                    %variant,
                    kind = e.kind(),
                    error = %e,
                    "Transcript generation failed"
                );
                return Err(PageError::Generation(e));
            }
        };

        let target = self.store.commit_transcript(key, &artifact).await?;
        let bytes = match self.store.read_transcript(key, variant).await? {
            Some(bytes) => bytes,
            None => return Err(PageError::Generation(OcrError::OutputMissing(target))),
        };

        info!(
            key = %key,
            %variant,
            duration_ms = artifact.duration.as_millis() as u64,
            bytes = bytes.len(),
            "Transcript cached"
        );

        Ok(ReadOutcome::Transcript(Transcript {
            variant,
            bytes,
            cache: CacheStatus::Generated {
                generated_at: artifact.generated_at,
                duration: artifact.duration,
            },
        }))
    }
}

/// Removes an in-flight entry when the generation task finishes.
struct InflightSlot {
    map: Arc<InflightMap>,
    slot: Option<(String, TranscriptVariant)>,
}

impl Drop for InflightSlot {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.map.remove(&slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::MockEngine;
    use std::path::Path;

    fn controller(dir: &Path, engine: Arc<MockEngine>) -> PageController {
        PageController::new(PageConfig::rooted_at(dir), engine)
    }

    fn transcript(outcome: ReadOutcome) -> Transcript {
        match outcome {
            ReadOutcome::Transcript(t) => t,
            other => panic!("expected a transcript, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_then_read_generates_from_image() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let pages = controller(dir.path(), Arc::clone(&engine));

        let created = pages.create("page.jpg", b"call me ishmael").await.unwrap();
        assert_eq!(created.bytes, 15);

        for variant in TranscriptVariant::ALL {
            let t = transcript(pages.read("page.jpg", Some(variant)).await.unwrap());
            assert_eq!(t.variant, variant);
            assert_eq!(t.bytes, MockEngine::render(b"call me ishmael", variant));
            assert!(matches!(t.cache, CacheStatus::Generated { .. }));
        }
        assert_eq!(engine.runs(), 2);
    }

    #[tokio::test]
    async fn test_cached_transcript_is_not_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let pages = controller(dir.path(), Arc::clone(&engine));

        pages.create("page.jpg", b"text").await.unwrap();
        pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap();
        let second = transcript(pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap());

        assert_eq!(second.cache, CacheStatus::Hit);
        assert_eq!(engine.runs(), 1);
    }

    #[tokio::test]
    async fn test_read_missing_image_is_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let pages = controller(dir.path(), Arc::clone(&engine));

        let outcome = pages.read("ghost.jpg", Some(TranscriptVariant::Text)).await.unwrap();
        assert_eq!(outcome, ReadOutcome::NoContent);
        assert_eq!(engine.runs(), 0);
    }

    #[tokio::test]
    async fn test_read_without_variant_is_not_acceptable() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let pages = controller(dir.path(), Arc::clone(&engine));
        pages.create("page.jpg", b"x").await.unwrap();

        let outcome = pages.read("page.jpg", None).await.unwrap();
        assert_eq!(outcome, ReadOutcome::NotAcceptable);
        assert_eq!(engine.runs(), 0);

        let transcripts: Vec<_> = std::fs::read_dir(&pages.config().transcript_root)
            .unwrap()
            .collect();
        assert!(transcripts.is_empty(), "no transcript file may be touched");
    }

    #[tokio::test]
    async fn test_delete_then_read_is_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let pages = controller(dir.path(), Arc::clone(&engine));

        pages.create("page.jpg", b"x").await.unwrap();
        pages.read("page.jpg", Some(TranscriptVariant::Html)).await.unwrap();

        let outcome = pages.delete("page.jpg").await.unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted(DeletionReport {
                image: true,
                text: false,
                html: true
            })
        );

        let runs_before = engine.runs();
        let outcome = pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap();
        assert_eq!(outcome, ReadOutcome::NoContent);
        assert_eq!(engine.runs(), runs_before);

        assert_eq!(pages.delete("page.jpg").await.unwrap(), DeleteOutcome::NoContent);
    }

    #[tokio::test]
    async fn test_invalid_identifier_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pages = controller(dir.path(), Arc::new(MockEngine::new()));

        let err = pages.create("../../etc/passwd", b"root").await.unwrap_err();
        assert!(matches!(err, PageError::InvalidIdentifier(_)));
        assert!(!pages.config().image_root.exists());
        assert!(!dir.path().join("etc").exists());

        let err = pages.read("../x.jpg", Some(TranscriptVariant::Text)).await.unwrap_err();
        assert!(err.is_client_error());
        let err = pages.delete("a/b.jpg").await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_reupload_invalidates_cached_transcripts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let pages = controller(dir.path(), Arc::clone(&engine));

        pages.create("page.jpg", b"old").await.unwrap();
        pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap();

        let created = pages.create("page.jpg", b"new").await.unwrap();
        assert!(created.invalidated.text);
        assert!(!created.invalidated.html);
        assert_eq!(
            std::fs::read(pages.config().image_root.join("page.jpg")).unwrap(),
            b"new"
        );

        let t = transcript(pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap());
        assert_eq!(t.bytes, MockEngine::render(b"new", TranscriptVariant::Text));
        assert_eq!(engine.runs(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_image_root_is_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let pages = controller(dir.path(), Arc::clone(&engine));
        std::fs::write(&pages.config().image_root, b"not a directory").unwrap();

        let err = pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap_err();
        assert!(matches!(err, PageError::Storage { .. }));
        let err = pages.delete("page.jpg").await.unwrap_err();
        assert!(matches!(err, PageError::Storage { .. }));
        assert_eq!(engine.runs(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reupload_during_generation_is_not_joined_by_later_reads() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new().with_delay(Duration::from_millis(200)));
        let pages = controller(dir.path(), Arc::clone(&engine));
        pages.create("page.jpg", b"old").await.unwrap();

        let reader = {
            let pages = pages.clone();
            tokio::spawn(async move { pages.read("page.jpg", Some(TranscriptVariant::Text)).await })
        };
        // Let the generation take the lock first.
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Replacing waits for the generation, which is retired by then.
        pages.create("page.jpg", b"new").await.unwrap();
        assert_eq!(pages.inner.inflight.len(), 0);

        let old = transcript(reader.await.unwrap().unwrap());
        assert_eq!(old.bytes, MockEngine::render(b"old", TranscriptVariant::Text));

        let fresh = transcript(pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap());
        assert_eq!(fresh.bytes, MockEngine::render(b"new", TranscriptVariant::Text));
        assert_eq!(engine.runs(), 2);
    }

    #[tokio::test]
    async fn test_engine_failure_leaves_no_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::failing_with_partial_output(1));
        let pages = controller(dir.path(), Arc::clone(&engine));
        pages.create("page.jpg", b"smudged").await.unwrap();

        let err = pages.read("page.jpg", Some(TranscriptVariant::Html)).await.unwrap_err();
        assert!(matches!(
            err,
            PageError::Generation(OcrError::NonZeroExit { code: Some(1), .. })
        ));

        let key = pages.parse_key("page.jpg").unwrap();
        let cached = pages
            .store()
            .read_transcript(&key, TranscriptVariant::Html)
            .await
            .unwrap();
        assert_eq!(cached, None);
        let leftovers: Vec<_> = std::fs::read_dir(&pages.config().transcript_root)
            .unwrap()
            .collect();
        assert!(leftovers.is_empty(), "scratch output must be discarded");

        // Failures are not cached: the next read runs the engine again.
        let _ = pages.read("page.jpg", Some(TranscriptVariant::Html)).await;
        assert_eq!(engine.runs(), 2);
    }

    #[tokio::test]
    async fn test_output_missing_is_generation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pages = controller(dir.path(), Arc::new(MockEngine::without_output()));
        pages.create("page.jpg", b"blank").await.unwrap();

        let err = pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap_err();
        assert!(matches!(err, PageError::Generation(OcrError::OutputMissing(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_share_one_engine_run() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new().with_delay(Duration::from_millis(200)));
        let pages = controller(dir.path(), Arc::clone(&engine));
        pages.create("page.jpg", b"shared").await.unwrap();

        let readers: Vec<_> = (0..16)
            .map(|_| {
                let pages = pages.clone();
                tokio::spawn(async move { pages.read("page.jpg", Some(TranscriptVariant::Text)).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for reader in readers {
            outcomes.push(transcript(reader.await.unwrap().unwrap()));
        }

        assert_eq!(engine.runs(), 1);
        let expected = MockEngine::render(b"shared", TranscriptVariant::Text);
        assert!(outcomes.iter().all(|t| t.bytes == expected));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_share_one_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            MockEngine::failing(OcrError::Timeout(Duration::from_secs(9)))
                .with_delay(Duration::from_millis(200)),
        );
        let pages = controller(dir.path(), Arc::clone(&engine));
        pages.create("page.jpg", b"x").await.unwrap();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let pages = pages.clone();
                tokio::spawn(async move { pages.read("page.jpg", Some(TranscriptVariant::Html)).await })
            })
            .collect();

        for reader in readers {
            let err = reader.await.unwrap().unwrap_err();
            assert!(matches!(err, PageError::Generation(OcrError::Timeout(_))));
        }
        assert_eq!(engine.runs(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_waits_for_inflight_generation() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new().with_delay(Duration::from_millis(200)));
        let pages = controller(dir.path(), Arc::clone(&engine));
        pages.create("page.jpg", b"x").await.unwrap();

        let reader = {
            let pages = pages.clone();
            tokio::spawn(async move { pages.read("page.jpg", Some(TranscriptVariant::Text)).await })
        };
        // Let the generation take the lock first.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let outcome = pages.delete("page.jpg").await.unwrap();
        // The transcript written by the generation is removed with the image.
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted(DeletionReport {
                image: true,
                text: true,
                html: false
            })
        );
        assert!(reader.await.unwrap().is_ok());
        assert!(!pages.config().transcript_root.join("page.txt").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_generation_survives_dropped_reader() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new().with_delay(Duration::from_millis(150)));
        let pages = controller(dir.path(), Arc::clone(&engine));
        pages.create("page.jpg", b"x").await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            pages.read("page.jpg", Some(TranscriptVariant::Text)),
        )
        .await;
        assert!(abandoned.is_err(), "reader should have given up");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(pages.config().transcript_root.join("page.txt").exists());

        let t = transcript(pages.read("page.jpg", Some(TranscriptVariant::Text)).await.unwrap());
        assert_eq!(t.cache, CacheStatus::Hit);
        assert_eq!(engine.runs(), 1);
    }
}
