//! PageOCR Core - page image storage with lazily generated OCR transcripts
//!
//! A page is an image stored under a client-chosen file name. The first time
//! a transcript is requested in a given representation (plain text or hOCR
//! HTML), an OCR engine is run on the image and its output is cached next to
//! the other transcripts. Later requests are served from the cache until the
//! image is replaced or deleted.
//!
//! # Features
//!
//! - Identifier validation that keeps every derived path inside its root
//! - Pluggable OCR engines behind the [`OcrEngine`] trait
//! - At most one engine run per key and representation, however many readers
//! - Atomic visibility: transcripts appear only once complete
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pageocr_core::{MockEngine, PageConfig, PageController, ReadOutcome, TranscriptVariant};
//!
//! # async fn example() -> pageocr_core::Result<()> {
//! let pages = PageController::new(PageConfig::default(), Arc::new(MockEngine::new()));
//!
//! pages.create("page-1.jpg", b"scanned bytes").await?;
//! if let ReadOutcome::Transcript(t) = pages.read("page-1.jpg", Some(TranscriptVariant::Text)).await? {
//!     println!("{}", String::from_utf8_lossy(&t.bytes));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod key;
pub mod locks;
pub mod ocr;
pub mod store;
pub mod variant;

pub use config::PageConfig;
pub use controller::{
    CacheStatus, Created, DeleteOutcome, PageController, ReadOutcome, Transcript,
};
pub use error::{OcrError, PageError, Result};
pub use key::{PathDeriver, ResourceKey};
pub use locks::KeyLocks;
pub use ocr::{Artifact, MockEngine, OcrEngine, TesseractEngine};
pub use store::{DeletionReport, ResourceStore};
pub use variant::{negotiate, TranscriptVariant};
