//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pageocr_core::{OcrEngine, PageController};
use tokio::sync::Mutex;

use crate::auth::AccessGate;

/// Application state containing shared resources.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Page lifecycle controller (owns storage, engine and key locks)
    pub pages: PageController,
    /// Request admission rules for page routes
    pub gate: AccessGate,
    /// Largest accepted page image in bytes
    pub max_image_bytes: usize,
    /// Engine availability as reported by `/health`
    pub engine_probe: EngineProbe,
}

impl AppState {
    pub fn new(
        pages: PageController,
        gate: AccessGate,
        max_image_bytes: usize,
        engine_probe: EngineProbe,
    ) -> Self {
        Self {
            pages,
            gate,
            max_image_bytes,
            engine_probe,
        }
    }
}

/// Engine availability, re-checked at most once per `ttl`.
///
/// Concurrent callers share one check; the rest wait on the lock and read
/// its result.
#[derive(Clone, Debug)]
pub struct EngineProbe {
    ttl: Duration,
    last: Arc<Mutex<Option<(Instant, bool)>>>,
}

impl EngineProbe {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn is_available(&self, engine: &dyn OcrEngine) -> bool {
        let mut last = self.last.lock().await;
        if let Some((checked_at, available)) = *last {
            if checked_at.elapsed() < self.ttl {
                return available;
            }
        }

        let available = engine.is_available().await;
        tracing::debug!(engine = engine.name(), available, "Engine probed");
        *last = Some((Instant::now(), available));
        available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageocr_core::MockEngine;

    #[tokio::test]
    async fn test_engine_check_is_reused_within_ttl() {
        let engine = MockEngine::new();
        let probe = EngineProbe::new(Duration::from_secs(60));

        for _ in 0..5 {
            assert!(probe.is_available(&engine).await);
        }
        assert_eq!(engine.probes(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_checks_every_time() {
        let engine = MockEngine::new();
        let probe = EngineProbe::new(Duration::ZERO);

        probe.is_available(&engine).await;
        probe.is_available(&engine).await;
        assert_eq!(engine.probes(), 2);
    }
}
