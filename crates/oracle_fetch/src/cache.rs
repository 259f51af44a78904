use oracle_core::snapshot::Snapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::aggregate::SnapshotSource;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

struct Cached {
    snapshot: Arc<Snapshot>,
    fetched_at: Instant,
}

/// Holds the last snapshot for `ttl`.
///
/// The lock is held across an aggregation pass, so callers arriving while a
/// refresh is running wait for it and then share its result instead of
/// starting passes of their own.
pub struct SnapshotCache<S> {
    source: S,
    ttl: Duration,
    state: Mutex<Option<Cached>>,
}

impl<S: SnapshotSource> SnapshotCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Cached snapshot when fresh, otherwise a new one.
    pub async fn get(&self) -> Arc<Snapshot> {
        self.refresh(false).await
    }

    /// Re-runs the aggregation when `force` is set or the entry is stale.
    pub async fn refresh(&self, force: bool) -> Arc<Snapshot> {
        let mut state = self.state.lock().await;
        if !force {
            if let Some(cached) = state.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < self.ttl {
                    debug!(age_secs = age.as_secs(), "serving cached snapshot");
                    return Arc::clone(&cached.snapshot);
                }
            }
        }

        let snapshot = Arc::new(self.source.collect().await);
        *state = Some(Cached {
            snapshot: Arc::clone(&snapshot),
            fetched_at: Instant::now(),
        });
        snapshot
    }

    /// Last snapshot regardless of age, without fetching.
    pub async fn peek(&self) -> Option<Arc<Snapshot>> {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|cached| Arc::clone(&cached.snapshot))
    }

    pub async fn age(&self) -> Option<Duration> {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|cached| cached.fetched_at.elapsed())
    }

    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}
