//! Cached, de-duplicated project discovery.
//!
//! Walking the home directory is slow, and several views ask for the same
//! result at once. [`DiscoveryCache`] keeps one cached result and at most one
//! walk in flight:
//!
//! ```text
//! Idle ──discover──▶ Inflight ──ok──▶ Cached ──ttl/invalidate──▶ Idle
//!                        │
//!                        └──err──▶ Idle
//! ```
//!
//! Callers asking for the same `(depth, include_protected)` while a walk runs
//! share its result. A request with different parameters supersedes the
//! running walk: its callers still get their answer, but it is not cached.
//! An abort signal only detaches its own caller; [`DiscoveryCache::cancel`]
//! stops the walk for everyone.

use crate::scanner::{scan_project_directories, DEFAULT_DISCOVERY_DEPTH};
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The caller's own abort signal fired.
    #[error("discovery aborted")]
    Aborted,

    /// The walk was cancelled through [`DiscoveryCache::cancel`].
    #[error("discovery cancelled")]
    Cancelled,

    #[error("discovery failed: {0}")]
    Walk(String),
}

pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// The expensive directory walk being cached.
pub trait DirectoryWalker: Send + Sync + 'static {
    fn walk(
        &self,
        depth: usize,
        include_protected: bool,
    ) -> BoxFuture<'static, DiscoveryResult<Vec<String>>>;
}

/// Walks a home directory with [`scan_project_directories`] on the blocking pool.
#[derive(Debug, Clone)]
pub struct ScanWalker {
    home: PathBuf,
}

impl ScanWalker {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

impl DirectoryWalker for ScanWalker {
    fn walk(
        &self,
        depth: usize,
        include_protected: bool,
    ) -> BoxFuture<'static, DiscoveryResult<Vec<String>>> {
        let home = self.home.clone();
        Box::pin(async move {
            tracing::info!(home = %home.display(), depth, include_protected, "walking home directory");
            tokio::task::spawn_blocking(move || {
                scan_project_directories(&home, depth, include_protected)
            })
            .await
            .map_err(|e| DiscoveryError::Walk(e.to_string()))
        })
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub depth: usize,
    pub include_protected: bool,
    /// Drop the cache and any running walk, then walk again.
    pub force: bool,
    pub signal: Option<CancellationToken>,
}

impl DiscoveryRequest {
    pub fn new(depth: usize, include_protected: bool) -> Self {
        Self {
            depth,
            include_protected,
            force: false,
            signal: None,
        }
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    fn key(&self) -> Key {
        Key {
            depth: self.depth,
            include_protected: self.include_protected,
        }
    }
}

impl Default for DiscoveryRequest {
    fn default() -> Self {
        Self::new(DEFAULT_DISCOVERY_DEPTH, false)
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Key {
    depth: usize,
    include_protected: bool,
}

type WalkOutcome = DiscoveryResult<Arc<Vec<String>>>;

struct CacheEntry {
    key: Key,
    timestamp: Instant,
    directories: Arc<Vec<String>>,
}

struct Inflight {
    key: Key,
    rx: watch::Receiver<Option<WalkOutcome>>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    cache: Option<CacheEntry>,
    inflight: Option<Inflight>,
    /// Bumped whenever the running walk is superseded; a walk only writes the
    /// cache if its token is still current.
    token: u64,
}

impl Slot {
    fn fresh(&self, key: Key, ttl: Duration) -> Option<Vec<String>> {
        self.cache
            .as_ref()
            .filter(|entry| entry.key == key && entry.timestamp.elapsed() < ttl)
            .map(|entry| entry.directories.as_ref().clone())
    }

    /// Forget the running walk without stopping it.
    fn supersede(&mut self) {
        if self.inflight.take().is_some() {
            self.token += 1;
        }
    }
}

/// Single-slot cache around a [`DirectoryWalker`]. Clones share state.
pub struct DiscoveryCache<W> {
    walker: Arc<W>,
    ttl: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl<W> Clone for DiscoveryCache<W> {
    fn clone(&self) -> Self {
        Self {
            walker: Arc::clone(&self.walker),
            ttl: self.ttl,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<W: DirectoryWalker> DiscoveryCache<W> {
    pub fn new(walker: W) -> Self {
        Self::with_ttl(walker, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(walker: W, ttl: Duration) -> Self {
        Self {
            walker: Arc::new(walker),
            ttl,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn walker(&self) -> &W {
        &self.walker
    }

    /// Return the project directories for `req`, walking only when needed.
    pub async fn discover(&self, req: DiscoveryRequest) -> DiscoveryResult<Vec<String>> {
        if req.signal.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(DiscoveryError::Aborted);
        }
        let key = req.key();

        let rx = {
            let mut slot = self.slot.lock().await;
            if req.force {
                slot.cache = None;
                slot.supersede();
            } else if let Some(directories) = slot.fresh(key, self.ttl) {
                tracing::debug!(depth = key.depth, "discovery cache hit");
                return Ok(directories);
            }

            let joinable = slot
                .inflight
                .as_ref()
                .filter(|inflight| inflight.key == key && !inflight.handle.is_finished())
                .map(|inflight| inflight.rx.clone());
            match joinable {
                Some(rx) => {
                    tracing::debug!(depth = key.depth, "joining in-flight discovery");
                    rx
                }
                None => {
                    slot.supersede();
                    self.start_walk(&mut slot, key)
                }
            }
        };

        wait(rx, req.signal).await
    }

    fn start_walk(&self, slot: &mut Slot, key: Key) -> watch::Receiver<Option<WalkOutcome>> {
        slot.token += 1;
        let token = slot.token;
        let (tx, rx) = watch::channel(None);
        let walker = Arc::clone(&self.walker);
        let state = Arc::clone(&self.slot);

        let handle = tokio::spawn(async move {
            let outcome: WalkOutcome = walker
                .walk(key.depth, key.include_protected)
                .await
                .map(Arc::new);

            {
                let mut slot = state.lock().await;
                if slot.token == token {
                    if let Ok(directories) = &outcome {
                        slot.cache = Some(CacheEntry {
                            key,
                            timestamp: Instant::now(),
                            directories: Arc::clone(directories),
                        });
                    }
                    slot.inflight = None;
                } else {
                    tracing::debug!(depth = key.depth, "discarding superseded discovery result");
                }
            }

            if let Err(e) = &outcome {
                tracing::warn!(error = %e, "project discovery failed");
            }
            let _ = tx.send(Some(outcome));
        });

        slot.inflight = Some(Inflight {
            key,
            rx: rx.clone(),
            handle,
        });
        rx
    }

    /// Drop the cached result. A running walk is left alone.
    pub async fn invalidate(&self) {
        self.slot.lock().await.cache = None;
    }

    /// Stop the running walk. Everyone waiting on it gets
    /// [`DiscoveryError::Cancelled`].
    pub async fn cancel(&self) {
        let mut slot = self.slot.lock().await;
        slot.token += 1;
        if let Some(inflight) = slot.inflight.take() {
            inflight.handle.abort();
        }
    }

    /// The cached directories for these parameters, if still fresh.
    pub async fn cached(&self, depth: usize, include_protected: bool) -> Option<Vec<String>> {
        let key = Key {
            depth,
            include_protected,
        };
        self.slot.lock().await.fresh(key, self.ttl)
    }
}

async fn wait(
    mut rx: watch::Receiver<Option<WalkOutcome>>,
    signal: Option<CancellationToken>,
) -> DiscoveryResult<Vec<String>> {
    let settled = async move {
        let outcome: Option<WalkOutcome> = match rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            // sender dropped without a result: the walk task was aborted
            Err(_) => None,
        };
        outcome.unwrap_or(Err(DiscoveryError::Cancelled))
    };

    let outcome = match signal {
        Some(signal) => tokio::select! {
            outcome = settled => outcome,
            _ = signal.cancelled() => return Err(DiscoveryError::Aborted),
        },
        None => settled.await,
    };
    outcome.map(|directories| directories.as_ref().clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeWalker {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl FakeWalker {
        fn new(delay_ms: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(delay_ms),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(0)
            }
        }
    }

    impl DirectoryWalker for FakeWalker {
        fn walk(
            &self,
            depth: usize,
            include_protected: bool,
        ) -> BoxFuture<'static, DiscoveryResult<Vec<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay;
            let fail = self.fail;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                if fail {
                    return Err(DiscoveryError::Walk("permission denied".into()));
                }
                Ok(vec![format!("/home/u/depth-{depth}-{include_protected}")])
            })
        }
    }

    fn calls(cache: &DiscoveryCache<FakeWalker>) -> usize {
        cache.walker().calls.load(Ordering::SeqCst)
    }

    fn req(depth: usize) -> DiscoveryRequest {
        DiscoveryRequest::new(depth, false)
    }

    #[tokio::test]
    async fn cache_hit_within_ttl() {
        let cache = DiscoveryCache::with_ttl(FakeWalker::new(0), Duration::from_millis(200));
        let first = cache.discover(req(3)).await.unwrap();
        let second = cache.discover(req(3)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls(&cache), 1);
        assert_eq!(cache.cached(3, false).await, Some(first));
    }

    #[tokio::test]
    async fn cache_expires_after_ttl() {
        let cache = DiscoveryCache::with_ttl(FakeWalker::new(0), Duration::from_millis(30));
        cache.discover(req(3)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.discover(req(3)).await.unwrap();
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_walk() {
        let cache = DiscoveryCache::new(FakeWalker::new(50));
        let (a, b) = tokio::join!(cache.discover(req(5)), cache.discover(req(5)));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls(&cache), 1);
    }

    #[tokio::test]
    async fn pre_aborted_signal_never_walks() {
        let cache = DiscoveryCache::new(FakeWalker::new(0));
        let signal = CancellationToken::new();
        signal.cancel();
        let err = cache
            .discover(req(2).with_signal(signal))
            .await
            .unwrap_err();
        assert_eq!(err, DiscoveryError::Aborted);
        assert_eq!(calls(&cache), 0);
    }

    #[tokio::test]
    async fn abort_detaches_caller_but_walk_still_fills_cache() {
        let cache = DiscoveryCache::new(FakeWalker::new(60));
        let signal = CancellationToken::new();
        let trigger = signal.clone();
        let (res, _) = tokio::join!(cache.discover(req(4).with_signal(signal)), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        assert_eq!(res.unwrap_err(), DiscoveryError::Aborted);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.cached(4, false).await.is_some());
        cache.discover(req(4)).await.unwrap();
        assert_eq!(calls(&cache), 1);
    }

    #[tokio::test]
    async fn force_always_walks_again() {
        let cache = DiscoveryCache::new(FakeWalker::new(0));
        cache.discover(req(3)).await.unwrap();
        cache.discover(req(3).force()).await.unwrap();
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test]
    async fn different_parameters_supersede_running_walk() {
        let cache = DiscoveryCache::new(FakeWalker::new(40));
        let (shallow, deep) = tokio::join!(cache.discover(req(1)), cache.discover(req(9)));
        // the superseded caller still gets its own answer
        assert_eq!(shallow.unwrap(), vec!["/home/u/depth-1-false".to_string()]);
        assert_eq!(deep.unwrap(), vec!["/home/u/depth-9-false".to_string()]);
        assert_eq!(calls(&cache), 2);

        // but only the latest walk was cached
        assert!(cache.cached(1, false).await.is_none());
        assert!(cache.cached(9, false).await.is_some());
    }

    #[tokio::test]
    async fn include_protected_is_part_of_the_key() {
        let cache = DiscoveryCache::new(FakeWalker::new(0));
        cache.discover(DiscoveryRequest::new(3, false)).await.unwrap();
        cache.discover(DiscoveryRequest::new(3, true)).await.unwrap();
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let cache = DiscoveryCache::new(FakeWalker::new(200));
        let (res, _) = tokio::join!(cache.discover(req(3)), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.cancel().await;
        });
        assert_eq!(res.unwrap_err(), DiscoveryError::Cancelled);
        assert!(cache.cached(3, false).await.is_none());
    }

    #[tokio::test]
    async fn failed_walk_is_not_cached() {
        let cache = DiscoveryCache::new(FakeWalker::failing());
        assert!(matches!(
            cache.discover(req(3)).await,
            Err(DiscoveryError::Walk(_))
        ));
        assert!(cache.discover(req(3)).await.is_err());
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_next_walk() {
        let cache = DiscoveryCache::new(FakeWalker::new(0));
        cache.discover(req(3)).await.unwrap();
        cache.invalidate().await;
        cache.discover(req(3)).await.unwrap();
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test]
    async fn scan_walker_finds_projects() {
        let home = TempDir::new().unwrap();
        std::fs::create_dir_all(home.path().join("work/app/.claude/agents")).unwrap();
        let cache = DiscoveryCache::new(ScanWalker::new(home.path()));
        let found = cache.discover(DiscoveryRequest::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("app"));
    }
}
