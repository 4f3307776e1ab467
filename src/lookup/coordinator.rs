//! Lookup Coordinator
//!
//! Implements the cache-aside policy: serve from the cache when a live entry
//! exists, otherwise fetch from upstream, populate the cache, and serve the
//! fresh value. Concurrent misses for the same key are coalesced onto a
//! single upstream call through an in-flight registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::error::{LookupError, Result};
use crate::lookup::{LookupStats, StatsSnapshot};
use crate::upstream::RepoSource;

// == Public Constants ==
/// GitHub's username length limit
pub const MAX_USERNAME_LENGTH: usize = 39;

// == Username Validation ==
/// Validates a username before it is used as both a cache key and a URL path
/// segment.
///
/// The accepted shape matches GitHub's own rules: ASCII letters, digits, and
/// hyphens, with no leading, trailing, or consecutive hyphens, at most 39
/// characters. No normalization is applied; lookups stay byte-exact.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(LookupError::InvalidKey("username is empty".to_string()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(LookupError::InvalidKey(format!(
            "username exceeds {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(LookupError::InvalidKey(
            "username may only contain ASCII letters, digits, and hyphens".to_string(),
        ));
    }
    if username.starts_with('-') || username.ends_with('-') || username.contains("--") {
        return Err(LookupError::InvalidKey(
            "hyphens may not lead, trail, or repeat".to_string(),
        ));
    }
    Ok(())
}

// == Resolution ==
/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Upstream,
}

/// A successfully resolved lookup.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub username: String,
    pub repos: u64,
    pub source: Source,
}

// == In-Flight Registry ==
/// Clone-able mirror of a fetch result, broadcast to coalesced waiters.
#[derive(Debug, Clone)]
enum FlightOutcome {
    Found(u64),
    NotFound,
    Failed(String),
}

impl FlightOutcome {
    fn from_result(result: &Result<u64>) -> Self {
        match result {
            Ok(repos) => FlightOutcome::Found(*repos),
            Err(LookupError::NotFound(_)) => FlightOutcome::NotFound,
            Err(err) => FlightOutcome::Failed(err.to_string()),
        }
    }

    fn into_result(self, username: &str) -> Result<u64> {
        match self {
            FlightOutcome::Found(repos) => Ok(repos),
            FlightOutcome::NotFound => Err(LookupError::NotFound(username.to_string())),
            FlightOutcome::Failed(msg) => Err(LookupError::UpstreamUnavailable(msg)),
        }
    }
}

type FlightMap = HashMap<String, broadcast::Sender<FlightOutcome>>;
type FlightRegistry = Mutex<FlightMap>;

/// The first miss for a key leads the fetch; later misses follow its result.
enum FlightRole {
    Leader(broadcast::Sender<FlightOutcome>),
    Follower(broadcast::Receiver<FlightOutcome>),
}

fn lock_registry(registry: &FlightRegistry) -> MutexGuard<'_, FlightMap> {
    // The registry holds no invariants a panicked writer could break
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the leader's registry entry when its fetch finishes or is cancelled.
/// On cancellation the sender drops with it, waking followers with a closed
/// channel so they can fetch for themselves.
struct FlightGuard<'a> {
    registry: &'a FlightRegistry,
    key: &'a str,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        lock_registry(self.registry).remove(self.key);
    }
}

// == Lookup Coordinator ==
/// Cache-aside coordinator over an injected store and upstream source.
///
/// Shared process-wide behind an `Arc`; all fields are internally
/// synchronized, so `resolve` takes `&self`.
pub struct LookupCoordinator {
    store: Arc<dyn CacheStore>,
    upstream: Arc<dyn RepoSource>,
    ttl: Duration,
    in_flight: FlightRegistry,
    stats: LookupStats,
}

impl LookupCoordinator {
    /// Creates a coordinator caching successful lookups for `ttl`.
    pub fn new(store: Arc<dyn CacheStore>, upstream: Arc<dyn RepoSource>, ttl: Duration) -> Self {
        Self {
            store,
            upstream,
            ttl,
            in_flight: Mutex::new(HashMap::new()),
            stats: LookupStats::new(),
        }
    }

    /// Returns a snapshot of the hit/miss counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // == Resolve ==
    /// Resolves `username` to its public repository count.
    ///
    /// A cache hit short-circuits all downstream work; staleness within the
    /// TTL is tolerated by design. On a miss the value is fetched upstream,
    /// written to the cache, and returned tagged `Source::Upstream`. Only
    /// successful lookups are cached: `NotFound` and upstream failures leave
    /// the cache untouched.
    pub async fn resolve(&self, username: &str) -> Result<Resolution> {
        validate_username(username)?;

        match self.store.get(username).await {
            Ok(Some(raw)) => match raw.parse::<u64>() {
                Ok(repos) => {
                    self.stats.record_hit();
                    debug!(username, repos, "serving from cache");
                    return Ok(Resolution {
                        username: username.to_string(),
                        repos,
                        source: Source::Cache,
                    });
                }
                // Corrupt entry: treat as a miss so it gets overwritten
                Err(_) => warn!(username, "cached value is not a count, refetching"),
            },
            Ok(None) => {}
            Err(err) => {
                // Fail open: availability over strict cache correctness
                warn!(username, error = %err, "cache read failed, falling through to upstream");
            }
        }

        self.stats.record_miss();
        let repos = self.fetch_coalesced(username).await?;
        Ok(Resolution {
            username: username.to_string(),
            repos,
            source: Source::Upstream,
        })
    }

    // == Coalesced Fetch ==
    /// Fetches `username` upstream, sharing the result with any concurrent
    /// misses for the same key.
    async fn fetch_coalesced(&self, username: &str) -> Result<u64> {
        let role = {
            let mut in_flight = lock_registry(&self.in_flight);
            match in_flight.get(username) {
                Some(tx) => FlightRole::Follower(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    in_flight.insert(username.to_string(), tx.clone());
                    FlightRole::Leader(tx)
                }
            }
        };

        match role {
            FlightRole::Leader(tx) => {
                let _guard = FlightGuard {
                    registry: &self.in_flight,
                    key: username,
                };
                let result = self.fetch_and_store(username).await;
                // No receivers is fine: nobody subscribed while we fetched
                let _ = tx.send(FlightOutcome::from_result(&result));
                result
            }
            FlightRole::Follower(mut rx) => {
                self.stats.record_coalesced();
                debug!(username, "awaiting in-flight upstream fetch");
                match rx.recv().await {
                    Ok(outcome) => outcome.into_result(username),
                    // Leader cancelled without publishing; fetch directly
                    Err(_) => self.fetch_and_store(username).await,
                }
            }
        }
    }

    /// Single upstream attempt followed by a best-effort cache write.
    async fn fetch_and_store(&self, username: &str) -> Result<u64> {
        self.stats.record_upstream_fetch();
        info!(username, "fetching from upstream");
        let repos = self.upstream.fetch_public_repos(username).await?;

        // A failed write must not fail the request
        if let Err(err) = self.store.set(username, &repos.to_string(), self.ttl).await {
            warn!(username, error = %err, "cache write failed, serving upstream value anyway");
        } else {
            debug!(username, repos, "cached upstream value");
        }

        Ok(repos)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    const TTL: Duration = Duration::from_secs(60);

    // == Test Doubles ==

    /// Upstream that serves a fixed user table and counts calls.
    struct CountingSource {
        calls: AtomicUsize,
        users: HashMap<String, u64>,
        delay: Duration,
    }

    impl CountingSource {
        fn with_user(username: &str, repos: u64) -> Self {
            let mut users = HashMap::new();
            users.insert(username.to_string(), repos);
            Self {
                calls: AtomicUsize::new(0),
                users,
                delay: Duration::ZERO,
            }
        }

        fn empty() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                users: HashMap::new(),
                delay: Duration::ZERO,
            }
        }

        fn slow(username: &str, repos: u64, delay: Duration) -> Self {
            let mut source = Self::with_user(username, repos);
            source.delay = delay;
            source
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RepoSource for CountingSource {
        async fn fetch_public_repos(&self, username: &str) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.users
                .get(username)
                .copied()
                .ok_or_else(|| LookupError::NotFound(username.to_string()))
        }
    }

    /// Upstream that always fails with a transient error.
    struct FailingSource;

    #[async_trait]
    impl RepoSource for FailingSource {
        async fn fetch_public_repos(&self, _username: &str) -> Result<u64> {
            Err(LookupError::UpstreamUnavailable(
                "connection refused".to_string(),
            ))
        }
    }

    /// Store whose reads fail; writes succeed.
    struct BrokenReadStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl CacheStore for BrokenReadStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(LookupError::CacheUnavailable("read timeout".to_string()))
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
            self.inner.set(key, value, ttl).await
        }
    }

    /// Store whose writes fail; reads succeed.
    struct BrokenWriteStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl CacheStore for BrokenWriteStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            Err(LookupError::CacheUnavailable("write timeout".to_string()))
        }
    }

    fn coordinator(
        store: Arc<dyn CacheStore>,
        upstream: Arc<dyn RepoSource>,
    ) -> LookupCoordinator {
        LookupCoordinator::new(store, upstream, TTL)
    }

    // == Cache-Aside Flow ==

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(CountingSource::with_user("octocat", 8));
        let coordinator = coordinator(store.clone(), source.clone());

        let first = coordinator.resolve("octocat").await.unwrap();
        assert_eq!(first.repos, 8);
        assert_eq!(first.source, Source::Upstream);

        let second = coordinator.resolve("octocat").await.unwrap();
        assert_eq!(second.repos, 8);
        assert_eq!(second.source, Source::Cache);

        // Second call never reached upstream
        assert_eq!(source.calls(), 1);

        let stats = coordinator.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.upstream_fetches, 1);
    }

    #[tokio::test]
    async fn test_hit_short_circuits_upstream() {
        let store = Arc::new(MemoryStore::new());
        store.set("octocat", "8", TTL).await.unwrap();
        let source = Arc::new(CountingSource::with_user("octocat", 99));
        let coordinator = coordinator(store, source.clone());

        let resolution = coordinator.resolve("octocat").await.unwrap();
        assert_eq!(resolution.repos, 8);
        assert_eq!(resolution.source, Source::Cache);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_staleness_within_ttl_is_tolerated() {
        let store = Arc::new(MemoryStore::new());
        store.set("octocat", "5", TTL).await.unwrap();
        // Upstream has since moved on to 8
        let source = Arc::new(CountingSource::with_user("octocat", 8));
        let coordinator = coordinator(store, source.clone());

        let resolution = coordinator.resolve("octocat").await.unwrap();
        assert_eq!(resolution.repos, 5);
        assert_eq!(resolution.source, Source::Cache);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_behaves_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("octocat", "5", Duration::from_millis(20))
            .await
            .unwrap();
        let source = Arc::new(CountingSource::with_user("octocat", 8));
        let coordinator = coordinator(store, source.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;

        let resolution = coordinator.resolve("octocat").await.unwrap();
        assert_eq!(resolution.repos, 8);
        assert_eq!(resolution.source, Source::Upstream);
        assert_eq!(source.calls(), 1);
    }

    // == Not Found ==

    #[tokio::test]
    async fn test_not_found_is_never_cached() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(CountingSource::empty());
        let coordinator = coordinator(store.clone(), source.clone());

        let first = coordinator.resolve("ghost-user-404").await;
        assert!(matches!(first, Err(LookupError::NotFound(_))));
        assert!(store.is_empty().await);

        // No negative caching: the next check goes upstream again
        let second = coordinator.resolve("ghost-user-404").await;
        assert!(matches!(second, Err(LookupError::NotFound(_))));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator(store.clone(), Arc::new(FailingSource));

        let result = coordinator.resolve("octocat").await;
        assert!(matches!(result, Err(LookupError::UpstreamUnavailable(_))));
        assert!(store.is_empty().await);
    }

    // == Fail-Open & Best-Effort Writes ==

    #[tokio::test]
    async fn test_store_read_failure_falls_through_to_upstream() {
        let store = Arc::new(BrokenReadStore {
            inner: MemoryStore::new(),
        });
        let source = Arc::new(CountingSource::with_user("octocat", 8));
        let coordinator = coordinator(store, source.clone());

        let resolution = coordinator.resolve("octocat").await.unwrap();
        assert_eq!(resolution.repos, 8);
        assert_eq!(resolution.source, Source::Upstream);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_write_failure_does_not_fail_request() {
        let store = Arc::new(BrokenWriteStore {
            inner: MemoryStore::new(),
        });
        let source = Arc::new(CountingSource::with_user("octocat", 8));
        let coordinator = coordinator(store, source.clone());

        let resolution = coordinator.resolve("octocat").await.unwrap();
        assert_eq!(resolution.repos, 8);
        assert_eq!(resolution.source, Source::Upstream);
    }

    #[tokio::test]
    async fn test_corrupt_cached_value_is_refetched() {
        let store = Arc::new(MemoryStore::new());
        store.set("octocat", "not-a-number", TTL).await.unwrap();
        let source = Arc::new(CountingSource::with_user("octocat", 8));
        let coordinator = coordinator(store.clone(), source.clone());

        let resolution = coordinator.resolve("octocat").await.unwrap();
        assert_eq!(resolution.repos, 8);
        assert_eq!(resolution.source, Source::Upstream);
        assert_eq!(source.calls(), 1);

        // The corrupt entry was overwritten with the fresh count
        let cached = store.get("octocat").await.unwrap();
        assert_eq!(cached.as_deref(), Some("8"));
    }

    // == Coalescing ==

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(CountingSource::slow(
            "octocat",
            8,
            Duration::from_millis(50),
        ));
        let coordinator = coordinator(store, source.clone());

        let (a, b) = tokio::join!(
            coordinator.resolve("octocat"),
            coordinator.resolve("octocat")
        );

        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.repos, 8);
        assert_eq!(b.repos, 8);
        assert_eq!(a.source, Source::Upstream);
        assert_eq!(b.source, Source::Upstream);

        assert_eq!(source.calls(), 1);
        assert_eq!(coordinator.stats().coalesced, 1);
    }

    #[tokio::test]
    async fn test_concurrent_not_found_shared_with_followers() {
        let store = Arc::new(MemoryStore::new());
        let mut source = CountingSource::empty();
        source.delay = Duration::from_millis(50);
        let source = Arc::new(source);
        let coordinator = coordinator(store.clone(), source.clone());

        let (a, b) = tokio::join!(
            coordinator.resolve("ghost-user-404"),
            coordinator.resolve("ghost-user-404")
        );

        assert!(matches!(a, Err(LookupError::NotFound(_))));
        assert!(matches!(b, Err(LookupError::NotFound(_))));
        assert_eq!(source.calls(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_cancelled_leader_leaves_follower_to_fetch() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(CountingSource::slow(
            "octocat",
            8,
            Duration::from_millis(100),
        ));
        let coordinator = Arc::new(LookupCoordinator::new(store, source.clone(), TTL));

        let leader = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.resolve("octocat").await }
        });

        // Give the leader time to register its in-flight entry and start fetching
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.calls(), 1);

        let follower = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.resolve("octocat").await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Cancel the leader mid-fetch; its drop guard clears the registry
        // entry, closing the channel the follower is waiting on
        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        let resolution = follower.await.unwrap().unwrap();
        assert_eq!(resolution.repos, 8);
        assert_eq!(resolution.source, Source::Upstream);

        // The leader's aborted call plus the follower's own fallback fetch
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let store = Arc::new(MemoryStore::new());
        let mut users = HashMap::new();
        users.insert("octocat".to_string(), 8);
        users.insert("torvalds".to_string(), 4);
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            users,
            delay: Duration::from_millis(30),
        });
        let coordinator = coordinator(store, source.clone());

        let (a, b) = tokio::join!(
            coordinator.resolve("octocat"),
            coordinator.resolve("torvalds")
        );

        assert_eq!(a.unwrap().repos, 8);
        assert_eq!(b.unwrap().repos, 4);
        assert_eq!(source.calls(), 2);
        assert_eq!(coordinator.stats().coalesced, 0);
    }

    // == Validation ==

    #[tokio::test]
    async fn test_invalid_username_rejected_before_any_io() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(CountingSource::with_user("octocat", 8));
        let coordinator = coordinator(store, source.clone());

        let result = coordinator.resolve("bad_user").await;
        assert!(matches!(result, Err(LookupError::InvalidKey(_))));
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_validate_username_accepts_valid_names() {
        let max_len = "x".repeat(39);
        for name in ["octocat", "a", "abc-def", "A1-b2-C3", max_len.as_str()] {
            assert!(validate_username(name).is_ok(), "expected {name:?} valid");
        }
    }

    #[test]
    fn test_validate_username_rejects_invalid_names() {
        let too_long = "x".repeat(40);
        for name in [
            "",
            too_long.as_str(),
            "bad_user",
            "-leading",
            "trailing-",
            "double--hyphen",
            "with space",
            "naïve",
            "../etc/passwd",
        ] {
            assert!(
                matches!(validate_username(name), Err(LookupError::InvalidKey(_))),
                "expected {name:?} invalid"
            );
        }
    }
}
