//! In-memory freshness cache for upstream API responses
//!
//! Provides a `CacheManager` that keeps one entry per key together with the time
//! it was fetched, refreshes entries older than a freshness window, and falls back
//! to the previous payload when a refresh attempt fails.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default freshness window for cached payloads (5 minutes)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// A cached payload and the moment it was fetched
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    /// The cached payload
    data: T,
    /// Wall-clock time of the fetch, reported to clients
    fetched_at: DateTime<Utc>,
    /// Monotonic time of the fetch, used for age checks
    fetched_instant: Instant,
}

impl<T> CacheEntry<T> {
    fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_instant)
    }
}

/// Error from the most recent failed refresh of a key
type SharedError = Box<dyn Any + Send + Sync>;

/// Refresh coordination for one key
#[derive(Debug, Default)]
struct KeyLock {
    /// Number of refresh attempts that have finished
    attempts: AtomicU64,
    /// Held while a refresh runs; holds the error if the last attempt failed
    refresh: tokio::sync::Mutex<Option<SharedError>>,
}

/// Where the data returned by [`CacheManager::get`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    /// Served from a cache entry still inside its freshness window
    Hit,
    /// Fetched from upstream during this call
    Fetched,
    /// Refresh failed; the previous payload is being served past its window
    Stale,
}

impl CacheSource {
    /// Value for the `X-Cache` response header
    pub fn as_header_value(self) -> &'static str {
        match self {
            CacheSource::Hit => "HIT",
            CacheSource::Fetched => "MISS",
            CacheSource::Stale => "STALE",
        }
    }
}

/// Result of reading through the cache, including metadata about freshness
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    /// The cached or freshly fetched payload
    pub data: T,
    /// When the payload was fetched from upstream
    pub fetched_at: DateTime<Utc>,
    /// How the payload was obtained
    pub source: CacheSource,
}

/// Diagnostic view of a single cache key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub key: String,
    pub cached: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub age_seconds: Option<u64>,
    pub max_age_seconds: u64,
    pub fresh: bool,
}

/// Shared store of upstream payloads keyed by logical resource
///
/// One `CacheManager` is built at startup and handed to every request handler.
/// Entries are never evicted; only [`CacheManager::clear`] removes them. Concurrent
/// callers asking for the same expired key wait on a per-key lock so that only one
/// of them reaches upstream. Callers that waited behind a failed refresh share its
/// outcome instead of retrying.
#[derive(Debug)]
pub struct CacheManager<T = serde_json::Value> {
    /// Cached entries by key
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    /// Per-key refresh locks, kept for the life of the cache
    in_flight: Mutex<HashMap<String, Arc<KeyLock>>>,
    /// Bumped by `clear`; a fetch that started before a clear is not stored
    clears: AtomicU64,
    /// Freshness window used by `status` and by callers that don't pick their own
    max_age: Duration,
}

impl<T> Default for CacheManager<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}

impl<T> CacheManager<T> {
    /// Creates an empty cache with the given freshness window
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            clears: AtomicU64::new(0),
            max_age,
        }
    }

    /// The configured freshness window
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry; the next `get` for any key goes upstream
    ///
    /// Returns the number of entries removed. Fetches already in flight still
    /// answer their callers but do not repopulate the cache.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.write_entries();
            let removed = entries.len();
            entries.clear();
            self.clears.fetch_add(1, Ordering::AcqRel);
            removed
        };
        info!(removed, "Cleared response cache");
        removed
    }

    /// Reports whether `key` is cached and how old it is, without fetching
    pub fn status(&self, key: &str) -> CacheStatus {
        let entries = self.read_entries();
        self.status_of(key, entries.get(key))
    }

    /// Status of every cached key, sorted by key
    pub fn status_all(&self) -> Vec<CacheStatus> {
        let entries = self.read_entries();
        let mut statuses: Vec<CacheStatus> = entries
            .iter()
            .map(|(key, entry)| self.status_of(key, Some(entry)))
            .collect();
        statuses.sort_by(|a, b| a.key.cmp(&b.key));
        statuses
    }

    fn status_of(&self, key: &str, entry: Option<&CacheEntry<T>>) -> CacheStatus {
        let max_age_seconds = self.max_age.as_secs();
        match entry {
            Some(entry) => {
                let age = entry.age();
                CacheStatus {
                    key: key.to_string(),
                    cached: true,
                    fetched_at: Some(entry.fetched_at),
                    age_seconds: Some(age.as_secs()),
                    max_age_seconds,
                    fresh: age < self.max_age,
                }
            }
            None => CacheStatus {
                key: key.to_string(),
                cached: false,
                fetched_at: None,
                age_seconds: None,
                max_age_seconds,
                fresh: false,
            },
        }
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!(lock_kind = "rwlock.read", "Recovered from poisoned cache lock");
            poisoned.into_inner()
        })
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!(lock_kind = "rwlock.write", "Recovered from poisoned cache lock");
            poisoned.into_inner()
        })
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, Arc<KeyLock>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| {
            warn!(lock_kind = "mutex.lock", "Recovered from poisoned cache lock");
            poisoned.into_inner()
        })
    }

    /// Returns the refresh lock for `key`, creating it on first use
    fn key_lock(&self, key: &str) -> Arc<KeyLock> {
        self.lock_in_flight()
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

impl<T: Clone> CacheManager<T> {
    /// Returns the payload for `key`, fetching it when missing or older than `max_age`
    ///
    /// # Behavior
    /// - A cached entry younger than `max_age` is returned without calling `fetch`
    /// - Otherwise `fetch` runs; on success its result replaces the entry
    /// - If `fetch` fails and an entry exists (of any age), that entry is returned
    ///   unchanged as [`CacheSource::Stale`]; its fetch time is not advanced
    /// - If `fetch` fails and nothing is cached, the error is returned
    /// - Callers that waited on another caller's failed refresh of the same key
    ///   get that attempt's outcome (stale entry or a clone of its error) without
    ///   calling `fetch`
    pub async fn get<F, Fut, E>(
        &self,
        key: &str,
        max_age: Duration,
        fetch: F,
    ) -> Result<CachedData<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + Clone + Send + Sync + 'static,
    {
        if let Some(hit) = self.fresh_entry(key, max_age) {
            debug!(key, "Cache hit");
            return Ok(hit);
        }

        let key_lock = self.key_lock(key);
        let attempts_seen = key_lock.attempts.load(Ordering::Acquire);
        let mut last_failure = key_lock.refresh.lock().await;

        // Another caller may have refreshed the entry while we waited.
        if let Some(hit) = self.fresh_entry(key, max_age) {
            debug!(key, "Cache hit after waiting for in-flight refresh");
            return Ok(hit);
        }

        if key_lock.attempts.load(Ordering::Acquire) != attempts_seen {
            if let Some(shared) = last_failure.as_ref() {
                if let Some(outcome) = self.shared_failure(key, shared) {
                    return outcome;
                }
            }
        }

        let clears_seen = self.clears.load(Ordering::Acquire);
        let outcome = match fetch().await {
            Ok(data) => {
                *last_failure = None;
                Ok(self.store(key, data, clears_seen))
            }
            Err(error) => {
                *last_failure = Some(Box::new(error.clone()));
                match self.stale_entry(key) {
                    Some(stale) => {
                        warn!(
                            key,
                            error = %error,
                            age_seconds = ?self.status(key).age_seconds,
                            "Upstream refresh failed, serving stale cache entry"
                        );
                        Ok(stale)
                    }
                    None => {
                        warn!(key, error = %error, "Upstream fetch failed with nothing cached");
                        Err(error)
                    }
                }
            }
        };
        key_lock.attempts.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Outcome for a caller that waited behind a failed refresh of `key`
    ///
    /// Returns `None` when there is nothing to share, in which case the caller
    /// fetches for itself.
    fn shared_failure<E>(&self, key: &str, failure: &SharedError) -> Option<Result<CachedData<T>, E>>
    where
        E: Clone + 'static,
    {
        if let Some(stale) = self.stale_entry(key) {
            debug!(key, "Serving stale entry after a failed in-flight refresh");
            return Some(Ok(stale));
        }
        let error = failure.downcast_ref::<E>()?.clone();
        debug!(key, "Sharing error from a failed in-flight refresh");
        Some(Err(error))
    }

    /// Inserts freshly fetched data unless the cache was cleared since the fetch began
    fn store(&self, key: &str, data: T, clears_seen: u64) -> CachedData<T> {
        let fetched_at = Utc::now();
        let mut entries = self.write_entries();
        if self.clears.load(Ordering::Acquire) == clears_seen {
            entries.insert(
                key.to_string(),
                CacheEntry {
                    data: data.clone(),
                    fetched_at,
                    fetched_instant: Instant::now(),
                },
            );
            debug!(key, "Cache refreshed from upstream");
        } else {
            debug!(key, "Cache cleared during fetch, not storing result");
        }
        CachedData {
            data,
            fetched_at,
            source: CacheSource::Fetched,
        }
    }

    fn stale_entry(&self, key: &str) -> Option<CachedData<T>> {
        let entries = self.read_entries();
        let entry = entries.get(key)?;
        Some(CachedData {
            data: entry.data.clone(),
            fetched_at: entry.fetched_at,
            source: CacheSource::Stale,
        })
    }

    fn fresh_entry(&self, key: &str, max_age: Duration) -> Option<CachedData<T>> {
        let entries = self.read_entries();
        let entry = entries.get(key)?;
        if entry.age() < max_age {
            Some(CachedData {
                data: entry.data.clone(),
                fetched_at: entry.fetched_at,
                source: CacheSource::Hit,
            })
        } else {
            None
        }
    }
}
