//! Cache Layer — best-effort Redis snapshot cache keyed by request
//! fingerprint, plus in-process single-flight so concurrent misses on the
//! same fingerprint perform the work once.
//!
//! Backend unavailability is never an error: lookups miss, writes are
//! dropped with a warning, and computation proceeds locally.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::AppError;

/// Budget for a single cache backend operation.
const CACHE_OP_TIMEOUT: Duration = Duration::from_millis(200);

fn cache_key(fingerprint: &str) -> String {
    format!("analysis:{fingerprint}")
}

#[derive(Clone)]
pub struct AnalysisCache {
    conn: Option<ConnectionManager>,
    default_ttl_secs: u64,
}

impl AnalysisCache {
    /// Connect to the cache backend. `rediss://` URLs get TLS via the
    /// client's TLS support. A failed connection degrades to a no-op cache.
    pub async fn connect(cache_url: &str, default_ttl_secs: u64) -> AnalysisCache {
        let conn = match redis::Client::open(cache_url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => Some(conn),
                Err(e) => {
                    warn!(error = %e, "Cache backend unreachable; running without cache");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Invalid cache URL; running without cache");
                None
            }
        };
        AnalysisCache {
            conn,
            default_ttl_secs,
        }
    }

    /// A cache that never hits; used in tests and when no backend is set.
    pub fn disabled() -> AnalysisCache {
        AnalysisCache {
            conn: None,
            default_ttl_secs: 0,
        }
    }

    /// Liveness probe for health reporting.
    pub async fn ping(&self) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };
        let probe = async {
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .is_ok()
        };
        tokio::time::timeout(CACHE_OP_TIMEOUT, probe)
            .await
            .unwrap_or(false)
    }

    pub async fn get<T: DeserializeOwned>(&self, fingerprint: &str) -> Option<T> {
        let mut conn = self.conn.clone()?;
        let lookup = async {
            let raw: Option<String> = conn.get(cache_key(fingerprint)).await.ok()?;
            serde_json::from_str(&raw?).ok()
        };
        match tokio::time::timeout(CACHE_OP_TIMEOUT, lookup).await {
            Ok(hit @ Some(_)) => {
                debug!(fingerprint, "Cache hit");
                hit
            }
            Ok(None) => None,
            Err(_) => {
                warn!(fingerprint, "Cache get timed out");
                None
            }
        }
    }

    /// Store a snapshot with the given TTL (default when `None`). Failures
    /// are logged and swallowed.
    pub async fn put<T: Serialize>(&self, fingerprint: &str, value: &T, ttl_secs: Option<u64>) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let Ok(serialized) = serde_json::to_string(value) else {
            warn!(fingerprint, "Cache value failed to serialize");
            return;
        };
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        let write = async {
            conn.set_ex::<_, _, ()>(cache_key(fingerprint), serialized, ttl)
                .await
        };
        match tokio::time::timeout(CACHE_OP_TIMEOUT, write).await {
            Ok(Ok(())) => debug!(fingerprint, ttl, "Cache write"),
            Ok(Err(e)) => warn!(fingerprint, error = %e, "Cache write failed"),
            Err(_) => warn!(fingerprint, "Cache write timed out"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Single-flight
// ────────────────────────────────────────────────────────────────────────────

/// Deduplicates concurrent computations per fingerprint within this
/// process. Later callers wait for the in-flight computation and pick its
/// result up from the cache.
#[derive(Default)]
pub struct SingleFlight {
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl SingleFlight {
    pub fn new() -> SingleFlight {
        SingleFlight::default()
    }

    /// Returns `(value, cache_hit)`. At most one `compute` future runs
    /// concurrently for a given fingerprint; callers that arrive while it
    /// runs re-check the cache once the first completes.
    pub async fn compute_or_load<T, F, Fut>(
        &self,
        cache: &AnalysisCache,
        fingerprint: &str,
        compute: F,
    ) -> Result<(T, bool), AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if let Some(value) = cache.get::<T>(fingerprint).await {
            return Ok((value, true));
        }

        let lock = self
            .inflight
            .entry(fingerprint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;

        // A computation that finished while we waited has populated the
        // cache by now.
        if let Some(value) = cache.get::<T>(fingerprint).await {
            drop(guard);
            self.release(fingerprint, &lock);
            return Ok((value, true));
        }

        let result = compute().await;
        drop(guard);
        self.release(fingerprint, &lock);
        result.map(|value| (value, false))
    }

    fn release(&self, fingerprint: &str, lock: &Arc<Mutex<()>>) {
        // Drop the map entry once no other caller holds a handle: the map's
        // reference plus ours make two.
        self.inflight.remove_if(fingerprint, |_, v| {
            Arc::ptr_eq(v, lock) && Arc::strong_count(v) <= 2
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_cache_key_schema() {
        assert_eq!(cache_key("abc123"), "analysis:abc123");
    }

    #[tokio::test]
    async fn test_disabled_cache_misses_and_accepts_writes() {
        let cache = AnalysisCache::disabled();
        cache.put("fp", &serde_json::json!({"x": 1}), None).await;
        let got: Option<serde_json::Value> = cache.get("fp").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_single_flight_runs_compute_on_miss() {
        let cache = AnalysisCache::disabled();
        let flight = SingleFlight::new();
        let (value, hit) = flight
            .compute_or_load(&cache, "fp", || async { Ok::<_, AppError>(41 + 1) })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert!(!hit);
    }

    #[tokio::test]
    async fn test_single_flight_serializes_concurrent_computes() {
        let cache = Arc::new(AnalysisCache::disabled());
        let flight = Arc::new(SingleFlight::new());
        let concurrent = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let flight = flight.clone();
            let concurrent = concurrent.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .compute_or_load(&cache, "same-fp", || async move {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, AppError>(7)
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            let (value, _) = handle.await.unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1, "computes overlapped");
    }

    #[tokio::test]
    async fn test_single_flight_distinct_keys_do_not_block() {
        let cache = AnalysisCache::disabled();
        let flight = SingleFlight::new();

        let started = std::time::Instant::now();
        let (a, b) = tokio::join!(
            flight.compute_or_load(&cache, "fp-a", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, AppError>(1)
            }),
            flight.compute_or_load(&cache, "fp-b", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, AppError>(2)
            }),
        );
        assert_eq!(a.unwrap().0, 1);
        assert_eq!(b.unwrap().0, 2);
        assert!(started.elapsed() < Duration::from_millis(95));
    }

    #[tokio::test]
    async fn test_single_flight_cleans_up_inflight_entries() {
        let cache = AnalysisCache::disabled();
        let flight = SingleFlight::new();
        for _ in 0..3 {
            flight
                .compute_or_load(&cache, "fp", || async { Ok::<_, AppError>(0) })
                .await
                .unwrap();
        }
        assert!(flight.inflight.is_empty());
    }

    #[tokio::test]
    async fn test_single_flight_propagates_compute_errors() {
        let cache = AnalysisCache::disabled();
        let flight = SingleFlight::new();
        let result = flight
            .compute_or_load::<i32, _, _>(&cache, "fp", || async {
                Err(AppError::Busy)
            })
            .await;
        assert!(matches!(result, Err(AppError::Busy)));
        // Entry is cleaned up even on error.
        assert!(flight.inflight.is_empty());
    }
}
