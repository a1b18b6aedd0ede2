//! Session cache with time-based expiry and lazy garbage collection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::gc::{RandomSource, SweepGuard, SweepReport, ThreadRandom, passes_gate};
use crate::options::{SessionCacheOptions, SetIntent, SetOptions};
use crate::record::{SessionPayload, SessionRecord};

const SWEEP_STARTING: &str = "garbage collection starting";

/// State shared between clones of a cache.
struct CacheInner {
    /// Records keyed by session key.
    entries: Mutex<HashMap<String, SessionRecord>>,

    /// Validated configuration.
    options: SessionCacheOptions,

    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,

    /// Set while a sweep is executing.
    gc_running: AtomicBool,

    /// Executed sweeps.
    sweeps: AtomicUsize,

    /// Records removed by sweeps.
    reclaimed: AtomicUsize,
}

/// In-memory session store with lazy, probability-gated garbage collection.
///
/// This cache provides:
/// - Lookups that honour the `_expire` and `_session` payload markers
/// - `set` resolution driven by the middleware's option flags
/// - An opportunistic sweep on the read path, gated by a random sample
/// - Thread-safe access via a mutex around the record map
///
/// Cloning yields another handle onto the same records.
pub struct SessionCache {
    inner: Arc<CacheInner>,
}

impl SessionCache {
    /// Create a cache using the system clock and a thread-local RNG.
    ///
    /// Options are validated before any state is built.
    pub fn new(options: SessionCacheOptions) -> Result<Self> {
        Self::with_parts(options, Arc::new(SystemClock), Arc::new(ThreadRandom))
    }

    /// Create a cache with an explicit clock and random source.
    pub fn with_parts(
        options: SessionCacheOptions,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self> {
        options.validate()?;

        debug!(
            gc = options.gc,
            probability = options.probability,
            max_lifetime_ms = options.max_lifetime_ms,
            "Session cache created"
        );

        let inner = CacheInner {
            entries: Mutex::new(HashMap::new()),
            options,
            clock,
            random,
            gc_running: AtomicBool::new(false),
            sweeps: AtomicUsize::new(0),
            reclaimed: AtomicUsize::new(0),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Get the cache configuration.
    pub fn options(&self) -> &SessionCacheOptions {
        &self.inner.options
    }

    /// Whether the sweep runs on the read path.
    pub fn gc_enabled(&self) -> bool {
        self.inner.options.gc
    }

    /// Chance that an eligible `get` runs a sweep.
    pub fn probability(&self) -> f64 {
        self.inner.options.probability
    }

    /// Grace period (ms) past `_expire` before a record can be swept.
    pub fn max_lifetime_ms(&self) -> i64 {
        self.inner.options.max_lifetime_ms
    }

    /// Whether a debug sink is attached.
    pub fn has_debug_sink(&self) -> bool {
        self.inner.options.debug.is_some()
    }

    /// Number of resident records, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Check if the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Check if a record is resident, ignoring expiry.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries.lock().contains_key(key)
    }

    /// Copy of the resident record for `key`, ignoring expiry.
    pub fn record(&self, key: &str) -> Option<SessionRecord> {
        self.inner.entries.lock().get(key).cloned()
    }

    /// Look up a live session payload.
    ///
    /// Runs the sweep first when garbage collection is enabled.
    /// Session-length records are returned without reading the clock;
    /// others only while `_expire` is strictly in the future.
    pub fn get(&self, key: &str) -> Option<SessionPayload> {
        if self.inner.options.gc {
            self.collect_garbage();
        }

        let entries = self.inner.entries.lock();
        let record = entries.get(key)?;

        if record.payload.is_session_length() {
            trace!(key = %key, "Session-length session found");
            return Some(record.payload.clone());
        }

        let now = self.inner.clock.now_ms();
        if record.is_live_at(now) {
            trace!(key = %key, "Session found");
            Some(record.payload.clone())
        } else {
            trace!(key = %key, expire = ?record.payload.expire(), "Session expired");
            None
        }
    }

    /// Store a session payload.
    ///
    /// `changed`/`rolling` update the record in place (keeping its
    /// creation time) or create it. Otherwise `renew`/`force` replace any
    /// existing record with a fresh one. With none of the flags set the
    /// call fails and nothing is written.
    pub fn set(
        &self,
        key: &str,
        payload: SessionPayload,
        ttl: Option<u64>,
        options: &SetOptions,
    ) -> Result<()> {
        let Some(intent) = options.intent() else {
            debug!(key = %key, "Cannot resolve session intent from options");
            return Err(Error::UnresolvableSession);
        };

        let mut entries = self.inner.entries.lock();

        match intent {
            SetIntent::Upsert => {
                if let Some(record) = entries.get_mut(key) {
                    record.ttl = ttl;
                    record.payload = payload;
                    trace!(key = %key, "Session updated");
                    return Ok(());
                }

                let record = SessionRecord::new(key, payload, ttl, self.inner.clock.now_ms());
                entries.insert(key.to_string(), record);
                trace!(key = %key, size = entries.len(), "Session created");
            }
            SetIntent::Replace => {
                let replaced = entries.remove(key).is_some();
                let record = SessionRecord::new(key, payload, ttl, self.inner.clock.now_ms());
                entries.insert(key.to_string(), record);
                trace!(key = %key, replaced, size = entries.len(), "Session renewed");
            }
        }

        Ok(())
    }

    /// Remove the record for `key`. Returns whether one was present.
    pub fn destroy(&self, key: &str) -> bool {
        let removed = self.inner.entries.lock().remove(key).is_some();
        if removed {
            trace!(key = %key, "Session destroyed");
        }
        removed
    }

    /// Run the lazy sweep, returning how many records it removed.
    ///
    /// Skipped (returning 0) when garbage collection is disabled, another
    /// sweep is running, the cache is empty, or the random sample exceeds
    /// the configured probability. Session-length records are never
    /// removed; others go once the clock passes `_expire` plus the grace
    /// period. A record without a numeric `_expire` is treated as expiring
    /// at the epoch and is removed by the first sweep that runs, rather
    /// than being kept forever.
    pub fn collect_garbage(&self) -> usize {
        let inner = &self.inner;

        if !inner.options.gc || inner.gc_running.load(Ordering::Acquire) || self.is_empty() {
            return 0;
        }

        let sample = inner.random.sample();
        if !passes_gate(sample, inner.options.probability) {
            trace!(sample, probability = inner.options.probability, "Sweep skipped");
            return 0;
        }

        let Some(guard) = SweepGuard::acquire(&inner.gc_running) else {
            return 0;
        };

        self.emit(SWEEP_STARTING);
        let started = Instant::now();
        let now = inner.clock.now_ms();
        let grace = inner.options.max_lifetime_ms;

        let (removed, size) = {
            let mut entries = inner.entries.lock();
            let before = entries.len();
            entries.retain(|key, record| {
                let reclaim = record.is_reclaimable_at(now, grace);
                if reclaim {
                    trace!(key = %key, "Reclaiming expired session");
                }
                !reclaim
            });
            (before - entries.len(), entries.len())
        };

        let report = SweepReport {
            removed,
            elapsed: started.elapsed(),
        };

        inner.sweeps.fetch_add(1, Ordering::Relaxed);
        inner.reclaimed.fetch_add(removed, Ordering::Relaxed);

        debug!(
            removed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            size,
            "Garbage collection finished"
        );

        self.emit(&report.finished_message());
        drop(guard);

        removed
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            sweeps: self.inner.sweeps.load(Ordering::Relaxed),
            reclaimed: self.inner.reclaimed.load(Ordering::Relaxed),
        }
    }

    fn emit(&self, message: &str) {
        if let Some(sink) = &self.inner.options.debug {
            sink(message);
        }
    }
}

impl Clone for SessionCache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCache")
            .field("options", &self.inner.options)
            .field("size", &self.len())
            .finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Resident records, expired ones included.
    pub size: usize,

    /// Sweeps that ran past the probability gate.
    pub sweeps: usize,

    /// Records removed by sweeps.
    pub reclaimed: usize,
}
