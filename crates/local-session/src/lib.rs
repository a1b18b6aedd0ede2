//! In-memory session store with lazy garbage collection.
//!
//! This crate provides the storage half of a cookie-session setup:
//! - A keyed record map honouring the middleware's `_expire` and
//!   `_session` payload markers
//! - `set` resolution from the `changed`/`rolling`/`renew`/`force` flags
//! - A probability-gated sweep on the read path instead of a timer task
//!
//! # Example
//!
//! ```rust,ignore
//! use local_session::{SessionCache, SessionCacheOptions, SessionPayload, SetOptions};
//!
//! let options = SessionCacheOptions::default()
//!     .with_gc(true)
//!     .with_probability(0.05)
//!     .with_max_lifetime(60_000);
//!
//! let cache = SessionCache::new(options)?;
//! let payload = SessionPayload::new().with("views", 1).with_expire(expire_ms);
//! cache.set("abc123", payload, Some(15_000), &SetOptions::new().with_changed(true))?;
//! ```

mod cache;
mod clock;
mod error;
mod gc;
mod options;
mod record;
mod store;

pub use cache::{CacheStats, SessionCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ErrorKind, Result};
pub use gc::{FixedRandom, RandomSource, ThreadRandom};
pub use options::{
    DEFAULT_GC, DEFAULT_MAX_LIFETIME_MS, DEFAULT_PROBABILITY, DebugSink, GetOptions,
    SessionCacheOptions, SetIntent, SetOptions,
};
pub use record::{
    EXPIRE_MARKER, MAX_AGE_MARKER, SESSION_MARKER, SessionPayload, SessionRecord,
};
pub use store::SessionStore;
