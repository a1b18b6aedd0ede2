//! The store contract a session middleware drives.
//!
//! Middleware owns cookies, key generation and the `_expire`/`_session`
//! markers; a store only keeps payloads by key. [`SessionCache`]
//! implements the contract in memory.

use async_trait::async_trait;

use crate::cache::SessionCache;
use crate::error::Result;
use crate::options::{GetOptions, SetOptions};
use crate::record::SessionPayload;

/// Backend a session middleware reads from and writes to.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the payload for `key`, or `None` if absent or expired.
    async fn get(
        &self,
        key: &str,
        ttl: Option<u64>,
        options: &GetOptions,
    ) -> Result<Option<SessionPayload>>;

    /// Save `payload` under `key` according to the option flags.
    async fn set(
        &self,
        key: &str,
        payload: SessionPayload,
        ttl: Option<u64>,
        options: &SetOptions,
    ) -> Result<()>;

    /// Remove the session for `key`. Missing keys are not an error.
    async fn destroy(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl SessionStore for SessionCache {
    async fn get(
        &self,
        key: &str,
        _ttl: Option<u64>,
        _options: &GetOptions,
    ) -> Result<Option<SessionPayload>> {
        Ok(SessionCache::get(self, key))
    }

    async fn set(
        &self,
        key: &str,
        payload: SessionPayload,
        ttl: Option<u64>,
        options: &SetOptions,
    ) -> Result<()> {
        SessionCache::set(self, key, payload, ttl, options)
    }

    async fn destroy(&self, key: &str) -> Result<()> {
        SessionCache::destroy(self, key);
        Ok(())
    }
}
