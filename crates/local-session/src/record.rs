//! Session records and the payload markers the middleware writes into them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Absolute expiry timestamp (ms since epoch) written by the middleware.
pub const EXPIRE_MARKER: &str = "_expire";

/// Max-age hint written by the middleware. Carried, never interpreted.
pub const MAX_AGE_MARKER: &str = "_maxAge";

/// Flag marking a session-length record that never expires by time.
pub const SESSION_MARKER: &str = "_session";

/// Caller-owned session data.
///
/// A thin wrapper over a JSON object. The cache only ever reads the
/// `_expire` and `_session` markers; everything else is opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionPayload(Map<String, Value>);

impl SessionPayload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `_expire` marker.
    pub fn with_expire(mut self, expire_ms: i64) -> Self {
        self.0.insert(EXPIRE_MARKER.to_string(), Value::from(expire_ms));
        self
    }

    /// Set the `_session` marker.
    pub fn with_session_length(mut self, session: bool) -> Self {
        self.0.insert(SESSION_MARKER.to_string(), Value::Bool(session));
        self
    }

    /// Insert an arbitrary field, returning the payload for chaining.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Insert an arbitrary field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Look up a field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The `_expire` marker, if present and numeric. Fractions are kept.
    pub fn expire(&self) -> Option<f64> {
        self.0.get(EXPIRE_MARKER).and_then(Value::as_f64)
    }

    /// The `_maxAge` marker, if present and numeric.
    pub fn max_age(&self) -> Option<i64> {
        self.0.get(MAX_AGE_MARKER).and_then(as_millis)
    }

    /// Whether `_session` is exactly `true`.
    pub fn is_session_length(&self) -> bool {
        matches!(self.0.get(SESSION_MARKER), Some(Value::Bool(true)))
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into the underlying JSON object.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for SessionPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn as_millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|ms| ms as i64))
}

/// One cached session entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Session key, unique within a cache.
    pub key: String,

    /// Creation time (ms since epoch). Never changes after construction.
    pub created_at: i64,

    /// Caller-supplied data, replaced on update.
    pub payload: SessionPayload,

    /// Time-to-live hint from the caller. Stored, not enforced.
    pub ttl: Option<u64>,
}

impl SessionRecord {
    /// Build a fresh record stamped with `now_ms`.
    pub fn new(
        key: impl Into<String>,
        payload: SessionPayload,
        ttl: Option<u64>,
        now_ms: i64,
    ) -> Self {
        Self {
            key: key.into(),
            created_at: now_ms,
            payload,
            ttl,
        }
    }

    /// Whether `get` should hand this record out at `now_ms`.
    ///
    /// A record without a numeric `_expire` is never live.
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        self.payload
            .expire()
            .is_some_and(|expire| expire > now_ms as f64)
    }

    /// Whether the sweep may remove this record at `now_ms`.
    ///
    /// Session-length records are never reclaimable. A missing `_expire`
    /// counts as the epoch, so such records go on the first sweep.
    pub fn is_reclaimable_at(&self, now_ms: i64, grace_ms: i64) -> bool {
        if self.payload.is_session_length() {
            return false;
        }
        let expire = self.payload.expire().unwrap_or(0.0);
        now_ms as f64 > expire + grace_ms as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_markers_are_read_from_payload() {
        let payload = SessionPayload::new()
            .with("views", 1)
            .with_expire(5_000)
            .with(MAX_AGE_MARKER, 86_400_000);

        assert_eq!(payload.expire(), Some(5_000.0));
        assert_eq!(payload.max_age(), Some(86_400_000));
        assert!(!payload.is_session_length());
        assert_eq!(payload.get("views"), Some(&json!(1)));
    }

    #[test]
    fn test_session_marker_must_be_true() {
        let truthy_string = SessionPayload::new().with(SESSION_MARKER, "yes");
        assert!(!truthy_string.is_session_length());

        let flagged = SessionPayload::new().with_session_length(true);
        assert!(flagged.is_session_length());
    }

    #[test]
    fn test_fractional_expire_compared_exactly() {
        let payload = SessionPayload::new().with(EXPIRE_MARKER, 1_500.5);
        assert_eq!(payload.expire(), Some(1_500.5));

        let record = SessionRecord::new("k", payload, None, 0);
        assert!(record.is_live_at(1_500));
        assert!(!record.is_live_at(1_501));

        assert!(!record.is_reclaimable_at(1_510, 10));
        assert!(record.is_reclaimable_at(1_511, 10));
    }

    #[test]
    fn test_payload_serializes_as_plain_object() {
        let payload = SessionPayload::new().with("views", 3).with_expire(10);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"views": 3, "_expire": 10}));

        let back: SessionPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_liveness_is_strict() {
        let record = SessionRecord::new("k", SessionPayload::new().with_expire(100), None, 0);
        assert!(record.is_live_at(99));
        assert!(!record.is_live_at(100));
        assert!(!record.is_live_at(101));
    }

    #[test]
    fn test_record_without_expire_is_never_live() {
        let record = SessionRecord::new("k", SessionPayload::new(), Some(15_000), 0);
        assert!(!record.is_live_at(i64::MIN));
        assert!(record.is_reclaimable_at(1, 0));
    }

    #[test]
    fn test_reclaim_waits_for_grace_period() {
        let record = SessionRecord::new("k", SessionPayload::new().with_expire(1_000), None, 0);
        assert!(!record.is_live_at(1_500));
        assert!(!record.is_reclaimable_at(1_500, 1_000));
        assert!(!record.is_reclaimable_at(2_000, 1_000));
        assert!(record.is_reclaimable_at(2_001, 1_000));
    }

    #[test]
    fn test_session_length_never_reclaimable() {
        let payload = SessionPayload::new().with_expire(0).with_session_length(true);
        let record = SessionRecord::new("k", payload, None, 0);
        assert!(!record.is_reclaimable_at(i64::MAX, 0));
    }
}
