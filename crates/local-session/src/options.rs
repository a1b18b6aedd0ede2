//! Configuration for the session cache and per-call option flags.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Garbage collection is off unless asked for.
pub const DEFAULT_GC: bool = false;

/// Default chance that a `get` triggers a sweep.
pub const DEFAULT_PROBABILITY: f64 = 0.05;

/// Default grace period past `_expire` before a record can be swept.
pub const DEFAULT_MAX_LIFETIME_MS: i64 = 60_000;

/// Callback receiving diagnostic messages from the sweep.
pub type DebugSink = Arc<dyn Fn(&str) + Send + Sync>;

const MUST_BE_BOOLEAN: &str = "must be a boolean";
const MUST_BE_NUMBER: &str = "must be a number";
const PROBABILITY_RANGE: &str =
    "must be a number equal to or less than 1 and greater than 0 when options.gc is enabled";
const MAX_LIFETIME_RANGE: &str =
    "must be a number greater than or equal to 0 when options.gc is enabled";
const MUST_BE_FUNCTION: &str = "must be a function";

/// Configuration for a [`SessionCache`](crate::SessionCache).
#[derive(Clone)]
pub struct SessionCacheOptions {
    /// Run the lazy sweep on the read path.
    pub gc: bool,

    /// Chance in (0, 1] that an eligible `get` runs a sweep.
    pub probability: f64,

    /// Grace period (ms) added to `_expire` before a record is reclaimable.
    pub max_lifetime_ms: i64,

    /// Optional receiver for sweep diagnostics.
    pub debug: Option<DebugSink>,
}

impl Default for SessionCacheOptions {
    fn default() -> Self {
        Self {
            gc: DEFAULT_GC,
            probability: DEFAULT_PROBABILITY,
            max_lifetime_ms: DEFAULT_MAX_LIFETIME_MS,
            debug: None,
        }
    }
}

impl fmt::Debug for SessionCacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCacheOptions")
            .field("gc", &self.gc)
            .field("probability", &self.probability)
            .field("max_lifetime_ms", &self.max_lifetime_ms)
            .field("debug", &self.debug.is_some())
            .finish()
    }
}

impl SessionCacheOptions {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable garbage collection.
    pub fn with_gc(mut self, enabled: bool) -> Self {
        self.gc = enabled;
        self
    }

    /// Set the sweep probability.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Set the grace period in milliseconds.
    pub fn with_max_lifetime(mut self, max_lifetime_ms: i64) -> Self {
        self.max_lifetime_ms = max_lifetime_ms;
        self
    }

    /// Attach a debug sink.
    pub fn with_debug<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.debug = Some(Arc::new(sink));
        self
    }

    /// Check every option against its constraints.
    ///
    /// The first failing option is reported. Range checks on `probability`
    /// and `max_lifetime_ms` only apply when `gc` is enabled. A grace period
    /// of 0 is allowed, so its message reads "greater than or equal to 0".
    pub fn validate(&self) -> Result<()> {
        if !self.probability.is_finite() {
            return Err(Error::option("probability", MUST_BE_NUMBER));
        }
        if self.gc && !(self.probability > 0.0 && self.probability <= 1.0) {
            return Err(Error::option("probability", PROBABILITY_RANGE));
        }
        if self.gc && self.max_lifetime_ms < 0 {
            return Err(Error::option("maxlifetime", MAX_LIFETIME_RANGE));
        }
        Ok(())
    }

    /// Build options from a loosely typed JSON value.
    ///
    /// `null` yields the defaults. Keys are `gc`, `probability`,
    /// `maxlifetime` and `debug`; unknown keys are ignored. Since
    /// `probability` always carries a value once defaults are merged,
    /// `maxlifetime` is type-checked on every call.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => return Err(Error::InvalidOptions),
        };

        let mut options = Self::default();

        if let Some(gc) = map.get("gc") {
            options.gc = gc
                .as_bool()
                .ok_or_else(|| Error::option("gc", MUST_BE_BOOLEAN))?;
        }

        if let Some(probability) = map.get("probability") {
            options.probability = probability
                .as_f64()
                .ok_or_else(|| Error::option("probability", MUST_BE_NUMBER))?;
        }

        if let Some(max_lifetime) = map.get("maxlifetime") {
            let ms = max_lifetime
                .as_f64()
                .ok_or_else(|| Error::option("maxlifetime", MUST_BE_NUMBER))?;
            options.max_lifetime_ms = ms.floor() as i64;
        }

        match map.get("debug") {
            None | Some(Value::Null) => {}
            Some(_) => return Err(Error::option("debug", MUST_BE_FUNCTION)),
        }

        options.validate()?;
        Ok(options)
    }
}

/// What a `set` call resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetIntent {
    /// Update the existing record in place, or create it.
    Upsert,
    /// Destroy any existing record and create a fresh one.
    Replace,
}

/// Flags the session middleware passes to `set`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SetOptions {
    pub changed: bool,
    pub rolling: bool,
    pub renew: bool,
    pub force: bool,
    /// Passed through by the middleware; not interpreted.
    pub max_age: Option<u64>,
}

impl SetOptions {
    /// Create options with every flag unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `changed` flag.
    pub fn with_changed(mut self, changed: bool) -> Self {
        self.changed = changed;
        self
    }

    /// Set the `rolling` flag.
    pub fn with_rolling(mut self, rolling: bool) -> Self {
        self.rolling = rolling;
        self
    }

    /// Set the `renew` flag.
    pub fn with_renew(mut self, renew: bool) -> Self {
        self.renew = renew;
        self
    }

    /// Set the `force` flag.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the pass-through `maxAge` hint.
    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Resolve the flags into an intent.
    ///
    /// `changed`/`rolling` win over `renew`/`force`. Each flag is read at
    /// most once. `None` means no recognised flag was set.
    pub fn intent(&self) -> Option<SetIntent> {
        if self.changed || self.rolling {
            Some(SetIntent::Upsert)
        } else if self.renew || self.force {
            Some(SetIntent::Replace)
        } else {
            None
        }
    }
}

/// Options the session middleware passes to `get`. Not interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOptions {
    pub rolling: bool,
}
