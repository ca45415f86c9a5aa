//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default number of compiled schemas kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Configuration for a [`FormEngine`](crate::FormEngine).
///
/// Every field has a default, so a partial TOML or JSON document
/// deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Keep compiled schemas keyed by fingerprint.
    pub cache_enabled: bool,
    /// Maximum number of cached compiled schemas.
    pub cache_capacity: u64,
    /// Reject rules, validations and `dependsOn` entries that name
    /// fields the schema does not have.
    pub strict_references: bool,
    /// Reject derive rules that feed into each other.
    pub reject_derive_cycles: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            strict_references: true,
            reject_derive_cycles: true,
        }
    }
}

impl EngineConfig {
    /// Configuration with the cache turned off.
    #[must_use]
    pub fn uncached() -> Self {
        Self {
            cache_enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }

    #[must_use]
    pub fn with_reject_derive_cycles(mut self, reject: bool) -> Self {
        self.reject_derive_cycles = reject;
        self
    }
}
