//! Cache Entry Module
//!
//! Defines cache entries with TTL support, the payload kept in memory and
//! the versioned envelope used to persist entries as text.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cache::Ttl;

/// Envelope version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

// == Cache Entry ==
/// Represents a single cache entry with payload and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = permanent
    pub expires_at: Option<u64>,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new entry created at `now_ms` living for `ttl`.
    pub fn new(data: T, now_ms: u64, ttl: Ttl) -> Self {
        Self {
            data,
            created_at: now_ms,
            expires_at: ttl.expires_at(now_ms),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once the current time reaches its expiry instant,
    /// so a TTL that has fully elapsed never yields a hit.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None for permanent entries.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(now_ms))
    }

    /// Replaces the payload, keeping both timestamps.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            data: f(self.data),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

// == Payload ==
/// What the memory tier holds for one key.
///
/// Values that have a JSON form are kept as JSON. Values serde_json cannot
/// represent (maps with non-string keys, for instance) are kept as the
/// caller's own type so the memory tier still serves them.
#[derive(Clone)]
pub enum Payload {
    Json(Value),
    Native {
        value: Arc<dyn Any + Send + Sync>,
        /// Shallow size of the value, used for `memory_size`
        size: usize,
    },
}

impl Payload {
    /// Wraps a value that has no JSON form.
    pub fn native<T: Any + Send + Sync>(value: T) -> Self {
        Payload::Native {
            size: std::mem::size_of::<T>(),
            value: Arc::new(value),
        }
    }

    /// Approximate footprint: serialized length for JSON payloads.
    pub fn size(&self) -> usize {
        match self {
            Payload::Json(value) => serde_json::to_string(value)
                .map(|s| s.len())
                .unwrap_or(0),
            Payload::Native { size, .. } => *size,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Native { .. } => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Json(a), Payload::Json(b)) => a == b,
            (Payload::Native { value: a, .. }, Payload::Native { value: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Payload::Native { size, .. } => {
                f.debug_struct("Native").field("size", size).finish_non_exhaustive()
            }
        }
    }
}

// == Envelope Errors ==
/// Reasons a persisted envelope cannot be turned back into an entry.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u64),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    data: &'a T,
    created_at: u64,
    expires_at: Option<u64>,
}

// == Envelope Codec ==
impl<T: Serialize> CacheEntry<T> {
    /// Serializes the entry into its versioned text form.
    pub fn to_envelope(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&EnvelopeRef {
            schema_version: SCHEMA_VERSION,
            data: &self.data,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

impl CacheEntry<Value> {

    /// Parses a versioned envelope.
    ///
    /// The version is checked before the body is decoded so that envelopes
    /// written by a newer layout are rejected rather than half-read.
    pub fn from_envelope(raw: &str) -> Result<Self, EnvelopeError> {
        let mut value: Value = serde_json::from_str(raw)?;
        let version = value
            .get("schema_version")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if version != u64::from(SCHEMA_VERSION) {
            return Err(EnvelopeError::UnsupportedVersion(version));
        }
        if let Some(object) = value.as_object_mut() {
            object.remove("schema_version");
        }
        Ok(serde_json::from_value(value)?)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_permanent() {
        let entry = CacheEntry::new("value".to_string(), 1_000, Ttl::Permanent);

        assert_eq!(entry.data, "value");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(u64::MAX));
        assert!(entry.ttl_remaining_ms(5_000).is_none());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new(7, 1_000, Ttl::from_millis(500));

        assert_eq!(entry.expires_at, Some(1_500));
        assert!(!entry.is_expired_at(1_499));
        assert_eq!(entry.ttl_remaining_ms(1_200), Some(300));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("v", 1_000, Ttl::Expires(Duration::ZERO));

        // Expires exactly at creation time
        assert!(entry.is_expired_at(1_000), "Entry should be expired at boundary");
        assert_eq!(entry.ttl_remaining_ms(2_000), Some(0));
    }

    #[test]
    fn test_envelope_carries_version() {
        let entry = CacheEntry::new(json!({"iata": "LHR"}), 10, Ttl::LONG);
        let raw = entry.to_envelope().unwrap();

        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["schema_version"], json!(SCHEMA_VERSION));
        assert_eq!(parsed["data"]["iata"], json!("LHR"));

        let decoded = CacheEntry::from_envelope(&raw).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_envelope_rejects_unknown_version() {
        let raw = r#"{"schema_version":99,"data":1,"created_at":0,"expires_at":null}"#;
        let result = CacheEntry::from_envelope(raw);
        assert!(matches!(result, Err(EnvelopeError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_envelope_rejects_garbage() {
        assert!(matches!(
            CacheEntry::from_envelope("not json"),
            Err(EnvelopeError::Malformed(_))
        ));
        // Missing version is treated as version 0
        assert!(matches!(
            CacheEntry::from_envelope(r#"{"data":1,"created_at":0}"#),
            Err(EnvelopeError::UnsupportedVersion(0))
        ));
    }

    #[test]
    fn test_payload_size() {
        // "abc" with quotes
        assert_eq!(Payload::from(json!("abc")).size(), 5);
        assert_eq!(Payload::native(7u64).size(), 8);
    }

    #[test]
    fn test_native_payload_is_not_json() {
        let mut rates = std::collections::HashMap::new();
        rates.insert((1u32, 2u32), 3u32);
        // Non-string map keys have no JSON form
        assert!(serde_json::to_value(&rates).is_err());

        let payload = Payload::native(rates);
        assert!(payload.as_json().is_none());
        assert_eq!(payload.clone(), payload);
        assert_ne!(payload, Payload::native(0u8));
    }

    #[test]
    fn test_map_keeps_timestamps() {
        let entry = CacheEntry::new(json!(1), 10, Ttl::from_millis(5)).map(Payload::from);
        assert_eq!(entry.created_at, 10);
        assert_eq!(entry.expires_at, Some(15));
        assert_eq!(entry.data, Payload::Json(json!(1)));
    }
}
