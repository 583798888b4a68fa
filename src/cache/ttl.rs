//! TTL Module
//!
//! Time-to-live values and the named presets callers pick from.

use std::time::Duration;

// == Ttl ==
/// Lifetime of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Entry expires once the duration has elapsed since insertion
    Expires(Duration),
    /// Entry never expires; only removal or invalidation drops it
    Permanent,
}

impl Ttl {
    /// Volatile data such as live prices (1 minute)
    pub const SHORT: Ttl = Ttl::Expires(Duration::from_secs(60));
    /// Default lifetime (5 minutes)
    pub const MEDIUM: Ttl = Ttl::Expires(Duration::from_secs(5 * 60));
    /// Semi-static data such as search results (30 minutes)
    pub const LONG: Ttl = Ttl::Expires(Duration::from_secs(30 * 60));
    /// Near-static data such as airport lists (24 hours)
    pub const VERY_LONG: Ttl = Ttl::Expires(Duration::from_secs(24 * 60 * 60));

    /// Creates an expiring TTL from milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Ttl::Expires(Duration::from_millis(ms))
    }

    // == Expires At ==
    /// Absolute expiry instant (Unix ms) for an entry created at `now_ms`.
    ///
    /// Returns `None` for permanent entries.
    pub fn expires_at(&self, now_ms: u64) -> Option<u64> {
        match self {
            Ttl::Expires(duration) => {
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                Some(now_ms.saturating_add(ms))
            }
            Ttl::Permanent => None,
        }
    }

    // == Exceeds ==
    /// Returns true if this TTL is strictly longer than `threshold`.
    ///
    /// Permanent always exceeds any threshold.
    pub fn exceeds(&self, threshold: Duration) -> bool {
        match self {
            Ttl::Expires(duration) => *duration > threshold,
            Ttl::Permanent => true,
        }
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Ttl::MEDIUM
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Expires(duration)
    }
}
