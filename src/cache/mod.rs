//! Cache Module
//!
//! Two-tier caching with TTL expiration, bounded memory and a persistent mirror.

mod clock;
mod entry;
mod flight;
pub mod keys;
mod service;
mod stats;
mod table;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, EnvelopeError, Payload, SCHEMA_VERSION};
pub use service::CacheService;
pub use stats::CacheStats;
pub use table::{MemoryLookup, MemoryTable};
pub use ttl::Ttl;
