//! Cache Module
//!
//! Provides an in-memory key-value cache with per-entry TTL expiration.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::ExpiringCache;

// == Public Constants ==
/// Maximum key length in bytes accepted over HTTP
pub const MAX_KEY_LENGTH: usize = 256;
