//! Response caching with per-call-type TTL and LRU eviction.
//!
//! Generated text is keyed by a content hash of the normalized prompt and its
//! call-type, so identical requests made across ticks are answered without a
//! network call while the entry is fresh.

#![warn(missing_docs)]

mod cache;

pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheEntry, CacheStats, CacheTtls, CacheTtlsBuilder,
    ResponseCache,
};
