//! Response cache implementation.

use chronicler_core::{CallType, Clock, ContentKey, GenerationResponse};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Time-to-live per call-type, in seconds.
///
/// Volatile content such as decision interpretation expires within a few
/// ticks; background narrative context stays valid far longer.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct CacheTtls {
    /// TTL for decision interpretation
    #[serde(default = "default_decision_interpretation_ttl")]
    decision_interpretation: u64,

    /// TTL for NPC dialogue
    #[serde(default = "default_npc_dialogue_ttl")]
    npc_dialogue: u64,

    /// TTL for narrative events
    #[serde(default = "default_narrative_event_ttl")]
    narrative_event: u64,

    /// TTL for narrative context
    #[serde(default = "default_narrative_context_ttl")]
    narrative_context: u64,
}

fn default_decision_interpretation_ttl() -> u64 {
    5
}

fn default_npc_dialogue_ttl() -> u64 {
    60
}

fn default_narrative_event_ttl() -> u64 {
    300 // 5 minutes
}

fn default_narrative_context_ttl() -> u64 {
    900 // 15 minutes
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            decision_interpretation: default_decision_interpretation_ttl(),
            npc_dialogue: default_npc_dialogue_ttl(),
            narrative_event: default_narrative_event_ttl(),
            narrative_context: default_narrative_context_ttl(),
        }
    }
}

impl CacheTtls {
    /// TTL that applies to a call-type.
    pub fn ttl_for(&self, call_type: CallType) -> Duration {
        let secs = match call_type {
            CallType::DecisionInterpretation => self.decision_interpretation,
            CallType::NpcDialogue => self.npc_dialogue,
            CallType::NarrativeEvent => self.narrative_event,
            CallType::NarrativeContext => self.narrative_context,
        };
        Duration::from_secs(secs)
    }
}

/// Configuration for the response cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    enabled: bool,

    /// Maximum number of entries
    #[serde(default = "default_capacity")]
    capacity: usize,

    /// Serve an expired entry when every provider attempt failed
    #[serde(default = "default_serve_stale_on_failure")]
    serve_stale_on_failure: bool,

    /// Per-call-type TTLs
    #[serde(default)]
    ttl_secs: CacheTtls,
}

fn default_enabled() -> bool {
    true
}

fn default_capacity() -> usize {
    256
}

fn default_serve_stale_on_failure() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            capacity: default_capacity(),
            serve_stale_on_failure: default_serve_stale_on_failure(),
            ttl_secs: CacheTtls::default(),
        }
    }
}

/// Cached response with its freshness bookkeeping.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    key: ContentKey,
    call_type: CallType,
    response: GenerationResponse,
    cached_at_tick: u64,
    cached_at: Duration,
    ttl: Duration,
    hit_count: u64,
}

impl CacheEntry {
    /// Whether the entry is past its TTL at clock reading `now`.
    pub fn is_expired_at(&self, now: Duration) -> bool {
        now.saturating_sub(self.cached_at) > self.ttl
    }

    /// Time left before expiry at clock reading `now`.
    pub fn time_remaining_at(&self, now: Duration) -> Option<Duration> {
        (self.cached_at + self.ttl).checked_sub(now)
    }
}

/// Hit, miss and eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently stored
    pub entries: usize,
    /// Fresh lookups served
    pub hits: u64,
    /// Lookups that found nothing fresh
    pub misses: u64,
    /// Expired entries served after provider failure
    pub stale_hits: u64,
    /// Entries written
    pub insertions: u64,
    /// Entries evicted for capacity
    pub evictions: u64,
}

impl CacheStats {
    /// Share of lookups answered from a fresh entry.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Content-addressed response cache.
///
/// `get` only answers while an entry is within its call-type TTL. Expired
/// entries stay in place until they are evicted, invalidated or cleaned up,
/// so `get_stale` can still answer after every provider has failed. The LRU
/// order is refreshed on every read as well as on every write.
///
/// # Example
///
/// ```
/// use chronicler_cache::{CacheConfig, ResponseCache};
/// use chronicler_core::{
///     CallType, ContentKey, GenerationResponse, ManualClock, ResponseSource, TokenUsage,
/// };
/// use std::sync::Arc;
///
/// let clock = ManualClock::new();
/// let mut cache = ResponseCache::new(CacheConfig::default(), Arc::new(clock.clone()));
///
/// let key = ContentKey::new("Describe the harvest festival", CallType::NarrativeEvent);
/// let response = GenerationResponse {
///     text: "Lanterns line the square.".to_string(),
///     usage: TokenUsage::new(12, 6),
///     cost_usd: 0.0,
///     provider: "primary".to_string(),
///     latency_ms: 40,
///     source: ResponseSource::Provider,
/// };
/// cache.put(key.clone(), CallType::NarrativeEvent, response, 0);
///
/// if let Some(entry) = cache.get(&key) {
///     println!("Cached: {}", entry.response().text);
/// }
/// ```
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: HashMap<ContentKey, CacheEntry>,
    access_order: Vec<ContentKey>,
    stats: CacheStats,
}

impl ResponseCache {
    /// Create a cache reading time from `clock`.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        tracing::debug!(
            capacity = config.capacity,
            enabled = config.enabled,
            "Creating new ResponseCache"
        );
        Self {
            config,
            clock,
            entries: HashMap::new(),
            access_order: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store a response, replacing any entry under the same key.
    #[tracing::instrument(
        skip(self, response),
        fields(key = %key, call_type = %call_type, cache_size = self.entries.len())
    )]
    pub fn put(
        &mut self,
        key: ContentKey,
        call_type: CallType,
        response: GenerationResponse,
        tick: u64,
    ) {
        if !self.config.enabled || self.config.capacity == 0 {
            tracing::debug!("Cache disabled, skipping insert");
            return;
        }

        if self.entries.len() >= self.config.capacity && !self.entries.contains_key(&key) {
            self.evict_lru();
        }
        self.touch(&key);

        let ttl = self.config.ttl_secs.ttl_for(call_type);
        let entry = CacheEntry {
            key: key.clone(),
            call_type,
            response,
            cached_at_tick: tick,
            cached_at: self.clock.now(),
            ttl,
            hit_count: 0,
        };
        tracing::debug!(ttl = ?ttl, "Inserted entry into cache");
        self.entries.insert(key, entry);
        self.stats.insertions += 1;
    }

    /// Look up a fresh entry.
    ///
    /// Returns None if the entry is missing, past its TTL, or the cache is
    /// disabled. An expired entry is kept for [`Self::get_stale`].
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub fn get(&mut self, key: &ContentKey) -> Option<&CacheEntry> {
        if !self.config.enabled {
            return None;
        }

        let now = self.clock.now();
        let fresh = match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.hit_count += 1;
                tracing::debug!(time_remaining = ?entry.time_remaining_at(now), "Cache hit");
                true
            }
            Some(_) => {
                tracing::debug!("Cache entry expired");
                false
            }
            None => false,
        };

        if !fresh {
            self.stats.misses += 1;
            return None;
        }
        self.stats.hits += 1;
        self.touch(key);
        self.entries.get(key)
    }

    /// Look up an entry regardless of its TTL.
    ///
    /// Used as a last resort once providers are exhausted; only answers when
    /// `serve_stale_on_failure` is set.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub fn get_stale(&mut self, key: &ContentKey) -> Option<&CacheEntry> {
        if !self.config.enabled || !self.config.serve_stale_on_failure {
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.hit_count += 1;
        self.stats.stale_hits += 1;
        tracing::debug!("Serving stale cache entry");
        self.touch(key);
        self.entries.get(key)
    }

    /// Whether a fresh entry exists, without touching LRU order or counters.
    pub fn contains_fresh(&self, key: &ContentKey) -> bool {
        let now = self.clock.now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Remove one entry. Returns whether it existed.
    pub fn invalidate(&mut self, key: &ContentKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.forget(key);
        }
        removed
    }

    /// Remove every entry of a call-type.
    pub fn invalidate_call_type(&mut self, call_type: CallType) -> usize {
        let before = self.entries.len();
        let access_order = &mut self.access_order;
        self.entries.retain(|key, entry| {
            let keep = entry.call_type != call_type;
            if !keep && let Some(pos) = access_order.iter().position(|k| k == key) {
                access_order.remove(pos);
            }
            keep
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!(removed, call_type = %call_type, "Invalidated cache entries");
        }
        removed
    }

    /// Remove expired entries from cache.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        let access_order = &mut self.access_order;

        self.entries.retain(|key, entry| {
            let keep = !entry.is_expired_at(now);
            if !keep && let Some(pos) = access_order.iter().position(|k| k == key) {
                access_order.remove(pos);
            }
            keep
        });

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!(
                removed,
                remaining = self.entries.len(),
                "Cleaned up expired cache entries"
            );
        }
        removed
    }

    /// Clear all cache entries.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.access_order.clear();
        tracing::info!(cleared = count, "Cleared cache");
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &ContentKey) {
        self.forget(key);
        self.access_order.push(key.clone());
    }

    fn forget(&mut self, key: &ContentKey) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
    }

    /// Evict least recently used entry.
    fn evict_lru(&mut self) {
        if self.access_order.is_empty() {
            return;
        }
        let key = self.access_order.remove(0);
        tracing::debug!(key = %key, "Evicting LRU entry");
        self.entries.remove(&key);
        self.stats.evictions += 1;
    }
}
