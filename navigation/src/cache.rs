// Cache-aside storage for upstream menu responses. Entries are never expired by
// the store itself: an expired value must stay readable so it can stand in for
// a failed refresh.
use crate::response::ApiResponse;
use crate::transport::RequestOptions;
use moka::sync::Cache;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// An immutable cache entry.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheValue {
    pub value: ApiResponse,
    /// Unix timestamp of when the value was fetched
    pub created: i64,
    pub tags: Vec<String>,
    ttl: i64,
}

impl CacheValue {
    pub const DEFAULT_TTL: i64 = 180;

    pub fn new(value: ApiResponse, created: i64, tags: Vec<String>) -> Self {
        CacheValue {
            value,
            created,
            tags,
            ttl: Self::DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> i64 {
        self.ttl
    }

    pub fn has_expired(&self, current_time: i64) -> bool {
        current_time > self.created + self.ttl
    }
}

pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheValue>;
    fn set(&self, key: &str, value: CacheValue);
    /// Drops every entry carrying any of the given tags. Returns the number
    /// of entries removed.
    fn invalidate_tags(&self, tags: &[String]) -> usize;
}

pub struct MemoryBackend {
    cache: Cache<String, CacheValue>,
}

impl MemoryBackend {
    pub fn new(capacity: u64) -> Self {
        MemoryBackend {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<CacheValue> {
        self.cache.get(key)
    }

    fn set(&self, key: &str, value: CacheValue) {
        self.cache.insert(key.to_string(), value);
    }

    fn invalidate_tags(&self, tags: &[String]) -> usize {
        let keys: Vec<_> = self
            .cache
            .iter()
            .filter(|(_, value)| value.tags.iter().any(|tag| tags.contains(tag)))
            .map(|(key, _)| key)
            .collect();

        for key in &keys {
            self.cache.invalidate(key.as_str());
        }
        keys.len()
    }
}

pub fn cache_tags(menu_id: &str, langcode: &str) -> Vec<String> {
    vec![format!("external_menu:{menu_id}:{langcode}")]
}

/// Builds the key for a menu/language pair. Requests with options get their
/// own entry, suffixed by a hash of the options.
pub fn cache_key(menu_id: &str, langcode: &str, options: &RequestOptions) -> String {
    let base = format!("external_menu:{menu_id}:{langcode}");

    if options.is_empty() {
        return base;
    }

    let mut hasher = Sha256::new();
    // Both maps are ordered, so equal options always hash the same.
    hash_section(&mut hasher, b"query", &options.query);
    hash_section(&mut hasher, b"headers", &options.headers);
    if let Some(timeout) = options.timeout {
        hasher.update(b"timeout\0");
        hasher.update(timeout.as_millis().to_le_bytes());
    }

    format!("{base}:{:x}", hasher.finalize())
}

/// Tagged and length prefixed, so entries can't bleed into one another.
fn hash_section(hasher: &mut Sha256, tag: &[u8], entries: &BTreeMap<String, String>) {
    hasher.update(tag);
    hasher.update(b"\0");
    hasher.update((entries.len() as u64).to_le_bytes());

    for (name, value) in entries {
        for part in [name, value] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
    }
}
