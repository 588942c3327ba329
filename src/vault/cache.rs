//! Session-scoped cache of decrypted keys.
//!
//! Each `KeyVault` owns one cache; entries live at most `ttl` (default
//! 30 minutes) and are re-checked for age on every read, so an expired
//! value is never served even before a sweep runs.  Plaintext values
//! sit in `Zeroizing<String>` buffers that are scrubbed when an entry
//! is evicted or the cache is cleared (best-effort, not a hard memory
//! guarantee).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::store::models::ServiceType;

/// One cached decrypted key with access metadata.
struct CachedKey {
    value: Zeroizing<String>,
    service_type: ServiceType,
    cached_at: DateTime<Utc>,
    access_count: u64,
    last_accessed: Option<DateTime<Utc>>,
}

/// Per-entry statistics exposed by `stats()`.  No plaintext.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryStats {
    pub key_name: String,
    pub cached_at: DateTime<Utc>,
    pub age_minutes: f64,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Snapshot of the whole cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub cached_keys: usize,
    pub ttl_minutes: i64,
    pub keys: Vec<CacheEntryStats>,
}

/// TTL-bounded map of key name -> decrypted value.
pub struct KeyCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedKey>>,
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedKey>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a live entry, bumping its access counters.
    ///
    /// An entry past the TTL is evicted on the spot and treated as a
    /// miss — the read path always re-validates age.
    pub fn get(&self, key_name: &str) -> Option<(Zeroizing<String>, ServiceType)> {
        let mut entries = self.lock();
        match entries.get_mut(key_name) {
            Some(entry) if Utc::now() - entry.cached_at < self.ttl => {
                entry.access_count += 1;
                entry.last_accessed = Some(Utc::now());
                Some((entry.value.clone(), entry.service_type))
            }
            Some(_) => {
                // Expired: dropping the entry scrubs its plaintext.
                entries.remove(key_name);
                None
            }
            None => None,
        }
    }

    /// Insert or replace the entry for `key_name`.
    pub fn insert(&self, key_name: &str, value: Zeroizing<String>, service_type: ServiceType) {
        let now = Utc::now();
        self.lock().insert(
            key_name.to_string(),
            CachedKey {
                value,
                service_type,
                cached_at: now,
                access_count: 1,
                last_accessed: Some(now),
            },
        );
    }

    /// Drop the entry for `key_name`, scrubbing its plaintext.
    pub fn invalidate(&self, key_name: &str) -> bool {
        self.lock().remove(key_name).is_some()
    }

    /// Scrub and drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Evict only entries past the TTL; fresh entries stay.
    ///
    /// Returns the number of evicted entries.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.lock();
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.cached_at < self.ttl);
        before - entries.len()
    }

    /// Metadata snapshot for housekeeping/diagnostics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        let now = Utc::now();

        let mut keys: Vec<CacheEntryStats> = entries
            .iter()
            .map(|(name, entry)| CacheEntryStats {
                key_name: name.clone(),
                cached_at: entry.cached_at,
                age_minutes: (now - entry.cached_at).num_seconds() as f64 / 60.0,
                access_count: entry.access_count,
                last_accessed: entry.last_accessed,
            })
            .collect();
        keys.sort_by(|a, b| a.key_name.cmp(&b.key_name));

        CacheStats {
            cached_keys: entries.len(),
            ttl_minutes: self.ttl.num_minutes(),
            keys,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(s: &str) -> Zeroizing<String> {
        Zeroizing::new(s.to_string())
    }

    #[test]
    fn insert_and_get_within_ttl() {
        let cache = KeyCache::new(Duration::minutes(30));
        cache.insert("k", value("sk_test_abc"), ServiceType::Stripe);

        let (v, st) = cache.get("k").expect("entry should be live");
        assert_eq!(v.as_str(), "sk_test_abc");
        assert_eq!(st, ServiceType::Stripe);
    }

    #[test]
    fn get_bumps_access_counters() {
        let cache = KeyCache::new(Duration::minutes(30));
        cache.insert("k", value("v"), ServiceType::Other);
        cache.get("k");
        cache.get("k");

        let stats = cache.stats();
        assert_eq!(stats.keys[0].access_count, 3); // insert counts as 1
        assert!(stats.keys[0].last_accessed.is_some());
    }

    #[test]
    fn expired_entry_is_never_served() {
        // Zero TTL: every entry is already expired.
        let cache = KeyCache::new(Duration::zero());
        cache.insert("k", value("v"), ServiceType::Other);

        assert!(cache.get("k").is_none());
        // The expired entry was evicted by the read.
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = KeyCache::new(Duration::minutes(30));
        cache.insert("k", value("v"), ServiceType::Other);

        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn cleanup_expired_leaves_fresh_entries() {
        let cache = KeyCache::new(Duration::minutes(30));
        cache.insert("fresh", value("v"), ServiceType::Other);
        assert_eq!(cache.cleanup_expired(), 0);
        assert_eq!(cache.len(), 1);

        let expired = KeyCache::new(Duration::zero());
        expired.insert("old", value("v"), ServiceType::Other);
        assert_eq!(expired.cleanup_expired(), 1);
        assert!(expired.is_empty());
    }

    #[test]
    fn clear_empties_cache() {
        let cache = KeyCache::new(Duration::minutes(30));
        cache.insert("a", value("1"), ServiceType::Other);
        cache.insert("b", value("2"), ServiceType::Other);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_contain_no_plaintext() {
        let cache = KeyCache::new(Duration::minutes(30));
        cache.insert("k", value("sk_live_verysecret123"), ServiceType::Stripe);

        let json = serde_json::to_string(&cache.stats()).unwrap();
        assert!(!json.contains("verysecret"));
        assert!(json.contains("\"cached_keys\":1"));
    }
}
