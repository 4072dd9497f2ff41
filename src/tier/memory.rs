use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{FastTier, TierError};

struct Entry {
    value: String,
    inserted_at: Instant,
}

/// In-process fast tier backed by a concurrent map.
///
/// Entries expire `ttl` after insertion, independent of access; `None`
/// disables expiry. Expired entries are dropped lazily on read, plus by
/// [`sweep_expired`](Self::sweep_expired) for entries nothing reads again.
pub struct MemoryTier {
    entries: DashMap<String, Entry>,
    ttl: Option<Duration>,
}

impl MemoryTier {
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        match self.ttl {
            Some(ttl) => entry.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }

    /// Get current entry count (expired entries included until swept).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry));
        before.saturating_sub(self.entries.len())
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl FastTier for MemoryTier {
    async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) => {
                if !self.is_expired(&entry) {
                    return Ok(Some(entry.value.clone()));
                }
                true
            }
        };
        if expired {
            // Re-check under the entry lock: a fresh put may have raced us.
            self.entries.remove_if(key, |_, entry| self.is_expired(entry));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), TierError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                inserted_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn put_batch(&self, entries: &HashMap<String, String>) -> Result<(), TierError> {
        let now = Instant::now();
        for (key, value) in entries {
            self.entries.insert(
                key.clone(),
                Entry {
                    value: value.clone(),
                    inserted_at: now,
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_tier_is_empty() {
        let tier = MemoryTier::new(None);
        assert!(tier.is_empty());
        assert_eq!(tier.len(), 0);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let tier = MemoryTier::new(None);

        tier.put("k1", "v1").await.unwrap();

        let value = tier.get("k1").await.unwrap();
        assert_eq!(value.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let tier = MemoryTier::new(None);
        assert!(tier.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let tier = MemoryTier::new(None);

        tier.put("k", "old").await.unwrap();
        tier.put("k", "new").await.unwrap();

        assert_eq!(tier.len(), 1);
        assert_eq!(tier.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_empty_value_is_distinct_from_absent() {
        let tier = MemoryTier::new(None);

        tier.put("k", "").await.unwrap();

        assert_eq!(tier.get("k").await.unwrap().as_deref(), Some(""));
        assert!(tier.get("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_batch() {
        let tier = MemoryTier::new(None);

        let mut entries = HashMap::new();
        for i in 0..5 {
            entries.insert(format!("k{}", i), format!("v{}", i));
        }
        tier.put_batch(&entries).await.unwrap();

        assert_eq!(tier.len(), 5);
        assert_eq!(tier.get("k3").await.unwrap().as_deref(), Some("v3"));
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_miss() {
        let tier = MemoryTier::new(Some(Duration::from_millis(30)));

        tier.put("k", "v").await.unwrap();
        assert!(tier.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;

        // Expired entry behaves exactly like a never-cached key
        assert!(tier.get("k").await.unwrap().is_none());
        // ...and the lazy read dropped it
        assert_eq!(tier.len(), 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let tier = MemoryTier::new(Some(Duration::from_millis(40)));

        tier.put("old", "v").await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        tier.put("fresh", "v").await.unwrap();

        let removed = tier.sweep_expired();
        assert_eq!(removed, 1);
        assert_eq!(tier.len(), 1);
        assert!(tier.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let tier = MemoryTier::new(None);

        tier.put("k", "v").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(tier.sweep_expired(), 0);
        assert!(tier.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        use std::sync::Arc;

        let tier = Arc::new(MemoryTier::new(None));
        let mut handles = vec![];

        for batch in 0..10 {
            let tier = tier.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    tier.put(&format!("b{}-k{}", batch, i), "v").await.unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(tier.len(), 100);
    }
}
