use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TierError {
    #[error("no slow-source nodes configured for class '{0}'")]
    NoNodes(String),
    #[error("tier backend error: {0}")]
    Backend(String),
}

/// The fast in-memory tier consulted first on every lookup.
///
/// The tier owns its own expiry/eviction policy; an entry that has aged out
/// is indistinguishable from one that was never cached. Callers treat any
/// error from these operations as a miss or a no-op.
#[async_trait]
pub trait FastTier: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, TierError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), TierError>;

    /// Write a batch of entries.
    /// Default implementation falls back to sequential puts.
    async fn put_batch(&self, entries: &HashMap<String, String>) -> Result<(), TierError> {
        for (key, value) in entries {
            self.put(key, value).await?;
        }
        Ok(())
    }
}

/// The slow backing source, authoritative but rate-sensitive.
///
/// `mget` is the only operation the backfill path uses; `get` exists for
/// single-key probes and for sources without a native batch lookup.
#[async_trait]
pub trait SlowSource: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, TierError>;

    /// Batch lookup. The result carries one entry per requested key; `None`
    /// means the source confirmed the key absent.
    /// Default implementation falls back to sequential gets.
    async fn mget(&self, keys: &[String]) -> Result<HashMap<String, Option<String>>, TierError> {
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            out.insert(key.clone(), self.get(key).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    // Minimal impls that lean on the trait defaults

    struct SeqTier {
        data: DashMap<String, String>,
    }

    #[async_trait]
    impl FastTier for SeqTier {
        async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
            Ok(self.data.get(key).map(|v| v.value().clone()))
        }

        async fn put(&self, key: &str, value: &str) -> Result<(), TierError> {
            self.data.insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    struct SeqSource {
        data: DashMap<String, String>,
    }

    #[async_trait]
    impl SlowSource for SeqSource {
        async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
            Ok(self.data.get(key).map(|v| v.value().clone()))
        }
    }

    #[tokio::test]
    async fn test_put_batch_default_falls_back_to_puts() {
        let tier = SeqTier {
            data: DashMap::new(),
        };

        let mut entries = HashMap::new();
        entries.insert("a".to_string(), "1".to_string());
        entries.insert("b".to_string(), "2".to_string());
        tier.put_batch(&entries).await.unwrap();

        assert_eq!(tier.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(tier.get("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_mget_default_carries_one_entry_per_key() {
        let source = SeqSource {
            data: DashMap::new(),
        };
        source.data.insert("a".to_string(), "1".to_string());

        let keys = vec!["a".to_string(), "missing".to_string()];
        let result = source.mget(&keys).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result["a"].as_deref(), Some("1"));
        assert!(result["missing"].is_none());
    }
}
