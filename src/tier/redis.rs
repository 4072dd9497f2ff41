//! Redis slow-source connector.
//!
//! The backing source is a sharded Redis deployment reachable through a set
//! of replica nodes. The connector keeps one multiplexed connection per
//! node and spreads load by picking a node uniformly at random for every
//! operation. Selection is deliberately stateless: replicas hold the same
//! data, so simple random spread is all the balancing the read path needs.
//!
//! Only reads are issued here. The relay never writes to the source.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::warn;

use super::traits::{SlowSource, TierError};
use crate::resilience::retry::{retry, RetryConfig};

pub struct RedisSource {
    connections: Vec<ConnectionManager>,
}

impl RedisSource {
    /// Connect to every node in the list.
    ///
    /// Unreachable nodes are logged and skipped; at least one node must come
    /// up or the whole connect fails. Each node gets
    /// [`RetryConfig::connect`] backoff so a slow-starting replica still
    /// joins the set.
    pub async fn connect(nodes: &[String]) -> Result<Self, TierError> {
        if nodes.is_empty() {
            return Err(TierError::Backend("empty source node list".into()));
        }

        let mut connections = Vec::with_capacity(nodes.len());
        for node in nodes {
            let client =
                Client::open(node.as_str()).map_err(|e| TierError::Backend(e.to_string()))?;

            match retry("redis_connect", &RetryConfig::connect(), || {
                let client = client.clone();
                async move { ConnectionManager::new(client).await }
            })
            .await
            {
                Ok(conn) => connections.push(conn),
                Err(e) => {
                    warn!(node = %node, error = %e, "source node unreachable, continuing without it");
                }
            }
        }

        if connections.is_empty() {
            return Err(TierError::Backend("no reachable source node".into()));
        }

        Ok(Self { connections })
    }

    /// Number of reachable nodes in the set.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.connections.len()
    }

    fn pick(&self) -> ConnectionManager {
        let idx = rand::thread_rng().gen_range(0..self.connections.len());
        self.connections[idx].clone()
    }
}

#[async_trait]
impl SlowSource for RedisSource {
    async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
        let conn = self.pick();

        retry("redis_get", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = key.to_string();
            async move {
                let value: Option<String> = conn.get(&key).await?;
                Ok(value)
            }
        })
        .await
        .map_err(|e: redis::RedisError| TierError::Backend(e.to_string()))
    }

    /// Batch lookup via a single `MGET`, used by the backfill drain.
    async fn mget(&self, keys: &[String]) -> Result<HashMap<String, Option<String>>, TierError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.pick();

        let values: Vec<Option<String>> = retry("redis_mget", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let keys = keys.to_vec();
            async move {
                let values: Vec<Option<String>> =
                    redis::cmd("MGET").arg(&keys).query_async(&mut conn).await?;
                Ok(values)
            }
        })
        .await
        .map_err(|e: redis::RedisError| TierError::Backend(e.to_string()))?;

        Ok(keys.iter().cloned().zip(values).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_empty_node_list() {
        let result = RedisSource::connect(&[]).await;
        assert!(result.is_err());
    }
}
