//! Configuration for the cache relay.
//!
//! Configuration is plain data: the embedding service decides how to load
//! it (file, env, flags) and hands the parsed struct over.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use cache_relay::{ClassConfig, RelayConfig};
//!
//! // Per-class defaults
//! let class = ClassConfig::default();
//! assert_eq!(class.queue_capacity, 100_000);
//! assert_eq!(class.drain_batch_size, 50);
//!
//! // Two key namespaces with their own source clusters and limits
//! let mut classes = HashMap::new();
//! classes.insert("url".to_string(), ClassConfig {
//!     source_nodes: vec!["redis://10.0.0.1:6379".into(), "redis://10.0.0.2:6379".into()],
//!     rate_limit: 500.0,
//!     ..Default::default()
//! });
//! classes.insert("tag".to_string(), ClassConfig {
//!     source_nodes: vec!["redis://10.0.1.1:6379".into()],
//!     rate_limit: 200.0,
//!     ..Default::default()
//! });
//! let config = RelayConfig { classes };
//! assert_eq!(config.classes.len(), 2);
//! ```

use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration: one entry per request class.
///
/// A request class is an independent key namespace with its own slow-source
/// cluster, admission rate, and backfill queue. The fast tier is shared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub classes: HashMap<String, ClassConfig>,
}

/// Per-class tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassConfig {
    /// Slow-source node URLs (e.g., "redis://host:6379"). May stay empty
    /// when a source is attached programmatically instead.
    #[serde(default)]
    pub source_nodes: Vec<String>,

    /// Steady backfill admission rate in permits per second (default: 1000)
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,

    /// Backfill queue capacity; enqueues beyond it are dropped (default: 100 000)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Max keys per slow-source multi-get (default: 50)
    #[serde(default = "default_drain_batch_size")]
    pub drain_batch_size: usize,

    /// How long a drain waits for batch stragglers, in ms (default: 1)
    #[serde(default = "default_drain_idle_ms")]
    pub drain_idle_ms: u64,

    /// Lifetime of a confirmed-absent marker, in ms (default: 5 minutes)
    #[serde(default = "default_negative_ttl_ms")]
    pub negative_ttl_ms: u64,

    /// Optional sampled rewrite applied to fast-tier hits
    #[serde(default)]
    pub rewrite: Option<RewriteRule>,
}

/// Substring rewrite applied to a random fraction of returned values.
///
/// Used in production to upgrade a share of `http://` values to `https://`
/// without a bulk rewrite of the source data.
#[derive(Debug, Clone, Deserialize)]
pub struct RewriteRule {
    pub from: String,
    pub to: String,
    /// Fraction of hits rewritten, 0.0 - 1.0 (default: 1.0)
    #[serde(default = "default_rewrite_ratio")]
    pub ratio: f64,
}

fn default_rate_limit() -> f64 {
    1000.0
}
fn default_queue_capacity() -> usize {
    100_000
}
fn default_drain_batch_size() -> usize {
    50
}
fn default_drain_idle_ms() -> u64 {
    1
}
fn default_negative_ttl_ms() -> u64 {
    5 * 60 * 1000
} // 5 minutes
fn default_rewrite_ratio() -> f64 {
    1.0
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            source_nodes: Vec::new(),
            rate_limit: default_rate_limit(),
            queue_capacity: default_queue_capacity(),
            drain_batch_size: default_drain_batch_size(),
            drain_idle_ms: default_drain_idle_ms(),
            negative_ttl_ms: default_negative_ttl_ms(),
            rewrite: None,
        }
    }
}
