//! # Cache Relay
//!
//! A read-mostly caching proxy between clients and a slow, rate-limited
//! backing key-value source.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Batch Dispatcher                       │
//! │  • resolve(class, keys) → map of key → value-or-empty      │
//! │  • Returns immediately, never waits on the slow source     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Tiered Lookup Coordinator                  │
//! │  • Negative cache short-circuit for confirmed-absent keys  │
//! │  • Fast-tier read (the only await on the request path)     │
//! │  • Token-bucket admission, then non-blocking enqueue       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                   (bounded queue, drop-on-full)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Backfill Drain Worker (per class)            │
//! │  • Coalesces miss bursts into one slow-source multi-get    │
//! │  • Present keys → fast tier batch write                    │
//! │  • Absent keys → negative markers                          │
//! │  • Failed batches dropped, healed by client retraffic      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cache_relay::{CacheRelay, ClassConfig, MemoryTier, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut classes = HashMap::new();
//!     classes.insert("url".to_string(), ClassConfig {
//!         source_nodes: vec!["redis://127.0.0.1:6379".into()],
//!         rate_limit: 500.0,
//!         ..Default::default()
//!     });
//!
//!     let fast = Arc::new(MemoryTier::new(Some(Duration::from_secs(3600))));
//!     let mut relay = CacheRelay::new(RelayConfig { classes }, fast);
//!     relay.start().await.expect("failed to start");
//!
//!     // First sight of a key: empty now, backfilled for later requests
//!     let keys = vec!["user.42".to_string()];
//!     let results = relay.resolve("url", &keys).await;
//!     assert_eq!(results["user.42"], "");
//!
//!     relay.shutdown().await;
//! }
//! ```
//!
//! ## Design
//!
//! - **Non-blocking reads**: a lookup is bounded by fast-tier latency; all
//!   slow-source access happens on background drain workers
//! - **Negative caching**: confirmed-absent keys are remembered for a
//!   bounded window so miss storms for missing keys never amplify
//! - **Admission control**: a token bucket per request class caps backfill
//!   traffic independent of inbound volume
//! - **Fail open**: any internal failure degrades to an empty result,
//!   never to a blocked or failed request
//! - **Lossy by design**: queue-full drops and failed batches shed load
//!   silently; the fast tier heals through client retraffic
//!
//! ## Modules
//!
//! - [`relay`]: the [`CacheRelay`] coordinator and batch dispatcher
//! - [`config`]: per-class tuning handed over by the embedding service
//! - [`feeder`]: bounded backfill queue and drain workers
//! - [`negative`]: time-bounded absence markers
//! - [`limiter`]: token-bucket admission control
//! - [`tier`]: fast-tier / slow-source traits and bundled backends
//! - [`resilience`]: connector-level retry
//! - [`metrics`]: fire-and-forget counters for the embedding service

pub mod config;
pub mod feeder;
pub mod limiter;
pub mod metrics;
pub mod negative;
pub mod relay;
pub mod resilience;
pub mod tier;

pub use config::{ClassConfig, RelayConfig, RewriteRule};
pub use feeder::BackfillFeeder;
pub use limiter::RateLimiter;
pub use negative::NegativeCache;
pub use relay::{CacheRelay, ClassStats, RelayState, RelayStats};
pub use resilience::retry::RetryConfig;
pub use tier::memory::MemoryTier;
pub use tier::redis::RedisSource;
pub use tier::traits::{FastTier, SlowSource, TierError};
