// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Relay coordinator.
//!
//! [`CacheRelay`] ties the components into the non-blocking read path:
//! per-class negative cache, shared fast tier, per-class rate limiter and
//! backfill feeder. A lookup is bounded by fast-tier latency alone: all
//! slow-source traffic happens on the drain workers, off the request path.
//!
//! # Lifecycle
//!
//! ```text
//! Created → Running → ShuttingDown
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use cache_relay::{CacheRelay, ClassConfig, MemoryTier, RelayConfig, RelayState};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut classes = HashMap::new();
//! classes.insert("url".to_string(), ClassConfig {
//!     source_nodes: vec!["redis://127.0.0.1:6379".into()],
//!     ..Default::default()
//! });
//!
//! let fast = Arc::new(MemoryTier::new(None));
//! let mut relay = CacheRelay::new(RelayConfig { classes }, fast);
//! assert_eq!(relay.state(), RelayState::Created);
//!
//! relay.start().await.expect("start failed");
//! let value = relay.lookup("url", "some.key").await;
//! assert!(value.is_none()); // first sight of the key: backfill queued
//! # }
//! ```

mod lifecycle;
mod lookup;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{ClassConfig, RelayConfig};
use crate::feeder::BackfillFeeder;
use crate::limiter::RateLimiter;
use crate::negative::NegativeCache;
use crate::tier::traits::{FastTier, SlowSource};

/// Relay lifecycle state, observable through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Created,
    Running,
    ShuttingDown,
}

/// Per-class snapshot for [`CacheRelay::stats`].
#[derive(Debug, Clone)]
pub struct ClassStats {
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub negative_entries: usize,
}

/// Point-in-time relay snapshot (no I/O).
#[derive(Debug, Clone)]
pub struct RelayStats {
    pub state: RelayState,
    pub classes: HashMap<String, ClassStats>,
}

/// Everything one request class needs on the read path.
pub(crate) struct ClassRuntime {
    pub(crate) config: ClassConfig,
    pub(crate) limiter: RateLimiter,
    pub(crate) negative: Arc<NegativeCache>,
    pub(crate) feeder: BackfillFeeder,
}

/// The tiered lookup coordinator.
///
/// # Thread Safety
///
/// `lookup`/`resolve` take `&self` and are safe to call from any number of
/// tasks concurrently; per-class state is internally synchronized.
/// `start`/`shutdown` take `&mut self` and belong to the owning task.
pub struct CacheRelay {
    pub(crate) config: RelayConfig,

    /// Shared fast tier (one namespace across classes)
    pub(crate) fast: Arc<dyn FastTier>,

    /// Per-class runtimes, assembled by `start()`
    pub(crate) classes: HashMap<String, ClassRuntime>,

    /// Sources injected before `start()` (tests, custom backends)
    pub(crate) attached_sources: HashMap<String, Arc<dyn SlowSource>>,

    pub(crate) state: watch::Sender<RelayState>,
    pub(crate) state_rx: watch::Receiver<RelayState>,

    /// Drain workers listen on this for shutdown
    pub(crate) shutdown: watch::Sender<bool>,
    pub(crate) shutdown_rx: watch::Receiver<bool>,

    pub(crate) workers: Vec<JoinHandle<()>>,
}

impl CacheRelay {
    /// Create a relay in `Created` state. No I/O happens until
    /// [`start()`](Self::start).
    pub fn new(config: RelayConfig, fast: Arc<dyn FastTier>) -> Self {
        let (state_tx, state_rx) = watch::channel(RelayState::Created);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            fast,
            classes: HashMap::new(),
            attached_sources: HashMap::new(),
            state: state_tx,
            state_rx,
            shutdown: shutdown_tx,
            shutdown_rx,
            workers: Vec::new(),
        }
    }

    /// Inject a slow source for a class instead of connecting from
    /// `source_nodes`. Must be called before `start()`.
    pub fn attach_source(&mut self, class: &str, source: Arc<dyn SlowSource>) {
        self.attached_sources.insert(class.to_string(), source);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RelayState {
        *self.state_rx.borrow()
    }

    /// Receiver to watch state transitions.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<RelayState> {
        self.state_rx.clone()
    }

    /// Check if the relay is serving lookups.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == RelayState::Running
    }

    /// Snapshot queue and negative-cache occupancy per class.
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        let classes = self
            .classes
            .iter()
            .map(|(name, runtime)| {
                (
                    name.clone(),
                    ClassStats {
                        queue_depth: runtime.feeder.queue_depth(),
                        queue_capacity: runtime.feeder.queue_capacity(),
                        negative_entries: runtime.negative.len(),
                    },
                )
            })
            .collect();

        RelayStats {
            state: self.state(),
            classes,
        }
    }
}
