// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Asynchronous backfill of the fast tier from the slow source.
//!
//! Request tasks that double-miss push keys into a bounded queue and move
//! on; one long-lived [`DrainWorker`] per class owns the receiving half.
//! The worker blocks on the queue (no busy-poll), coalesces bursts into a
//! single multi-get, then writes resolved pairs to the fast tier and
//! confirmed-absent keys to the negative cache.
//!
//! Backpressure is deliberately lossy: a full queue drops the newest
//! request and a failed multi-get drops the whole batch, unretried. The
//! fast tier heals through client retraffic, not through feeder-internal
//! recovery. Switching this to retry-with-backoff would change the
//! load-shedding behavior under overload.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ClassConfig;
use crate::metrics;
use crate::negative::NegativeCache;
use crate::tier::traits::{FastTier, SlowSource};

/// How often the worker sweeps expired negative markers for its class.
const NEGATIVE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Producer half: non-blocking enqueue of backfill requests.
///
/// Cheap to clone; shared by every request task of a class.
#[derive(Clone)]
pub struct BackfillFeeder {
    class: String,
    tx: mpsc::Sender<String>,
}

impl BackfillFeeder {
    /// Queue a key for backfill. Never blocks: if the queue is full the
    /// request is dropped (counted, not raised) and a later lookup for the
    /// key re-enters admission from scratch.
    pub fn enqueue(&self, key: &str) {
        match self.tx.try_send(key.to_string()) {
            Ok(()) => {
                metrics::record_enqueue(&self.class);
                metrics::set_queue_depth(&self.class, self.queue_depth());
            }
            Err(_) => {
                metrics::record_queue_drop(&self.class);
            }
        }
    }

    /// Requests currently waiting in the queue.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Configured queue capacity.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer half: drains the queue in batches until shut down.
pub struct DrainWorker {
    class: String,
    rx: mpsc::Receiver<String>,
    fast: Arc<dyn FastTier>,
    source: Arc<dyn SlowSource>,
    negative: Arc<NegativeCache>,
    batch_size: usize,
    idle: Duration,
    shutdown: watch::Receiver<bool>,
}

/// Build a connected feeder/worker pair for one request class.
pub fn pair(
    class: &str,
    config: &ClassConfig,
    fast: Arc<dyn FastTier>,
    source: Arc<dyn SlowSource>,
    negative: Arc<NegativeCache>,
    shutdown: watch::Receiver<bool>,
) -> (BackfillFeeder, DrainWorker) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let feeder = BackfillFeeder {
        class: class.to_string(),
        tx,
    };
    let worker = DrainWorker {
        class: class.to_string(),
        rx,
        fast,
        source,
        negative,
        batch_size: config.drain_batch_size.max(1),
        idle: Duration::from_millis(config.drain_idle_ms),
        shutdown,
    };
    (feeder, worker)
}

impl DrainWorker {
    /// Run until shutdown is signalled or every feeder handle is dropped.
    pub async fn run(mut self) {
        debug!(class = %self.class, batch_size = self.batch_size, "drain worker started");

        let mut sweep = tokio::time::interval(NEGATIVE_SWEEP_INTERVAL);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    self.drain_remaining().await;
                    break;
                }

                received = self.rx.recv() => match received {
                    None => break,
                    Some(key) => {
                        let batch = self.gather(key).await;
                        self.drain_batch(batch).await;
                        metrics::set_queue_depth(&self.class, self.rx.len());
                    }
                },

                _ = sweep.tick() => {
                    let removed = self.negative.sweep_expired();
                    if removed > 0 {
                        debug!(class = %self.class, removed, "swept expired negative markers");
                    }
                    metrics::set_negative_entries(&self.class, self.negative.len());
                }
            }
        }

        debug!(class = %self.class, "drain worker stopped");
    }

    /// Collect up to `batch_size` keys, waiting at most `idle` for
    /// stragglers after the first key, so a miss burst becomes one
    /// multi-get instead of many.
    async fn gather(&mut self, first: String) -> Vec<String> {
        let mut batch = Vec::with_capacity(self.batch_size);
        batch.push(first);

        let deadline = Instant::now() + self.idle;
        while batch.len() < self.batch_size {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, self.rx.recv()).await {
                Ok(Some(key)) => batch.push(key),
                Ok(None) | Err(_) => break,
            }
        }
        batch
    }

    /// One multi-get against the source, partitioned into fast-tier writes
    /// and negative markers. The two writes are independent: a failed tier
    /// write never blocks the markers, and vice versa.
    async fn drain_batch(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        let started = Instant::now();
        let count = keys.len();

        let resolved = match self.source.mget(&keys).await {
            Ok(map) => map,
            Err(e) => {
                // Dropped, not retried: the keys come back via retraffic
                warn!(class = %self.class, batch = count, error = %e, "slow-source batch lookup failed, dropping batch");
                metrics::record_source_error(&self.class);
                return;
            }
        };

        let mut present: HashMap<String, String> = HashMap::with_capacity(count);
        let mut absent: Vec<String> = Vec::new();
        for key in keys {
            match resolved.get(&key).cloned().flatten() {
                Some(value) => {
                    present.insert(key, value);
                }
                None => absent.push(key),
            }
        }

        metrics::record_source_hits(&self.class, present.len());
        metrics::record_source_misses(&self.class, absent.len());

        if !present.is_empty() {
            if let Err(e) = self.fast.put_batch(&present).await {
                warn!(class = %self.class, entries = present.len(), error = %e, "fast-tier batch write failed");
                metrics::record_tier_error("fast", "put_batch");
            }
        }

        for key in &absent {
            self.negative.mark_absent(key);
        }

        metrics::record_drain(&self.class, count, started.elapsed());
    }

    /// Best-effort final pass over whatever is already queued at shutdown.
    async fn drain_remaining(&mut self) {
        loop {
            let mut batch = Vec::with_capacity(self.batch_size);
            while batch.len() < self.batch_size {
                match self.rx.try_recv() {
                    Ok(key) => batch.push(key),
                    Err(_) => break,
                }
            }
            if batch.is_empty() {
                break;
            }
            debug!(class = %self.class, batch = batch.len(), "draining remaining backfill requests on shutdown");
            self.drain_batch(batch).await;
        }
    }
}
