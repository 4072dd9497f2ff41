//! Relay lifecycle: source connection, worker spawn, shutdown.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::feeder;
use crate::limiter::RateLimiter;
use crate::negative::NegativeCache;
use crate::tier::redis::RedisSource;
use crate::tier::traits::{SlowSource, TierError};

use super::{CacheRelay, ClassRuntime, RelayState};

impl CacheRelay {
    /// Connect a slow source for every configured class and spawn its drain
    /// worker, then transition to `Running`.
    ///
    /// Classes with a source attached via
    /// [`attach_source`](Self::attach_source) use it directly; the rest
    /// connect a [`RedisSource`] from their `source_nodes` list. An empty
    /// node list without an attached source is a configuration error,
    /// the one failure `start()` refuses to fail open on.
    pub async fn start(&mut self) -> Result<(), TierError> {
        if self.state() != RelayState::Created {
            warn!("start() called twice, ignoring");
            return Ok(());
        }

        for (name, class_config) in self.config.classes.clone() {
            let source: Arc<dyn SlowSource> = match self.attached_sources.remove(&name) {
                Some(source) => source,
                None => {
                    if class_config.source_nodes.is_empty() {
                        return Err(TierError::NoNodes(name));
                    }
                    info!(class = %name, nodes = class_config.source_nodes.len(), "connecting slow source");
                    Arc::new(RedisSource::connect(&class_config.source_nodes).await?)
                }
            };

            let negative = Arc::new(NegativeCache::new(Duration::from_millis(
                class_config.negative_ttl_ms,
            )));
            let limiter = RateLimiter::new(class_config.rate_limit);

            let (feeder, worker) = feeder::pair(
                &name,
                &class_config,
                self.fast.clone(),
                source,
                negative.clone(),
                self.shutdown_rx.clone(),
            );

            self.workers.push(tokio::spawn(worker.run()));
            self.classes.insert(
                name.clone(),
                ClassRuntime {
                    config: class_config,
                    limiter,
                    negative,
                    feeder,
                },
            );
            info!(class = %name, "request class ready");
        }

        for class in self.attached_sources.keys() {
            warn!(class = %class, "attached source has no matching class in config, ignoring");
        }

        let _ = self.state.send(RelayState::Running);
        info!(classes = self.classes.len(), "cache relay running");
        Ok(())
    }

    /// Signal every drain worker, wait for their final pass, transition to
    /// `ShuttingDown`. Requests still queued after the final pass are lost,
    /// by design: refill is best-effort.
    pub async fn shutdown(&mut self) {
        let _ = self.state.send(RelayState::ShuttingDown);
        let _ = self.shutdown.send(true);

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "drain worker terminated abnormally");
            }
        }
        info!("cache relay stopped");
    }
}
