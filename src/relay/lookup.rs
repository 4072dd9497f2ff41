//! The read path: per-key tiered lookup and the batch dispatcher over it.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::ClassConfig;
use crate::metrics;

use super::CacheRelay;

impl CacheRelay {
    /// Resolve one key through the tiers.
    ///
    /// Order, short-circuiting:
    /// 1. Live negative marker → `None`. The fast tier is not consulted: a
    ///    marker is only ever set after both tiers missed, and entries are
    ///    never individually invalidated, so the extra call would be wasted.
    /// 2. Fast tier hit → the value (tier errors count as a miss).
    /// 3. Double miss → one admission check; if admitted, the key is queued
    ///    for backfill. Either way the caller gets `None` now and observes
    ///    the refill on a later request.
    ///
    /// Total: never errors, never touches the slow source synchronously.
    pub async fn lookup(&self, class: &str, key: &str) -> Option<String> {
        metrics::record_lookup(class);

        let Some(runtime) = self.classes.get(class) else {
            warn!(class = %class, "lookup for unknown request class");
            metrics::record_unknown_class(class);
            return None;
        };

        if runtime.negative.is_marked_absent(key) {
            metrics::record_negative_hit(class);
            return None;
        }

        match self.fast.get(key).await {
            Ok(Some(value)) => {
                metrics::record_fast_hit(class);
                return Some(apply_rewrite(&runtime.config, value));
            }
            Ok(None) => {}
            Err(e) => {
                debug!(class = %class, key = %key, error = %e, "fast tier read failed, treating as miss");
                metrics::record_tier_error("fast", "get");
            }
        }
        metrics::record_fast_miss(class);

        if !runtime.limiter.try_acquire() {
            metrics::record_limiter_denied(class);
            return None;
        }

        runtime.feeder.enqueue(key);
        None
    }

    /// Resolve a batch of keys for one class.
    ///
    /// Every input key appears in the result; misses map to the empty
    /// string. Keys are independent, so invocation order is irrelevant;
    /// the real batching happens in the drain workers after deferral.
    pub async fn resolve(&self, class: &str, keys: &[String]) -> HashMap<String, String> {
        metrics::record_resolve(class, keys.len());

        let mut results = HashMap::with_capacity(keys.len());
        for key in keys {
            let value = self.lookup(class, key).await.unwrap_or_default();
            results.insert(key.clone(), value);
        }
        results
    }

    /// Direct provisioning write into the fast tier, bypassing the backfill
    /// path. A failed write degrades to a no-op.
    pub async fn prime(&self, entries: &HashMap<String, String>) {
        if entries.is_empty() {
            return;
        }
        if let Err(e) = self.fast.put_batch(entries).await {
            warn!(entries = entries.len(), error = %e, "provisioning write to fast tier failed");
            metrics::record_tier_error("fast", "put_batch");
        }
    }

    /// Seed confirmed-absent markers for a class, bypassing the backfill
    /// path. Unknown classes are ignored (counted).
    pub fn mark_absent(&self, class: &str, keys: &[String]) {
        let Some(runtime) = self.classes.get(class) else {
            warn!(class = %class, "mark_absent for unknown request class");
            metrics::record_unknown_class(class);
            return;
        };
        for key in keys {
            runtime.negative.mark_absent(key);
        }
    }
}

/// Apply the class's sampled rewrite rule, if any, to a fast-tier hit.
fn apply_rewrite(config: &ClassConfig, value: String) -> String {
    match &config.rewrite {
        Some(rule) if rule.ratio > 0.0 && rand::thread_rng().gen::<f64>() < rule.ratio => {
            value.replace(&rule.from, &rule.to)
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriteRule;

    fn rule(ratio: f64) -> ClassConfig {
        ClassConfig {
            rewrite: Some(RewriteRule {
                from: "http://".to_string(),
                to: "https://".to_string(),
                ratio,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_rewrite_always_at_ratio_one() {
        let config = rule(1.0);
        assert_eq!(
            apply_rewrite(&config, "http://example.com".to_string()),
            "https://example.com"
        );
    }

    #[test]
    fn test_rewrite_never_at_ratio_zero() {
        let config = rule(0.0);
        assert_eq!(
            apply_rewrite(&config, "http://example.com".to_string()),
            "http://example.com"
        );
    }

    #[test]
    fn test_no_rule_leaves_value_untouched() {
        let config = ClassConfig::default();
        assert_eq!(
            apply_rewrite(&config, "http://example.com".to_string()),
            "http://example.com"
        );
    }

    #[test]
    fn test_rewrite_samples_roughly_at_ratio() {
        let config = rule(0.5);
        let rewritten = (0..1000)
            .filter(|_| {
                apply_rewrite(&config, "http://x".to_string()) == "https://x"
            })
            .count();
        // Binomial(1000, 0.5): anything outside this band is a broken sampler
        assert!((300..=700).contains(&rewritten), "rewritten {}", rewritten);
    }
}
