// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for cache-relay.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding service is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `cache_relay_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `class`: the request class (key namespace)
//! - `tier`: fast, slow
//! - `operation`: get, put_batch, mget

use std::time::Duration;

use metrics::{counter, gauge, histogram};

// ═══════════════════════════════════════════════════════════════════════════
// LOOKUP PATH - Per-request outcomes
// ═══════════════════════════════════════════════════════════════════════════

/// Record a lookup issued against a class
pub fn record_lookup(class: &str) {
    counter!(
        "cache_relay_lookups_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record a lookup answered from the fast tier
pub fn record_fast_hit(class: &str) {
    counter!(
        "cache_relay_fast_hits_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record a fast-tier miss
pub fn record_fast_miss(class: &str) {
    counter!(
        "cache_relay_fast_misses_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record a lookup short-circuited by a live negative marker
pub fn record_negative_hit(class: &str) {
    counter!(
        "cache_relay_negative_hits_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record an admission denial by the class's rate limiter
pub fn record_limiter_denied(class: &str) {
    counter!(
        "cache_relay_limiter_denied_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record a lookup against a class the relay does not know
pub fn record_unknown_class(class: &str) {
    counter!(
        "cache_relay_unknown_class_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record a batch request and its key count
pub fn record_resolve(class: &str, keys: usize) {
    counter!(
        "cache_relay_resolves_total",
        "class" => class.to_string()
    )
    .increment(1);
    histogram!(
        "cache_relay_resolve_keys",
        "class" => class.to_string()
    )
    .record(keys as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// BACKFILL - Queue and drain
// ═══════════════════════════════════════════════════════════════════════════

/// Record a backfill request accepted into the queue
pub fn record_enqueue(class: &str) {
    counter!(
        "cache_relay_enqueued_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record a backfill request dropped because the queue was full
pub fn record_queue_drop(class: &str) {
    counter!(
        "cache_relay_queue_dropped_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record keys the source resolved during a drain
pub fn record_source_hits(class: &str, count: usize) {
    counter!(
        "cache_relay_source_hits_total",
        "class" => class.to_string()
    )
    .increment(count as u64);
}

/// Record keys the source confirmed absent during a drain
pub fn record_source_misses(class: &str, count: usize) {
    counter!(
        "cache_relay_source_misses_total",
        "class" => class.to_string()
    )
    .increment(count as u64);
}

/// Record a dropped batch after a slow-source failure
pub fn record_source_error(class: &str) {
    counter!(
        "cache_relay_source_errors_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record a completed drain iteration
pub fn record_drain(class: &str, batch: usize, duration: Duration) {
    histogram!(
        "cache_relay_drain_batch_size",
        "class" => class.to_string()
    )
    .record(batch as f64);
    histogram!(
        "cache_relay_drain_seconds",
        "class" => class.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Set current backfill queue depth
pub fn set_queue_depth(class: &str, depth: usize) {
    gauge!(
        "cache_relay_queue_depth",
        "class" => class.to_string()
    )
    .set(depth as f64);
}

/// Set current negative-marker count
pub fn set_negative_entries(class: &str, count: usize) {
    gauge!(
        "cache_relay_negative_entries",
        "class" => class.to_string()
    )
    .set(count as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// TIER ERRORS - Swallowed by the fail-open path, visible here
// ═══════════════════════════════════════════════════════════════════════════

/// Record a tier operation failure that the relay degraded to a miss/no-op
pub fn record_tier_error(tier: &str, operation: &str) {
    counter!(
        "cache_relay_tier_errors_total",
        "tier" => tier.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These verify the API compiles and doesn't panic with no recorder
    // installed. Exporter-side assertions belong to the embedding service.

    #[test]
    fn test_lookup_counters() {
        record_lookup("url");
        record_fast_hit("url");
        record_fast_miss("tag");
        record_negative_hit("url");
        record_limiter_denied("tag");
        record_unknown_class("bogus");
        record_resolve("url", 32);
    }

    #[test]
    fn test_backfill_counters() {
        record_enqueue("url");
        record_queue_drop("url");
        record_source_hits("url", 40);
        record_source_misses("url", 10);
        record_source_error("tag");
        record_drain("url", 50, Duration::from_millis(12));
    }

    #[test]
    fn test_gauges() {
        set_queue_depth("url", 1234);
        set_negative_entries("url", 42);
    }

    #[test]
    fn test_tier_errors() {
        record_tier_error("fast", "get");
        record_tier_error("slow", "mget");
    }
}
