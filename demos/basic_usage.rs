// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic cache-relay usage example.
//!
//! Demonstrates:
//! 1. Configuring two request classes against a local Redis source
//! 2. The two-request pattern: empty first answer, backfilled second
//! 3. Negative caching of keys the source does not have
//! 4. Displaying metrics (OTEL-compatible)
//! 5. Clean shutdown
//!
//! # Prerequisites
//!
//! A Redis instance on localhost with some seed data:
//! ```bash
//! docker run --rm -p 6379:6379 redis:7-alpine &
//! redis-cli set user.alice '{"role": "admin"}'
//! ```
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cache_relay::{CacheRelay, ClassConfig, MemoryTier, RelayConfig, RelayState};
use metrics_util::debugging::DebuggingRecorder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures all metrics for inspection)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n=== cache-relay: Basic Usage Example ===\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure and start the relay
    // ─────────────────────────────────────────────────────────────────────────
    let mut classes = HashMap::new();
    classes.insert(
        "url".to_string(),
        ClassConfig {
            source_nodes: vec!["redis://127.0.0.1:6379".into()],
            rate_limit: 500.0,
            drain_batch_size: 50,
            ..Default::default()
        },
    );
    classes.insert(
        "tag".to_string(),
        ClassConfig {
            source_nodes: vec!["redis://127.0.0.1:6379".into()],
            rate_limit: 200.0,
            ..Default::default()
        },
    );

    // Fast tier: in-process, entries live one hour
    let fast = Arc::new(MemoryTier::new(Some(Duration::from_secs(3600))));

    let mut relay = CacheRelay::new(RelayConfig { classes }, fast);
    println!("State: {:?}", relay.state());

    relay.start().await?;
    assert_eq!(relay.state(), RelayState::Running);
    println!("Relay running\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 2. First request: everything misses, backfill is queued
    // ─────────────────────────────────────────────────────────────────────────
    let keys: Vec<String> = vec!["user.alice".into(), "user.nobody".into()];

    let first = relay.resolve("url", &keys).await;
    println!("First resolve (expect all empty): {:?}", first);

    // Give the drain worker a moment to run its multi-get
    tokio::time::sleep(Duration::from_millis(200)).await;

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Second request: refilled keys answer, absent keys short-circuit
    // ─────────────────────────────────────────────────────────────────────────
    let second = relay.resolve("url", &keys).await;
    println!("Second resolve (seeded keys now hit): {:?}", second);

    let stats = relay.stats();
    for (class, class_stats) in &stats.classes {
        println!(
            "class {}: queue {}/{}, negative markers {}",
            class, class_stats.queue_depth, class_stats.queue_capacity, class_stats.negative_entries
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Metrics snapshot
    // ─────────────────────────────────────────────────────────────────────────
    println!("\nMetrics:");
    for (key, _, _, value) in snapshotter.snapshot().into_vec() {
        println!("  {:?} = {:?}", key.key(), value);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Shutdown
    // ─────────────────────────────────────────────────────────────────────────
    relay.shutdown().await;
    println!("\nDone.");
    Ok(())
}
