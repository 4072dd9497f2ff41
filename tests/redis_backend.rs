//! Integration tests for the Redis slow-source connector.
//!
//! These require Docker and use testcontainers for portability.
//!
//! # Running Tests
//! ```bash
//! cargo test --test redis_backend -- --ignored
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;
use testcontainers::{clients::Cli, core::WaitFor, Container, GenericImage};
use tokio::time::sleep;

use cache_relay::{CacheRelay, ClassConfig, MemoryTier, RedisSource, RelayConfig, SlowSource};

fn redis_container(docker: &Cli) -> Container<'_, GenericImage> {
    let image = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(6379)
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));
    docker.run(image)
}

async fn seed(url: &str, entries: &[(&str, &str)]) {
    let client = redis::Client::open(url).expect("bad redis url");
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .expect("redis unreachable");
    for (key, value) in entries {
        let _: () = conn.set(key, value).await.expect("seed failed");
    }
}

#[tokio::test]
#[ignore] // Requires Docker
async fn source_get_and_mget_roundtrip() {
    let docker = Cli::default();
    let redis = redis_container(&docker);
    let url = format!("redis://127.0.0.1:{}", redis.get_host_port_ipv4(6379));

    seed(&url, &[("a", "1"), ("c", "3")]).await;

    let source = RedisSource::connect(&[url]).await.expect("connect failed");
    assert_eq!(source.node_count(), 1);

    assert_eq!(source.get("a").await.unwrap().as_deref(), Some("1"));
    assert!(source.get("b").await.unwrap().is_none());

    let keys: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let result = source.mget(&keys).await.unwrap();
    assert_eq!(result["a"].as_deref(), Some("1"));
    assert!(result["b"].is_none());
    assert_eq!(result["c"].as_deref(), Some("3"));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn relay_backfills_from_real_redis() {
    let docker = Cli::default();
    let redis = redis_container(&docker);
    let url = format!("redis://127.0.0.1:{}", redis.get_host_port_ipv4(6379));

    seed(&url, &[("x", "http://a")]).await;

    let mut classes = HashMap::new();
    classes.insert(
        "url".to_string(),
        ClassConfig {
            source_nodes: vec![url],
            drain_idle_ms: 1,
            ..Default::default()
        },
    );

    let fast = Arc::new(MemoryTier::new(None));
    let mut relay = CacheRelay::new(RelayConfig { classes }, fast);
    relay.start().await.expect("relay failed to start");

    let keys: Vec<String> = vec!["x".to_string(), "y".to_string()];
    let first = relay.resolve("url", &keys).await;
    assert_eq!(first["x"], "");
    assert_eq!(first["y"], "");

    sleep(Duration::from_millis(500)).await;

    let second = relay.resolve("url", &keys).await;
    assert_eq!(second["x"], "http://a");
    assert_eq!(second["y"], "");

    relay.shutdown().await;
}

#[tokio::test]
#[ignore] // Requires Docker
async fn source_connect_skips_dead_nodes() {
    let docker = Cli::default();
    let redis = redis_container(&docker);
    let live = format!("redis://127.0.0.1:{}", redis.get_host_port_ipv4(6379));
    let dead = "redis://127.0.0.1:1".to_string();

    let source = RedisSource::connect(&[live, dead])
        .await
        .expect("one live node should be enough");
    assert_eq!(source.node_count(), 1);
}
