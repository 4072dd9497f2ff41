// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Negative caching: time-bounded "confirmed absent from the source" markers.
//!
//! A marker is created only after the slow source confirmed a key absent
//! (or by a direct provisioning write). Within the marker window, lookups
//! for that key short-circuit before the fast tier and never reach the
//! backfill queue. This is the primary defense against miss-storm
//! amplification for keys that legitimately do not exist.
//!
//! One instance per request class; markers for the same key in different
//! classes are independent.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use cache_relay::NegativeCache;
//!
//! let cache = NegativeCache::new(Duration::from_secs(300));
//! assert!(!cache.is_marked_absent("user.42"));
//!
//! cache.mark_absent("user.42");
//! assert!(cache.is_marked_absent("user.42"));
//! ```

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Set of absence markers with a fixed lifetime.
///
/// Expiry is independent of access. A read of an expired marker reports
/// "not marked" and drops the entry; [`sweep_expired`](Self::sweep_expired)
/// ages out entries nothing reads again.
pub struct NegativeCache {
    markers: DashMap<String, Instant>,
    ttl: Duration,
}

impl NegativeCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            markers: DashMap::new(),
            ttl,
        }
    }

    /// Record that the source confirmed this key absent, with a fresh expiry.
    pub fn mark_absent(&self, key: &str) {
        self.markers
            .insert(key.to_string(), Instant::now() + self.ttl);
    }

    /// Check for a live marker. Expired markers read as absent-of-marker and
    /// are removed on the way out.
    pub fn is_marked_absent(&self, key: &str) -> bool {
        let live = match self.markers.get(key) {
            None => return false,
            Some(expiry) => Instant::now() < *expiry,
        };
        if !live {
            // Guarded: only removes if still expired, so a concurrent
            // re-mark with a fresh expiry survives.
            self.markers.remove_if(key, |_, expiry| Instant::now() >= *expiry);
        }
        live
    }

    /// Drop every expired marker, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let before = self.markers.len();
        let now = Instant::now();
        self.markers.retain(|_, expiry| now < *expiry);
        before.saturating_sub(self.markers.len())
    }

    /// Current marker count (expired markers included until swept).
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmarked_key_is_not_absent() {
        let cache = NegativeCache::new(Duration::from_secs(60));
        assert!(!cache.is_marked_absent("k"));
    }

    #[test]
    fn test_mark_and_check() {
        let cache = NegativeCache::new(Duration::from_secs(60));

        cache.mark_absent("k");

        assert!(cache.is_marked_absent("k"));
        assert!(!cache.is_marked_absent("other"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_classes_do_not_share_markers() {
        let url = NegativeCache::new(Duration::from_secs(60));
        let tag = NegativeCache::new(Duration::from_secs(60));

        url.mark_absent("k");

        assert!(url.is_marked_absent("k"));
        assert!(!tag.is_marked_absent("k"));
    }

    #[test]
    fn test_marker_expires() {
        let cache = NegativeCache::new(Duration::from_millis(30));

        cache.mark_absent("k");
        assert!(cache.is_marked_absent("k"));

        std::thread::sleep(Duration::from_millis(60));

        assert!(!cache.is_marked_absent("k"));
        // Expired read dropped the entry
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remark_refreshes_expiry() {
        let cache = NegativeCache::new(Duration::from_millis(80));

        cache.mark_absent("k");
        std::thread::sleep(Duration::from_millis(50));
        cache.mark_absent("k");
        std::thread::sleep(Duration::from_millis(50));

        // 100ms after the first mark, but only 50ms after the refresh
        assert!(cache.is_marked_absent("k"));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = NegativeCache::new(Duration::from_millis(40));

        cache.mark_absent("old");
        std::thread::sleep(Duration::from_millis(60));
        cache.mark_absent("fresh");

        let removed = cache.sweep_expired();

        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.is_marked_absent("fresh"));
    }
}
