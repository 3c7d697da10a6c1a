//! Per-team TTL cache for generated stats.
//!
//! Keyed purely by team identifier. Entries expire after a fixed window and
//! are checked on read; expired entries are swept on every insert so the map
//! never outgrows the set of teams seen within one window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::TeamStats;

/// Thread-safe, in-memory stats cache.
#[derive(Clone)]
pub struct StatsCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    stats: TeamStats,
    stored_at: Instant,
}

impl StatsCache {
    /// A zero `ttl` disables caching entirely.
    pub fn new(ttl: Duration) -> Self {
        StatsCache {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Return the cached record for `team` if it is still fresh.
    pub async fn get(&self, team: &str) -> Option<TeamStats> {
        if !self.is_enabled() {
            return None;
        }
        let inner = self.inner.read().await;
        inner
            .get(team)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.stats)
    }

    pub async fn insert(&self, team: &str, stats: TeamStats) {
        if !self.is_enabled() {
            return;
        }
        let mut inner = self.inner.write().await;
        let ttl = self.ttl;
        inner.retain(|_, e| e.stored_at.elapsed() < ttl);
        inner.insert(
            team.to_string(),
            CacheEntry {
                stats,
                stored_at: Instant::now(),
            },
        );
        debug!("StatsCache: {} team(s) cached", inner.len());
    }

    /// Number of entries still within the TTL.
    pub async fn len(&self) -> usize {
        let ttl = self.ttl;
        self.inner
            .read()
            .await
            .values()
            .filter(|e| e.stored_at.elapsed() < ttl)
            .count()
    }
}
