//! Snapshot Cache: per-group partition records, shared by the monitor and the HTTP API.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

use crate::config::CacheConfig;
use crate::monitor::GroupSnapshot;

#[derive(Clone, Debug)]
struct Entry {
    snapshot: GroupSnapshot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expiry| expiry > now)
    }
}

/// Full cache contents; `items[i]` belongs to `keys[i]`.
#[derive(Debug, Clone, Default)]
pub struct CacheContents {
    pub keys: Vec<String>,
    pub items: Vec<GroupSnapshot>,
}

#[derive(Clone)]
pub struct SnapshotCache {
    inner: Arc<DashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl SnapshotCache {
    pub fn new(config: CacheConfig) -> Self {
        let inner = Arc::new(DashMap::new());
        let ttl = (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs));

        if ttl.is_some() {
            // Weak reference: the sweeper must not keep a dropped cache alive
            let weak_inner = Arc::downgrade(&inner);
            let cleanup_interval = Duration::from_secs(config.cleanup_interval_secs.max(1));

            tokio::spawn(async move {
                let mut interval = time::interval(cleanup_interval);
                loop {
                    interval.tick().await;
                    match weak_inner.upgrade() {
                        Some(map) => {
                            let now = Instant::now();
                            map.retain(|_, entry: &mut Entry| entry.is_live(now));
                        }
                        None => break,
                    }
                }
            });
        }

        Self { inner, ttl }
    }

    /// Replaces the whole snapshot of `key`.
    pub fn set(&self, key: String, snapshot: GroupSnapshot) {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        self.inner.insert(key, Entry { snapshot, expires_at });
    }

    pub fn get(&self, key: &str) -> Option<GroupSnapshot> {
        let entry = self.inner.get(key)?;
        if !entry.is_live(Instant::now()) {
            return None;
        }
        Some(entry.snapshot.clone())
    }

    /// Live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .inner
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn get_all(&self) -> CacheContents {
        let now = Instant::now();
        let mut pairs: Vec<(String, GroupSnapshot)> = self
            .inner
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .map(|entry| (entry.key().clone(), entry.value().snapshot.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let (keys, items) = pairs.into_iter().unzip();
        CacheContents { keys, items }
    }
}
