#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lagmon::cache::SnapshotCache;
use lagmon::clients::{Broker, MetadataStore};
use lagmon::config::{CacheConfig, MonitorConfig};
use lagmon::error::{BrokerError, StoreError};
use lagmon::monitor::Pipeline;
use lagmon::LagMonitor;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub const ROOT: &str = "/consumers";

// ========================================
// METADATA STORE FAKE
// ========================================

#[derive(Default)]
struct Tree {
    children: HashMap<String, Vec<String>>,
    data: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    expired_at: HashSet<String>,
    expired: bool,
}

impl Tree {
    fn add_child(&mut self, parent: &str, child: &str) {
        let entry = self.children.entry(parent.to_string()).or_default();
        if !entry.iter().any(|c| c == child) {
            entry.push(child.to_string());
        }
        self.children.entry(format!("{}/{}", parent, child)).or_default();
    }
}

/// In-memory ZooKeeper-shaped tree. Paths marked failing return a transient error.
#[derive(Default)]
pub struct MemoryStore {
    tree: Mutex<Tree>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.tree.lock().children.insert(ROOT.to_string(), Vec::new());
        store
    }

    /// Group node only; it has no `offsets` child.
    pub fn add_group(&self, group: &str) -> &Self {
        self.tree.lock().add_child(ROOT, group);
        self
    }

    /// Group with an `offsets` node but no topics under it.
    pub fn add_empty_offsets(&self, group: &str) -> &Self {
        let mut tree = self.tree.lock();
        tree.add_child(ROOT, group);
        tree.add_child(&format!("{}/{}", ROOT, group), "offsets");
        drop(tree);
        self
    }

    /// Topic without partitions.
    pub fn add_topic(&self, group: &str, topic: &str) -> &Self {
        let mut tree = self.tree.lock();
        tree.add_child(ROOT, group);
        tree.add_child(&format!("{}/{}", ROOT, group), "offsets");
        tree.add_child(&format!("{}/{}/offsets", ROOT, group), topic);
        drop(tree);
        self
    }

    pub fn add_partition(
        &self,
        group: &str,
        topic: &str,
        partition: &str,
        offset: Option<&str>,
        owner: Option<&str>,
    ) -> &Self {
        self.add_topic(group, topic);
        let mut tree = self.tree.lock();
        tree.add_child(&format!("{}/{}/offsets/{}", ROOT, group, topic), partition);
        if let Some(offset) = offset {
            tree.data.insert(
                format!("{}/{}/offsets/{}/{}", ROOT, group, topic, partition),
                offset.as_bytes().to_vec(),
            );
        }
        if let Some(owner) = owner {
            tree.data.insert(
                format!("{}/{}/owners/{}/{}", ROOT, group, topic, partition),
                owner.as_bytes().to_vec(),
            );
        }
        drop(tree);
        self
    }

    pub fn fail(&self, path: &str) -> &Self {
        self.tree.lock().failing.insert(path.to_string());
        self
    }

    pub fn heal(&self, path: &str) -> &Self {
        self.tree.lock().failing.remove(path);
        self
    }

    /// Every later request fails as if the session had expired.
    pub fn expire_session(&self) {
        self.tree.lock().expired = true;
    }

    /// Requests for `path` only report an expired session.
    pub fn expire_at(&self, path: &str) -> &Self {
        self.tree.lock().expired_at.insert(path.to_string());
        self
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().get(path).copied().unwrap_or(0)
    }

    fn record_call(&self, path: &str) -> Result<(), StoreError> {
        *self.calls.lock().entry(path.to_string()).or_default() += 1;
        let tree = self.tree.lock();
        if tree.expired || tree.expired_at.contains(path) {
            return Err(StoreError::SessionExpired);
        }
        if tree.failing.contains(path) {
            return Err(StoreError::Transient(format!("connection loss at {}", path)));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.record_call(path)?;
        tokio::task::yield_now().await;
        self.tree
            .lock()
            .children
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.record_call(path)?;
        tokio::task::yield_now().await;
        self.tree
            .lock()
            .data
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}

// ========================================
// BROKER FAKE
// ========================================

/// High-water marks per (topic, partition); unknown pairs fail. Optionally gated so a cycle
/// can be held open.
pub struct MemoryBroker {
    marks: Mutex<HashMap<(String, String), i64>>,
    calls: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            marks: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            gate,
        }
    }

    pub fn set(&self, topic: &str, partition: &str, end: i64) -> &Self {
        self.marks.lock().insert((topic.to_string(), partition.to_string()), end);
        self
    }

    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn fetch_high_water_mark(&self, topic: &str, partition: &str) -> Result<i64, BrokerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        self.marks
            .lock()
            .get(&(topic.to_string(), partition.to_string()))
            .copied()
            .ok_or_else(|| BrokerError::UnknownPartition {
                topic: topic.to_string(),
                partition: partition.to_string(),
            })
    }
}

// ========================================
// SETUP
// ========================================

/// group1/topic1: partition0 (offset 100, owner1), partition1 (nothing registered).
pub fn single_group_tree() -> (Arc<MemoryStore>, Arc<MemoryBroker>) {
    let store = Arc::new(MemoryStore::new());
    store
        .add_partition("group1", "topic1", "partition0", Some("100"), Some("owner1"))
        .add_partition("group1", "topic1", "partition1", None, None);

    let broker = Arc::new(MemoryBroker::new());
    broker.set("topic1", "partition0", 150);

    (store, broker)
}

pub fn setup_pipeline(store: Arc<MemoryStore>, broker: Arc<MemoryBroker>) -> (Pipeline, SnapshotCache) {
    let cache = SnapshotCache::new(CacheConfig::default());
    let pipeline = Pipeline::new(store, broker, cache.clone(), ROOT, &MonitorConfig::default());
    (pipeline, cache)
}

/// Engine whose timer never fires again after the first cycle.
pub fn setup_monitor(
    store: Arc<MemoryStore>,
    broker: Arc<MemoryBroker>,
) -> (LagMonitor, CancellationToken, tokio::task::JoinHandle<Result<(), lagmon::error::MonitorError>>) {
    let shutdown = CancellationToken::new();
    let config = MonitorConfig {
        refresh_interval_ms: 3_600_000,
        ..MonitorConfig::default()
    };
    let (engine, join) = LagMonitor::start(store, broker, ROOT, &config, CacheConfig::default(), shutdown.clone());
    (engine, shutdown, join)
}

/// Waits until the scheduler has completed `n` cycles.
pub async fn wait_for_cycles(engine: &LagMonitor, n: u64) {
    for _ in 0..500 {
        if engine.refresh.completed_cycles() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scheduler did not complete {} cycles", n);
}
