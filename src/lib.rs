pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod monitor;
pub mod server;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::SnapshotCache;
use crate::clients::{Broker, MetadataStore};
use crate::config::{CacheConfig, MonitorConfig};
use crate::error::MonitorError;
use crate::monitor::{Pipeline, RefreshHandle, RefreshScheduler};

// ========================================
// ENGINE
// ========================================

/// Handles shared by the HTTP API.
/// Cheap to clone.
#[derive(Clone)]
pub struct LagMonitor {
    pub cache: SnapshotCache,
    pub refresh: RefreshHandle,
}

impl LagMonitor {
    /// Builds the cache and pipeline and starts the refresh scheduler.
    pub fn start(
        store: Arc<dyn MetadataStore>,
        broker: Arc<dyn Broker>,
        consumers_path: &str,
        monitor: &MonitorConfig,
        cache: CacheConfig,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<Result<(), MonitorError>>) {
        let cache = SnapshotCache::new(cache);
        let pipeline = Arc::new(Pipeline::new(store, broker, cache.clone(), consumers_path, monitor));
        let (refresh, join) = RefreshScheduler::spawn(pipeline, monitor.refresh_interval(), shutdown);

        (Self { cache, refresh }, join)
    }
}
