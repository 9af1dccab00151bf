//! Capabilities the monitor consumes from the outside world.
//!
//! The walker and the fetcher only see these traits, so tests swap in in-memory fakes.

pub mod kafka;
pub mod zookeeper;

use async_trait::async_trait;

use crate::error::{BrokerError, StoreError};

pub use kafka::KafkaBroker;
pub use zookeeper::ZooKeeperStore;

/// Hierarchical metadata store (ZooKeeper layout).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError>;

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Message broker offset queries.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Current end offset of one partition.
    async fn fetch_high_water_mark(&self, topic: &str, partition: &str) -> Result<i64, BrokerError>;
}
