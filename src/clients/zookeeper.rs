use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use zookeeper_client as zk;

use crate::clients::MetadataStore;
use crate::error::{MonitorError, StoreError};

/// [`MetadataStore`] backed by a live ZooKeeper session.
pub struct ZooKeeperStore {
    client: zk::Client,
}

impl ZooKeeperStore {
    pub async fn connect(cluster: &str) -> Result<Self, MonitorError> {
        tracing::debug!(cluster, "connecting to zookeeper");
        let client = zk::Client::connect(cluster)
            .await
            .map_err(|e| MonitorError::Structural(format!("cannot connect to zookeeper at {}: {}", cluster, e)))?;
        tracing::info!(cluster, "connection to zookeeper established");
        Ok(Self { client })
    }

    /// Resolves once the session is gone for good and cancels `shutdown`.
    ///
    /// An expired session cannot be resumed in-process; the caller is expected to exit and let
    /// the supervisor restart it.
    pub fn watch_session(&self, shutdown: CancellationToken) -> tokio::task::JoinHandle<bool> {
        let mut watcher = self.client.state_watcher();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return false,
                    state = watcher.changed() => {
                        tracing::debug!(?state, "zookeeper session state changed");
                        match state {
                            zk::SessionState::Expired => {
                                tracing::error!("zookeeper session expired, shutting down");
                                shutdown.cancel();
                                return true;
                            }
                            zk::SessionState::Closed => {
                                shutdown.cancel();
                                return false;
                            }
                            _ => {}
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl MetadataStore for ZooKeeperStore {
    async fn get_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.client.list_children(path).await.map_err(|e| map_error(path, e))
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let (data, _stat) = self.client.get_data(path).await.map_err(|e| map_error(path, e))?;
        Ok(data)
    }
}

fn map_error(path: &str, err: zk::Error) -> StoreError {
    match err {
        zk::Error::NoNode => StoreError::NotFound(path.to_string()),
        zk::Error::SessionExpired => StoreError::SessionExpired,
        other => StoreError::Transient(format!("{}: {}", path, other)),
    }
}
