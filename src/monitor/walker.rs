//! Metadata Tree Walker
//!
//! Layout under the consumers root:
//! - `<root>/<group>/offsets/<topic>/<partition>` holds the committed offset
//! - `<root>/<group>/owners/<topic>/<partition>` holds the owning consumer id
//!
//! Every level may be missing. A missing level becomes a placeholder record; only failing to
//! list the groups themselves, or losing the session, aborts the pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::{join, try_join_all};

use crate::clients::MetadataStore;
use crate::error::{MonitorError, StoreError};
use crate::monitor::{GroupSnapshot, PartitionRecord};

pub struct Walker {
    store: Arc<dyn MetadataStore>,
    root: String,
    excluded: Vec<String>,
}

impl Walker {
    pub fn new(store: Arc<dyn MetadataStore>, root: impl Into<String>, excluded: Vec<String>) -> Self {
        let root = root.into().trim_end_matches('/').to_string();
        Self { store, root, excluded }
    }

    /// Walks every non-excluded group. Each one gets exactly one snapshot, possibly a lone
    /// placeholder. An expired session anywhere in the tree aborts the whole pass.
    pub async fn discover_all(&self) -> Result<BTreeMap<String, GroupSnapshot>, MonitorError> {
        let groups = self.store.get_children(self.root_path()).await.map_err(|e| {
            tracing::error!(path = %self.root, error = %e, "cannot list consumer groups");
            MonitorError::from(e)
        })?;
        tracing::trace!(?groups, "registered consumer groups");

        let groups: Vec<String> = groups.into_iter().filter(|g| !self.is_excluded(g)).collect();

        let snapshots = try_join_all(groups.iter().map(|group| self.list_topics(group))).await?;

        Ok(groups.into_iter().zip(snapshots).collect())
    }

    /// Records for every topic of `group`, flattened in topic listing order.
    pub async fn list_topics(&self, group: &str) -> Result<GroupSnapshot, MonitorError> {
        let path = format!("{}/{}/offsets", self.root, group);
        let topics = match self.store.get_children(&path).await {
            Ok(topics) if !topics.is_empty() => topics,
            Ok(_) => return Ok(vec![PartitionRecord::empty_group(group)]),
            Err(StoreError::SessionExpired) => return Err(MonitorError::SessionFatal),
            Err(e) => {
                tracing::warn!(group, path = %path, error = %e, "cannot list topics");
                return Ok(vec![PartitionRecord::empty_group(group)]);
            }
        };
        tracing::trace!(group, ?topics, "registered topics");

        let records: GroupSnapshot = try_join_all(topics.iter().map(|topic| self.list_partitions(group, topic)))
            .await?
            .into_iter()
            .flatten()
            .collect();

        if records.is_empty() {
            return Ok(vec![PartitionRecord::empty_group(group)]);
        }
        Ok(records)
    }

    /// Records for every partition of `topic`, in listing order.
    pub async fn list_partitions(&self, group: &str, topic: &str) -> Result<GroupSnapshot, MonitorError> {
        let path = format!("{}/{}/offsets/{}", self.root, group, topic);
        let partitions = match self.store.get_children(&path).await {
            Ok(partitions) if !partitions.is_empty() => partitions,
            Ok(_) => return Ok(vec![PartitionRecord::placeholder(group, topic)]),
            Err(StoreError::SessionExpired) => return Err(MonitorError::SessionFatal),
            Err(e) => {
                tracing::warn!(group, topic, path = %path, error = %e, "cannot list partitions");
                return Ok(vec![PartitionRecord::placeholder(group, topic)]);
            }
        };
        tracing::trace!(group, topic, ?partitions, "registered partitions");

        try_join_all(
            partitions
                .iter()
                .map(|partition| self.build_partition_record(group, topic, partition)),
        )
        .await
    }

    pub async fn build_partition_record(
        &self,
        group: &str,
        topic: &str,
        partition: &str,
    ) -> Result<PartitionRecord, MonitorError> {
        let (offset, owner) = join(
            self.fetch_offset(group, topic, partition),
            self.fetch_owner(group, topic, partition),
        )
        .await;

        Ok(PartitionRecord {
            group: group.to_string(),
            topic: topic.to_string(),
            partition: partition.to_string(),
            offset: offset?,
            owner: owner?,
            end: None,
            lag: None,
        })
    }

    pub async fn fetch_offset(&self, group: &str, topic: &str, partition: &str) -> Result<Option<String>, MonitorError> {
        self.read_leaf(format!("{}/{}/offsets/{}/{}", self.root, group, topic, partition), "offset")
            .await
    }

    pub async fn fetch_owner(&self, group: &str, topic: &str, partition: &str) -> Result<Option<String>, MonitorError> {
        self.read_leaf(format!("{}/{}/owners/{}/{}", self.root, group, topic, partition), "owner")
            .await
    }

    /// Any failure other than an expired session reads as "absent".
    async fn read_leaf(&self, path: String, kind: &str) -> Result<Option<String>, MonitorError> {
        match self.store.get_data(&path).await {
            Ok(data) => {
                let value = String::from_utf8_lossy(&data).into_owned();
                tracing::trace!(path = %path, value = %value, "registered {}", kind);
                Ok(Some(value))
            }
            Err(StoreError::NotFound(_)) => {
                tracing::trace!(path = %path, "no {} registered", kind);
                Ok(None)
            }
            Err(StoreError::SessionExpired) => Err(MonitorError::SessionFatal),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "cannot read {}", kind);
                Ok(None)
            }
        }
    }

    fn is_excluded(&self, group: &str) -> bool {
        self.excluded.iter().any(|pattern| group.contains(pattern.as_str()))
    }

    fn root_path(&self) -> &str {
        if self.root.is_empty() {
            "/"
        } else {
            &self.root
        }
    }
}
