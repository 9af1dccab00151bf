use std::collections::HashMap;

use serde::Serialize;

/// One row per (group, topic, partition) observed in the metadata tree.
///
/// An empty `topic` means the group has no topics; an empty `partition` means the topic has no
/// partitions. Both are placeholders, not lookups that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionRecord {
    #[serde(rename = "consumer")]
    pub group: String,
    pub topic: String,
    pub partition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag: Option<i64>,
}

impl PartitionRecord {
    /// Group with nothing registered under it.
    pub fn empty_group(group: &str) -> Self {
        Self::placeholder(group, "")
    }

    /// Topic with no partitions (or whose partitions could not be listed).
    pub fn placeholder(group: &str, topic: &str) -> Self {
        Self {
            group: group.to_string(),
            topic: topic.to_string(),
            partition: String::new(),
            offset: None,
            owner: None,
            end: None,
            lag: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.topic.is_empty() || self.partition.is_empty()
    }

    /// Committed offset as a number, when the stored value is numeric.
    pub fn committed_offset(&self) -> Option<i64> {
        self.offset.as_deref().and_then(|o| o.trim().parse().ok())
    }

    /// Sets `end` and recomputes `lag`; lag stays absent without a numeric committed offset
    /// or when the difference does not fit an `i64`.
    pub fn apply_end(&mut self, end: i64) {
        self.end = Some(end);
        self.lag = self.committed_offset().and_then(|offset| end.checked_sub(offset));
    }
}

/// Records of one group, in discovery order.
pub type GroupSnapshot = Vec<PartitionRecord>;

/// Broker end offsets keyed by topic, then partition name.
pub type HighWaterMarks = HashMap<String, HashMap<String, i64>>;

/// One high-water-mark lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub topic: String,
    pub partition: String,
}
