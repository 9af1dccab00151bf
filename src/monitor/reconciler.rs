//! Lag Reconciler
//!
//! Re-reads the cache instead of reusing the snapshot the walker just produced, so the merge
//! always lands on whatever is current. Records are never added, removed or reordered.

use crate::cache::SnapshotCache;
use crate::monitor::{GroupSnapshot, HighWaterMarks};

/// Fills `end`/`lag` of every record with a matching high-water mark. Returns the number of
/// records touched.
pub fn apply_high_water_marks(records: &mut GroupSnapshot, marks: &HighWaterMarks) -> usize {
    let mut touched = 0;
    for record in records.iter_mut() {
        let end = marks
            .get(&record.topic)
            .and_then(|partitions| partitions.get(&record.partition));
        if let Some(&end) = end {
            record.apply_end(end);
            touched += 1;
        }
    }
    touched
}

pub struct Reconciler {
    cache: SnapshotCache,
}

impl Reconciler {
    pub fn new(cache: SnapshotCache) -> Self {
        Self { cache }
    }

    pub fn reconcile(&self, marks: &HighWaterMarks) -> usize {
        if marks.is_empty() {
            tracing::debug!("no high-water marks to reconcile");
            return 0;
        }

        let contents = self.cache.get_all();
        let mut total = 0;
        for (group, mut records) in contents.keys.into_iter().zip(contents.items) {
            let touched = apply_high_water_marks(&mut records, marks);
            if touched > 0 {
                tracing::trace!(group = %group, touched, "saving reconciled group");
                self.cache.set(group, records);
                total += touched;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::PartitionRecord;
    use std::collections::HashMap;

    fn marks(topic: &str, partition: &str, end: i64) -> HighWaterMarks {
        HashMap::from([(topic.to_string(), HashMap::from([(partition.to_string(), end)]))])
    }

    fn record(topic: &str, partition: &str, offset: Option<&str>) -> PartitionRecord {
        PartitionRecord {
            group: "g".into(),
            topic: topic.into(),
            partition: partition.into(),
            offset: offset.map(str::to_string),
            owner: None,
            end: None,
            lag: None,
        }
    }

    #[test]
    fn only_matching_records_change() {
        let mut records = vec![
            record("t", "0", Some("10")),
            record("t", "1", Some("10")),
            PartitionRecord::placeholder("g", "t"),
        ];
        let touched = apply_high_water_marks(&mut records, &marks("t", "0", 25));

        assert_eq!(touched, 1);
        assert_eq!(records[0].end, Some(25));
        assert_eq!(records[0].lag, Some(15));
        assert_eq!(records[1], record("t", "1", Some("10")));
        assert_eq!(records[2], PartitionRecord::placeholder("g", "t"));
    }
}
