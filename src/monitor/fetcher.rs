//! High-Water-Mark Fetcher

use std::sync::Arc;

use futures_util::future::join_all;

use crate::clients::Broker;
use crate::monitor::{FetchRequest, GroupSnapshot, HighWaterMarks};

/// One request per discovered (topic, partition), placeholders skipped.
///
/// Pairs shared by several groups are requested once per group; the lookup is idempotent.
pub fn build_fetch_requests<'a>(
    snapshots: impl IntoIterator<Item = &'a GroupSnapshot>,
) -> Vec<FetchRequest> {
    snapshots
        .into_iter()
        .flatten()
        .filter(|record| !record.is_placeholder())
        .map(|record| FetchRequest {
            topic: record.topic.clone(),
            partition: record.partition.clone(),
        })
        .collect()
}

pub struct Fetcher {
    broker: Arc<dyn Broker>,
}

impl Fetcher {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    /// Queries every request concurrently. Failed lookups are left out of the result.
    pub async fn fetch_high_water_marks(&self, requests: &[FetchRequest]) -> HighWaterMarks {
        let results = join_all(requests.iter().map(|request| async move {
            let result = self
                .broker
                .fetch_high_water_mark(&request.topic, &request.partition)
                .await;
            (request, result)
        }))
        .await;

        let mut marks = HighWaterMarks::new();
        for (request, result) in results {
            match result {
                Ok(end) => {
                    tracing::trace!(topic = %request.topic, partition = %request.partition, end, "high-water mark");
                    marks
                        .entry(request.topic.clone())
                        .or_default()
                        .insert(request.partition.clone(), end);
                }
                Err(e) => {
                    tracing::warn!(topic = %request.topic, partition = %request.partition, error = %e, "cannot fetch high-water mark");
                }
            }
        }
        marks
    }
}
