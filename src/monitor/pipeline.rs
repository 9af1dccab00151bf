//! One refresh cycle: discover -> fetch high-water marks -> write snapshots -> reconcile.

use std::sync::Arc;

use crate::cache::SnapshotCache;
use crate::clients::{Broker, MetadataStore};
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::monitor::fetcher::{build_fetch_requests, Fetcher};
use crate::monitor::reconciler::Reconciler;
use crate::monitor::walker::Walker;

pub struct Pipeline {
    walker: Walker,
    fetcher: Fetcher,
    reconciler: Reconciler,
    cache: SnapshotCache,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        broker: Arc<dyn Broker>,
        cache: SnapshotCache,
        consumers_path: &str,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            walker: Walker::new(store, consumers_path, config.excluded_groups.clone()),
            fetcher: Fetcher::new(broker),
            reconciler: Reconciler::new(cache.clone()),
            cache,
        }
    }

    /// Runs the stages in order. A structural failure leaves the cache as it was.
    pub async fn run_cycle(&self) -> Result<(), MonitorError> {
        tracing::trace!("loading consumer metadata");
        let discovered = self.walker.discover_all().await?;
        tracing::debug!(groups = discovered.len(), "discovered consumer groups");

        // Broker lookups run before anything is published: readers keep the previous snapshot
        // until the new one is complete.
        let requests = build_fetch_requests(discovered.values());
        tracing::debug!(requests = requests.len(), "fetching high-water marks");
        let marks = self.fetcher.fetch_high_water_marks(&requests).await;

        // No await from here on.
        for (group, records) in discovered {
            self.cache.set(group, records);
        }
        let touched = self.reconciler.reconcile(&marks);
        tracing::debug!(touched, "reconciled partition records");

        self.log_lags();
        Ok(())
    }

    fn log_lags(&self) {
        let contents = self.cache.get_all();
        for (group, records) in contents.keys.iter().zip(&contents.items) {
            let total_lag: i64 = records.iter().filter_map(|r| r.lag).sum();
            tracing::info!(group = %group, partitions = records.len(), total_lag, records = ?records, "consumer lags");
        }
    }
}
