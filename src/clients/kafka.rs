use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rskafka::client::partition::{OffsetAt, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder};

use crate::clients::Broker;
use crate::config::KafkaConfig;
use crate::error::BrokerError;

/// [`Broker`] backed by an `rskafka` client.
///
/// The client is built on first use and dropped after a failed request so the next cycle
/// reconnects instead of reusing a broken connection.
pub struct KafkaBroker {
    config: KafkaConfig,
    client: Mutex<Option<Arc<Client>>>,
}

impl KafkaBroker {
    pub fn new(config: KafkaConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    async fn client(&self) -> Result<Arc<Client>, BrokerError> {
        let cached = self.client.lock().clone();
        if let Some(client) = cached {
            return Ok(client);
        }

        tracing::debug!(brokers = ?self.config.brokers, "connecting to kafka");
        let client = ClientBuilder::new(self.config.brokers.clone())
            .client_id(self.config.client_id.clone())
            .build()
            .await
            .map_err(|e| BrokerError::Transient(format!("cannot connect to kafka: {}", e)))?;
        let client = Arc::new(client);

        // Concurrent first calls may each build a client; the first one stored wins.
        let stored = self.client.lock().get_or_insert(client).clone();
        Ok(stored)
    }

    fn reset(&self) {
        self.client.lock().take();
    }
}

#[async_trait]
impl Broker for KafkaBroker {
    async fn fetch_high_water_mark(&self, topic: &str, partition: &str) -> Result<i64, BrokerError> {
        let partition_id: i32 = partition.parse().map_err(|_| BrokerError::UnknownPartition {
            topic: topic.to_string(),
            partition: partition.to_string(),
        })?;

        let client = self.client().await?;
        let result = async {
            let partition_client = client
                .partition_client(topic, partition_id, UnknownTopicHandling::Error)
                .await?;
            partition_client.get_offset(OffsetAt::Latest).await
        }
        .await;

        result.map_err(|e| {
            self.reset();
            BrokerError::Transient(format!("{}/{}: {}", topic, partition, e))
        })
    }
}
