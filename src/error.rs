//! Error taxonomy.
//!
//! Leaf errors ([`StoreError`], [`BrokerError`]) never leave the fetch that produced them:
//! the monitor turns them into absent fields. [`MonitorError`] is what a refresh cycle or the
//! process itself can fail with.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("metadata store request failed: {0}")]
    Transient(String),

    #[error("metadata store session expired")]
    SessionExpired,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("unknown partition '{partition}' of topic '{topic}'")]
    UnknownPartition { topic: String, partition: String },

    #[error("broker request failed: {0}")]
    Transient(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// The cycle could not start (top-level listing failed, store unreachable).
    #[error("refresh cycle aborted: {0}")]
    Structural(String),

    #[error("coordination session expired")]
    SessionFatal,

    #[error("config error: {0}")]
    Config(String),

    #[error("refresh scheduler is not running")]
    SchedulerStopped,
}

impl From<StoreError> for MonitorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionExpired => MonitorError::SessionFatal,
            other => MonitorError::Structural(other.to_string()),
        }
    }
}
