//! Refresh Scheduler: Actor driving refresh cycles
//!
//! Two states. IDLE waits for the timer, an external request or shutdown. REFRESHING runs one
//! cycle to completion while collecting every request that arrives meanwhile; they all get the
//! outcome of that same cycle. The next timer is armed from completion, so cycles never overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;
use crate::monitor::pipeline::Pipeline;

// ==========================================
// SCHEDULER COMMANDS
// ==========================================

pub enum SchedulerCommand {
    Refresh {
        reply: oneshot::Sender<Result<(), MonitorError>>,
    },
}

// ==========================================
// HANDLE
// ==========================================

#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<SchedulerCommand>,
    cycles: Arc<AtomicU64>,
}

impl RefreshHandle {
    /// Triggers a cycle, or attaches to the one already running, and waits for its outcome.
    pub async fn refresh(&self) -> Result<(), MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SchedulerCommand::Refresh { reply })
            .await
            .map_err(|_| MonitorError::SchedulerStopped)?;
        rx.await.map_err(|_| MonitorError::SchedulerStopped)?
    }

    /// Cycles completed so far, failed ones included.
    pub fn completed_cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }
}

// ==========================================
// ACTOR
// ==========================================

pub struct RefreshScheduler {
    pipeline: Arc<Pipeline>,
    interval: Duration,
    rx: mpsc::Receiver<SchedulerCommand>,
    shutdown: CancellationToken,
    cycles: Arc<AtomicU64>,
}

impl RefreshScheduler {
    /// Starts the actor; the first cycle runs right away.
    ///
    /// The task resolves when `shutdown` is cancelled, with `Err(SessionFatal)` if a cycle found
    /// the coordination session expired (the token is cancelled in that case too).
    pub fn spawn(
        pipeline: Arc<Pipeline>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> (RefreshHandle, JoinHandle<Result<(), MonitorError>>) {
        let (tx, rx) = mpsc::channel(100);
        let cycles = Arc::new(AtomicU64::new(0));

        let actor = Self {
            pipeline,
            interval,
            rx,
            shutdown,
            cycles: cycles.clone(),
        };
        let join = tokio::spawn(actor.run());

        (RefreshHandle { tx, cycles }, join)
    }

    async fn run(mut self) -> Result<(), MonitorError> {
        let mut next_tick = Instant::now();
        let mut rx_open = true;

        loop {
            let mut waiters = Vec::new();

            // IDLE
            tokio::select! {
                _ = self.shutdown.cancelled() => break,

                _ = time::sleep_until(next_tick) => {
                    tracing::trace!("scheduled refresh");
                }

                maybe_cmd = self.rx.recv(), if rx_open => {
                    match maybe_cmd {
                        Some(SchedulerCommand::Refresh { reply }) => {
                            tracing::trace!("refresh requested");
                            waiters.push(reply);
                        }
                        None => {
                            rx_open = false;
                            continue;
                        }
                    }
                }
            }

            // REFRESHING
            let result = self.refresh_collecting(&mut waiters, &mut rx_open).await;
            self.cycles.fetch_add(1, Ordering::SeqCst);

            match &result {
                Ok(()) => tracing::info!(waiters = waiters.len(), "refresh cycle complete"),
                Err(e) => tracing::error!(error = %e, "refresh cycle failed"),
            }
            for reply in waiters {
                let _ = reply.send(result.clone());
            }

            if result == Err(MonitorError::SessionFatal) {
                self.shutdown.cancel();
                return result;
            }

            next_tick = Instant::now() + self.interval;
        }

        tracing::debug!("refresh scheduler stopped");
        Ok(())
    }

    async fn refresh_collecting(
        &mut self,
        waiters: &mut Vec<oneshot::Sender<Result<(), MonitorError>>>,
        rx_open: &mut bool,
    ) -> Result<(), MonitorError> {
        let pipeline = self.pipeline.clone();
        let cycle = pipeline.run_cycle();
        tokio::pin!(cycle);

        loop {
            tokio::select! {
                result = &mut cycle => return result,

                maybe_cmd = self.rx.recv(), if *rx_open => {
                    match maybe_cmd {
                        Some(SchedulerCommand::Refresh { reply }) => {
                            tracing::debug!("refresh already running, attaching");
                            waiters.push(reply);
                        }
                        None => *rx_open = false,
                    }
                }
            }
        }
    }
}
