use std::process::ExitCode;
use std::sync::Arc;

use lagmon::clients::{KafkaBroker, ZooKeeperStore};
use lagmon::config::Config;
use lagmon::error::MonitorError;
use lagmon::server::start_http_server;
use lagmon::LagMonitor;
use tokio_util::sync::CancellationToken;

/// Exit status asking the supervisor for a clean restart after the session expired.
const SESSION_EXPIRED_EXIT: u8 = 15;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::global() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.server.log_level))
        .init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(MonitorError::SessionFatal) => ExitCode::from(SESSION_EXPIRED_EXIT),
        Err(e) => {
            tracing::error!(error = %e, "lag monitor stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &'static Config) -> Result<(), MonitorError> {
    let shutdown = CancellationToken::new();

    let zookeeper = ZooKeeperStore::connect(&config.zookeeper.connect).await?;
    let session_watch = zookeeper.watch_session(shutdown.clone());
    let broker = KafkaBroker::new(config.kafka.clone());

    let (engine, scheduler) = LagMonitor::start(
        Arc::new(zookeeper),
        Arc::new(broker),
        &config.zookeeper.consumers_path,
        &config.monitor,
        config.cache.clone(),
        shutdown.clone(),
    );

    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            ctrl_c_token.cancel();
        }
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let served = start_http_server(engine, &addr, shutdown.clone()).await;
    shutdown.cancel();

    let session_expired = session_watch.await.unwrap_or(false);
    let scheduler_result = scheduler.await.unwrap_or(Ok(()));

    if session_expired {
        return Err(MonitorError::SessionFatal);
    }
    served.map_err(|e| MonitorError::Structural(format!("HTTP server on {} failed: {}", addr, e)))?;
    scheduler_result
}
