use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use lessonbook::clock::{Clock, SystemClock};
use lessonbook::config::Config;
use lessonbook::notify::{Notifier, NotifyHub};
use lessonbook::store::Store;
use lessonbook::sweeper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    lessonbook::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Arc::new(Store::open(config.journal_path())?);
    let hub = Arc::new(NotifyHub::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    info!("lessonbook started");
    info!("  journal: {}", config.journal_path().display());
    info!("  detector every {:?}", config.detector_interval);
    info!("  finisher every {:?}", config.finisher_interval);
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    // Delivery lives outside this process; hand each notification on as a JSON log line.
    let mut outbox = hub.subscribe();
    let relay = tokio::spawn(async move {
        loop {
            match outbox.recv().await {
                Ok(n) => info!(target: "lessonbook::outbox", "{}", n.to_json()),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("outbox lagged, {skipped} notifications dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let notifier: Arc<dyn Notifier> = hub.clone();
    let tasks = [
        tokio::spawn(sweeper::run_unused_detector(
            store.clone(),
            notifier,
            clock.clone(),
            config.detector_interval,
        )),
        tokio::spawn(sweeper::run_finisher(store.clone(), clock, config.finisher_interval)),
        tokio::spawn(sweeper::run_compactor(store.clone(), config.compact_threshold)),
    ];

    // Run until SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received, stopping sweepers");

    for task in &tasks {
        task.abort();
    }
    relay.abort();
    store.compact_journal().await?;

    info!("lessonbook stopped");
    Ok(())
}
