use anyhow::Context;
use enrollment::config::SNAPSHOT_ENV;
use enrollment::{ChannelSink, EngineConfig, Registrar, Snapshot, SystemClock};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(Path::new(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => EngineConfig::default(),
    }
    .with_snapshot_override(std::env::var(SNAPSHOT_ENV).ok());

    let level = Level::from_str(&config.log_level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let state = Snapshot::from_path(&config.snapshot_path)
        .and_then(Snapshot::build)
        .with_context(|| format!("loading snapshot {}", config.snapshot_path.display()))?;

    let (sink, mut receiver) = ChannelSink::new(config.intent_queue_capacity);
    let registrar = Registrar::new(state, Arc::new(sink), Arc::new(SystemClock));
    info!(
        "serving {} students over {} sections",
        registrar.student_count(),
        registrar.catalog().len()
    );

    // Stands in for the persistence worker
    let drain = tokio::spawn(async move {
        while let Some(routed) = receiver.recv().await {
            match serde_json::to_string(&routed.intent) {
                Ok(intent) => info!("department {}: {intent}", routed.department),
                Err(err) => warn!("could not encode intent {:?}: {err}", routed.intent),
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    // Dropping the last sink closes the channel and lets the drain finish
    drop(registrar);
    drain.await.context("intent drain task")?;
    Ok(())
}
