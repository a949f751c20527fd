//! testgen-batch - command-line entry point
//!
//! Scans the configured project root and sends every candidate file to the
//! generation service, one at a time.

use testgen_batch::{
    candidates, client::HttpGenerationClient, driver::BatchDriver, sink::ResultSink,
    sink::SqliteSink, Config,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "testgen_batch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: root={}, endpoint={}",
        config.root_dir.display(),
        config.generate_url
    );

    let sink = SqliteSink::open(&config.output_path)?;
    let client = HttpGenerationClient::new(config.generate_url.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, abandoning the current file");
            on_interrupt.cancel();
        }
    });

    let mut driver = BatchDriver::new(client, sink, config.root_dir.clone(), config.request.clone())
        .with_cancellation(cancel);

    let items = candidates::enumerate(&config.root_dir, &config.candidates);
    let summary = driver.run(items).await;

    info!(
        elapsed = ?summary.elapsed,
        recorded = summary.recorded,
        failed = summary.failed,
        unsaved = summary.sink_failures,
        cancelled = summary.cancelled,
        "Run finished"
    );
    info!("Results saved to {}", driver.sink().location());

    Ok(())
}
