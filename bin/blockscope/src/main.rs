//! Mempool capture daemon.
//!
//! Polls redundant node endpoints for pending transactions, correlates new
//! blocks against the local mempool view and persists per-block fee
//! economics for offline auction analysis.

use blockscope_observer::{
    config::{
        DEFAULT_CAPTURE_THRESHOLD, DEFAULT_MEMPOOL_TTL_SECS, DEFAULT_OUTPUT_FILE,
        DEFAULT_RETRY_DELAY_MS, DEFAULT_TICK_INTERVAL_MS,
    },
    DatasetWriter, EndpointPool, HttpNodeClient, NodeClient, ObserverConfig, Orchestrator,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

/// Command line surface of the capture daemon.
#[derive(Debug, Parser)]
#[command(name = "blockscope", about = "Capture mempool fee economics per block")]
struct Args {
    /// Node RPC endpoints, in failover order. Repeatable.
    #[arg(
        long = "rpc-url",
        env = "BLOCKSCOPE_RPC_URLS",
        value_delimiter = ',',
        required = true
    )]
    rpc_urls: Vec<Url>,

    /// Dataset output path.
    #[arg(long, env = "BLOCKSCOPE_OUTPUT", default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Seconds an unseen mempool entry survives before eviction.
    #[arg(long, default_value_t = DEFAULT_MEMPOOL_TTL_SECS)]
    mempool_ttl_secs: u64,

    /// Minimum capture rate (percent) required to persist a block.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_THRESHOLD)]
    capture_threshold: f64,

    /// Milliseconds between capture ticks.
    #[arg(long, default_value_t = DEFAULT_TICK_INTERVAL_MS)]
    tick_interval_ms: u64,

    /// Milliseconds between sequential endpoint retries.
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS)]
    retry_delay_ms: u64,
}

impl Args {
    fn into_config(self) -> ObserverConfig {
        let mut config = ObserverConfig::new(self.rpc_urls);
        config.output = self.output;
        config.mempool_ttl = Duration::from_secs(self.mempool_ttl_secs);
        config.capture_threshold = self.capture_threshold;
        config.tick_interval = Duration::from_millis(self.tick_interval_ms);
        config.retry_delay = Duration::from_millis(self.retry_delay_ms);
        config
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();

    let config = Args::parse().into_config();
    config.validate()?;

    let clients: Vec<Arc<dyn NodeClient>> = config
        .endpoints
        .iter()
        .map(|url| Arc::new(HttpNodeClient::new(url.clone())) as Arc<dyn NodeClient>)
        .collect();
    let pool = EndpointPool::new(clients, config.retry_delay);
    let writer = DatasetWriter::new(&config.output);

    info!(
        endpoints = config.endpoints.len(),
        output = %config.output.display(),
        threshold = config.capture_threshold,
        "starting capture loop"
    );

    // Capture begins with the block after the current head; blocks already
    // produced have no usable mempool history.
    let starting_height = match pool.block_number().await {
        Ok(height) => height,
        Err(err) => {
            warn!(%err, "could not determine chain height at startup, starting from 0");
            0
        }
    };

    Orchestrator::new(config, pool, writer, starting_height)
        .run()
        .await?;
    Ok(())
}
