use crate::config::ObserverConfig;
use crate::correlator::{BlockCorrelator, TickOutcome};
use crate::dataset::DatasetWriter;
use crate::error::TickError;
use crate::mempool::MempoolTracker;
use crate::pool::EndpointPool;
use chrono::Utc;
use tracing::{debug, error, info, warn};

/// Drives the capture loop: refresh the mempool view, evict stale entries,
/// correlate the chain head, sleep, repeat.
#[derive(Debug)]
pub struct Orchestrator {
    config: ObserverConfig,
    pool: EndpointPool,
    mempool: MempoolTracker,
    correlator: BlockCorrelator,
    writer: DatasetWriter,
}

impl Orchestrator {
    /// Assemble the loop. `starting_height` marks the last block considered
    /// already processed; capture begins with the next one.
    pub fn new(
        config: ObserverConfig,
        pool: EndpointPool,
        writer: DatasetWriter,
        starting_height: u64,
    ) -> Self {
        let correlator = BlockCorrelator::new(config.capture_threshold, starting_height);
        Self {
            config,
            pool,
            mempool: MempoolTracker::new(),
            correlator,
            writer,
        }
    }

    /// Run until a fatal storage failure. Transient tick failures are
    /// logged and the loop proceeds; shutdown is external.
    pub async fn run(mut self) -> Result<(), TickError> {
        loop {
            match self.tick().await {
                Ok(TickOutcome::Persisted {
                    height,
                    capture_rate,
                    confirmed,
                }) => {
                    info!(height, capture_rate, confirmed, "block captured");
                }
                Ok(TickOutcome::Skipped {
                    height,
                    capture_rate,
                }) => {
                    info!(
                        height,
                        capture_rate,
                        threshold = self.config.capture_threshold,
                        "block below capture threshold, economics discarded"
                    );
                }
                Ok(TickOutcome::NoNewBlock) => {}
                Err(err) if err.is_fatal() => {
                    error!(%err, "fatal dataset failure, stopping capture loop");
                    return Err(err);
                }
                Err(err) => {
                    warn!(%err, "tick failed, continuing");
                }
            }
            tokio::time::sleep(self.config.tick_interval).await;
        }
    }

    /// One capture tick: refresh, evict, correlate.
    pub async fn tick(&mut self) -> Result<TickOutcome, TickError> {
        let now = Utc::now();

        match self.pool.rotating_pending().await {
            Ok((observations, source)) => {
                debug!(count = observations.len(), source, "mempool view refreshed");
                self.mempool.refresh(observations, &source, now);
            }
            Err(err) => warn!(%err, "pending refresh failed for this cycle"),
        }

        let evicted = self.mempool.evict_expired(self.config.mempool_ttl, now);
        if evicted > 0 {
            debug!(evicted, remaining = self.mempool.len(), "expired mempool entries removed");
        }

        self.correlator
            .process(&self.pool, &mut self.mempool, &self.writer)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NodeClient;
    use crate::test_utils::{pending_legacy, MockNodeClient};
    use alloy_primitives::b256;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use url::Url;

    #[tokio::test]
    async fn tick_refreshes_then_correlates() {
        let hash = b256!("00000000000000000000000000000000000000000000000000000000000000aa");
        let client = MockNodeClient::healthy("a")
            .with_height(101)
            .with_pending(vec![pending_legacy(hash, 15, 1_000)])
            .with_block(101, 10, vec![pending_legacy(hash, 15, 1_000)])
            .with_receipt(hash, 800);
        let pool = EndpointPool::new(
            vec![Arc::new(client) as Arc<dyn NodeClient>],
            Duration::from_millis(0),
        );
        let dir = tempdir().unwrap();
        let config = ObserverConfig::new(vec![Url::parse("http://localhost:8545").unwrap()]);
        let writer = DatasetWriter::new(dir.path().join("dataset.json"));
        let mut orchestrator = Orchestrator::new(config, pool, writer, 100);

        // The pending refresh and the correlation happen within one tick:
        // the mempool view is populated before the intersection runs.
        let outcome = orchestrator.tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Persisted {
                height: 101,
                capture_rate: 100.0,
                confirmed: 1,
            }
        );
        // The confirmed transaction left the mempool in the same tick.
        assert!(orchestrator.mempool.is_empty());
    }

    #[tokio::test]
    async fn transient_tick_failure_is_not_fatal() {
        let client = MockNodeClient::failing("a");
        let pool = EndpointPool::new(
            vec![Arc::new(client) as Arc<dyn NodeClient>],
            Duration::from_millis(0),
        );
        let dir = tempdir().unwrap();
        let config = ObserverConfig::new(vec![Url::parse("http://localhost:8545").unwrap()]);
        let writer = DatasetWriter::new(dir.path().join("dataset.json"));
        let mut orchestrator = Orchestrator::new(config, pool, writer, 100);

        let err = orchestrator.tick().await.unwrap_err();
        assert!(!err.is_fatal());
    }
}
