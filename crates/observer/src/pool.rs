use crate::client::{BlockData, NodeClient, PendingTransaction, TransactionReceipt, TransportError};
use alloy_primitives::B256;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Failure of an entire endpoint pool pass.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every endpoint failed the one-shot query in order.
    #[error("all {attempts} endpoints failed, last error: {last}")]
    Exhausted {
        /// Number of endpoints tried.
        attempts: usize,
        /// Failure reported by the final endpoint.
        #[source]
        last: TransportError,
    },
    /// The rotating endpoint failed its cycle; no data this tick.
    #[error("endpoint {endpoint} failed this cycle: {source}")]
    CycleFailed {
        /// Endpoint that held the cursor for this cycle.
        endpoint: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// The pool was constructed without endpoints.
    #[error("endpoint pool is empty")]
    Empty,
}

/// Ordered pool of redundant node endpoints.
///
/// Two access disciplines coexist deliberately and must not be unified:
/// periodic mempool refreshes rotate across endpoints on every call so load
/// is spread and a recovered endpoint is retried on a fixed schedule, while
/// one-shot queries fail over in order because a single correct answer
/// matters more than load spreading.
#[derive(Debug)]
pub struct EndpointPool {
    clients: Vec<Arc<dyn NodeClient>>,
    cursor: AtomicUsize,
    retry_delay: Duration,
}

impl EndpointPool {
    /// Build a pool over an ordered endpoint list; the first entry is the
    /// primary for one-shot queries.
    pub fn new(clients: Vec<Arc<dyn NodeClient>>, retry_delay: Duration) -> Self {
        Self {
            clients,
            cursor: AtomicUsize::new(0),
            retry_delay,
        }
    }

    /// Number of endpoints in the pool.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the pool has no endpoints.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Rotate-always discipline: fetch pending transactions from the
    /// endpoint at the cursor, advancing the cursor whether or not the
    /// call succeeds. A failure yields no data for this cycle; there is
    /// no retry within the tick.
    pub async fn rotating_pending(
        &self,
    ) -> Result<(Vec<PendingTransaction>, String), PoolError> {
        if self.clients.is_empty() {
            return Err(PoolError::Empty);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        let client = &self.clients[index];
        let source = client.endpoint().to_string();
        match client.pending_transactions().await {
            Ok(observations) => Ok((observations, source)),
            Err(source_err) => Err(PoolError::CycleFailed {
                endpoint: source,
                source: source_err,
            }),
        }
    }

    /// Fail-over-on-error discipline: try endpoints in order starting at
    /// the primary, sleeping `retry_delay` after each failure, until one
    /// answers or the pool is exhausted.
    async fn with_failover<T, F, Fut>(&self, op: F) -> Result<T, PoolError>
    where
        F: Fn(Arc<dyn NodeClient>) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut last: Option<TransportError> = None;
        for client in &self.clients {
            if last.is_some() {
                tokio::time::sleep(self.retry_delay).await;
            }
            match op(Arc::clone(client)).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(endpoint = client.endpoint(), %err, "endpoint query failed, trying next");
                    last = Some(err);
                }
            }
        }
        match last {
            Some(last) => Err(PoolError::Exhausted {
                attempts: self.clients.len(),
                last,
            }),
            None => Err(PoolError::Empty),
        }
    }

    /// Current chain height, with failover.
    pub async fn block_number(&self) -> Result<u64, PoolError> {
        self.with_failover(|client| async move { client.block_number().await })
            .await
    }

    /// Full block at a height, with failover.
    pub async fn block_by_number(&self, number: u64) -> Result<BlockData, PoolError> {
        self.with_failover(move |client| async move { client.block_by_number(number).await })
            .await
    }

    /// Transaction receipt, with failover.
    pub async fn transaction_receipt(&self, hash: B256) -> Result<TransactionReceipt, PoolError> {
        self.with_failover(move |client| async move { client.transaction_receipt(hash).await })
            .await
    }
}
