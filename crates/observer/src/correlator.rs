use crate::client::BlockData;
use crate::dataset::DatasetWriter;
use crate::error::TickError;
use crate::mempool::MempoolTracker;
use crate::pool::EndpointPool;
use alloy_primitives::B256;
use blockscope_fees::{committed_fee_wei, paid_fee_wei, BlockRecord, EtherAmount, FeeEntry, Payment};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Terminal outcome of one correlation pass.
///
/// The pass walks `Idle -> BlockDetected -> Fetched -> Correlated ->
/// (Persisted | Skipped) -> Idle`; the two terminal states both advance the
/// processed-height marker so a block is never reprocessed.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Chain height unchanged; nothing to do.
    NoNewBlock,
    /// The block cleared the capture-rate gate and its record was merged.
    Persisted {
        /// Height of the captured block.
        height: u64,
        /// Share of the block's transactions seen in the local mempool.
        capture_rate: f64,
        /// Number of block transactions that came from the local mempool.
        confirmed: usize,
    },
    /// The local mempool view was too incomplete to trust; economics were
    /// discarded but confirmed hashes were still removed and the height
    /// marker advanced.
    Skipped {
        /// Height of the skipped block.
        height: u64,
        /// Capture rate that failed the gate.
        capture_rate: f64,
    },
}

/// Detects new blocks, gates them on capture rate and builds their records.
#[derive(Debug)]
pub struct BlockCorrelator {
    capture_threshold: f64,
    last_processed: u64,
}

impl BlockCorrelator {
    /// Correlator starting after `last_processed`; blocks at or below that
    /// height are considered already handled.
    pub const fn new(capture_threshold: f64, last_processed: u64) -> Self {
        Self {
            capture_threshold,
            last_processed,
        }
    }

    /// Height of the most recently processed block.
    pub const fn last_processed(&self) -> u64 {
        self.last_processed
    }

    /// Run one correlation pass against the current chain head.
    pub async fn process(
        &mut self,
        pool: &EndpointPool,
        mempool: &mut MempoolTracker,
        writer: &DatasetWriter,
    ) -> Result<TickOutcome, TickError> {
        let height = pool.block_number().await?;
        if height <= self.last_processed {
            return Ok(TickOutcome::NoNewBlock);
        }

        let block = pool.block_by_number(height).await?;
        let block_hashes: HashSet<B256> = block.transactions.iter().map(|tx| tx.hash).collect();
        let mempool_hashes = mempool.hashes();
        let confirmed: Vec<B256> = block_hashes
            .intersection(&mempool_hashes)
            .copied()
            .collect();
        let capture_rate = if block_hashes.is_empty() {
            0.0
        } else {
            confirmed.len() as f64 * 100.0 / block_hashes.len() as f64
        };
        debug!(
            height,
            mempool = mempool.len(),
            block_txs = block_hashes.len(),
            confirmed = confirmed.len(),
            capture_rate,
            "correlated block against mempool view"
        );

        let persist = !block_hashes.is_empty() && capture_rate >= self.capture_threshold;
        let outcome = if persist {
            let record = build_record(pool, &block, &block_hashes, mempool).await;
            writer.merge(height, &record)?;
            TickOutcome::Persisted {
                height,
                capture_rate,
                confirmed: confirmed.len(),
            }
        } else {
            TickOutcome::Skipped {
                height,
                capture_rate,
            }
        };

        // Confirmed hashes leave the mempool and the height marker advances
        // on both paths, persisted or not.
        mempool.remove_confirmed(confirmed.iter());
        self.last_processed = height;
        Ok(outcome)
    }
}

/// Assemble the block's record: every confirmed transaction's committed and
/// paid fees, plus an unconfirmed entry for each still-pending mempool
/// transaction. Per-transaction failures are isolated: a missing receipt or
/// corrupt fee terms drop that transaction, never the block.
async fn build_record(
    pool: &EndpointPool,
    block: &BlockData,
    block_hashes: &HashSet<B256>,
    mempool: &MempoolTracker,
) -> BlockRecord {
    let base_fee = block.base_fee_per_gas;
    let mut transactions = BTreeMap::new();
    let mut total_priority_fee: u128 = 0;

    for tx in &block.transactions {
        let receipt = match pool.transaction_receipt(tx.hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(tx = %tx.hash, %err, "receipt unavailable, skipping transaction");
                continue;
            }
        };
        let paid = match paid_fee_wei(&tx.fee_terms, base_fee, receipt.gas_used) {
            Ok(paid) => paid,
            Err(err) => {
                warn!(tx = %tx.hash, %err, "malformed fee terms, skipping transaction");
                continue;
            }
        };
        total_priority_fee = total_priority_fee.saturating_add(paid);
        transactions.insert(
            tx.hash,
            FeeEntry {
                fee: EtherAmount::from_wei(committed_fee_wei(&tx.fee_terms, tx.gas_limit)),
                payment: Payment::Settled(EtherAmount::from_wei(paid)),
            },
        );
    }

    for (hash, tracked) in mempool.iter() {
        if block_hashes.contains(hash) {
            continue;
        }
        transactions.insert(
            *hash,
            FeeEntry {
                fee: EtherAmount::from_wei(committed_fee_wei(
                    &tracked.tx.fee_terms,
                    tracked.tx.gas_limit,
                )),
                payment: Payment::Unconfirmed,
            },
        );
    }

    BlockRecord {
        transactions,
        total_priority_fee: EtherAmount::from_wei(total_priority_fee),
    }
}
