//! In-memory node client for exercising the pool and correlator.

use crate::client::{BlockData, NodeClient, PendingTransaction, TransactionReceipt, TransportError};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use blockscope_fees::FeeTerms;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A legacy-terms pending transaction for tests.
pub(crate) fn pending_legacy(hash: B256, gas_price: u128, gas_limit: u64) -> PendingTransaction {
    PendingTransaction {
        hash,
        from: Address::ZERO,
        fee_terms: FeeTerms::Legacy { gas_price },
        gas_limit,
    }
}

/// Scripted node endpoint: either fails every call or serves fixed data.
#[derive(Debug, Default)]
pub(crate) struct MockNodeClient {
    name: String,
    fail: bool,
    height: u64,
    pending: Vec<PendingTransaction>,
    block: Option<BlockData>,
    receipts: HashMap<B256, u64>,
    calls: AtomicUsize,
}

impl MockNodeClient {
    pub(crate) fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub(crate) fn with_pending(mut self, pending: Vec<PendingTransaction>) -> Self {
        self.pending = pending;
        self
    }

    pub(crate) fn with_block(
        mut self,
        number: u64,
        base_fee_per_gas: u128,
        transactions: Vec<PendingTransaction>,
    ) -> Self {
        self.block = Some(BlockData {
            number,
            base_fee_per_gas,
            transactions,
        });
        self
    }

    pub(crate) fn with_receipt(mut self, hash: B256, gas_used: u64) -> Self {
        self.receipts.insert(hash, gas_used);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn guard(&self) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            Err(TransportError::Rpc {
                code: -32000,
                message: "mock endpoint failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NodeClient for MockNodeClient {
    async fn pending_transactions(&self) -> Result<Vec<PendingTransaction>, TransportError> {
        self.guard()?;
        Ok(self.pending.clone())
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockData, TransportError> {
        self.guard()?;
        self.block
            .as_ref()
            .filter(|block| block.number == number)
            .cloned()
            .ok_or(TransportError::MissingResult)
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<TransactionReceipt, TransportError> {
        self.guard()?;
        self.receipts
            .get(&hash)
            .map(|&gas_used| TransactionReceipt { gas_used })
            .ok_or(TransportError::MissingResult)
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        self.guard()?;
        Ok(self.height)
    }

    fn endpoint(&self) -> &str {
        &self.name
    }
}
