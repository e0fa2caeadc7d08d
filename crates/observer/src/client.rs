use alloy_primitives::{Address, B256, U256, U64};
use async_trait::async_trait;
use blockscope_fees::FeeTerms;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// A transaction as observed in the pending pool or a block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Submitting account.
    pub from: Address,
    /// Offered fee terms.
    pub fee_terms: FeeTerms,
    /// Gas limit the submitter committed to.
    pub gas_limit: u64,
}

/// A block body with the fields the correlator needs.
#[derive(Debug, Clone)]
pub struct BlockData {
    /// Block height.
    pub number: u64,
    /// Protocol base fee per gas, wei. Zero on pre-1559 chains.
    pub base_fee_per_gas: u128,
    /// Full transaction objects included in the block.
    pub transactions: Vec<PendingTransaction>,
}

/// The slice of a transaction receipt the fee calculator consumes.
#[derive(Debug, Clone, Copy)]
pub struct TransactionReceipt {
    /// Gas actually consumed by the transaction.
    pub gas_used: u64,
}

/// A single endpoint/network failure. Always transient from the pool's
/// point of view; escalation happens in [`crate::pool`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request itself failed or returned a bad status.
    #[error("http transport failure: {0}")]
    Http(#[from] reqwest::Error),
    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// The node returned a null/absent result for a call that needs one.
    #[error("rpc response carried no result")]
    MissingResult,
}

/// Opaque node capability consumed by the pipeline. Every call may fail
/// with a transient [`TransportError`]; no other contract is assumed.
#[async_trait]
pub trait NodeClient: Send + Sync + std::fmt::Debug {
    /// Transactions currently pending in the node's view of the mempool.
    async fn pending_transactions(&self) -> Result<Vec<PendingTransaction>, TransportError>;

    /// Full block at the given height.
    async fn block_by_number(&self, number: u64) -> Result<BlockData, TransportError>;

    /// Receipt of a confirmed transaction.
    async fn transaction_receipt(&self, hash: B256)
        -> Result<TransactionReceipt, TransportError>;

    /// Current chain height.
    async fn block_number(&self) -> Result<u64, TransportError>;

    /// Endpoint label used as the observation source in logs and records.
    fn endpoint(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct RpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: B256,
    #[serde(default)]
    from: Option<Address>,
    gas: U256,
    #[serde(default)]
    gas_price: Option<U256>,
    #[serde(default)]
    max_fee_per_gas: Option<U256>,
    #[serde(default)]
    max_priority_fee_per_gas: Option<U256>,
}

impl RpcTransaction {
    /// Lift the wire shape into the domain type. Transactions carrying
    /// neither a gas price nor a fee cap are malformed and dropped here.
    fn into_pending(self, endpoint: &str) -> Option<PendingTransaction> {
        let fee_terms = match (self.max_fee_per_gas, self.gas_price) {
            (Some(max_fee), _) => FeeTerms::Eip1559 {
                max_fee_per_gas: max_fee.saturating_to(),
                max_priority_fee_per_gas: self
                    .max_priority_fee_per_gas
                    .unwrap_or_default()
                    .saturating_to(),
            },
            (None, Some(gas_price)) => FeeTerms::Legacy {
                gas_price: gas_price.saturating_to(),
            },
            (None, None) => {
                warn!(tx = %self.hash, endpoint, "transaction without fee terms, dropping");
                return None;
            }
        };
        Some(PendingTransaction {
            hash: self.hash,
            from: self.from.unwrap_or_default(),
            fee_terms,
            gas_limit: self.gas.saturating_to(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    #[serde(default)]
    number: Option<U64>,
    #[serde(default)]
    base_fee_per_gas: Option<U256>,
    #[serde(default)]
    transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    gas_used: U256,
}

/// JSON-RPC 2.0 client over HTTP for a single node endpoint.
#[derive(Debug, Clone)]
pub struct HttpNodeClient {
    http: reqwest::Client,
    url: Url,
    endpoint: String,
}

impl HttpNodeClient {
    /// Build a client for one endpoint URL.
    pub fn new(url: Url) -> Self {
        let endpoint = url.to_string();
        Self {
            http: reqwest::Client::new(),
            url,
            endpoint,
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, TransportError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse<T> = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(err) = response.error {
            return Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response.result.ok_or(TransportError::MissingResult)
    }

    fn block_from_rpc(&self, block: RpcBlock, fallback_number: u64) -> BlockData {
        BlockData {
            number: block
                .number
                .map_or(fallback_number, |n| n.saturating_to()),
            base_fee_per_gas: block.base_fee_per_gas.unwrap_or_default().saturating_to(),
            transactions: block
                .transactions
                .into_iter()
                .filter_map(|tx| tx.into_pending(&self.endpoint))
                .collect(),
        }
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn pending_transactions(&self) -> Result<Vec<PendingTransaction>, TransportError> {
        let block: RpcBlock = self
            .request("eth_getBlockByNumber", json!(["pending", true]))
            .await?;
        Ok(block
            .transactions
            .into_iter()
            .filter_map(|tx| tx.into_pending(&self.endpoint))
            .collect())
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockData, TransportError> {
        let block: RpcBlock = self
            .request(
                "eth_getBlockByNumber",
                json!([format!("0x{number:x}"), true]),
            )
            .await?;
        Ok(self.block_from_rpc(block, number))
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<TransactionReceipt, TransportError> {
        let receipt: RpcReceipt = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        Ok(TransactionReceipt {
            gas_used: receipt.gas_used.saturating_to(),
        })
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        let height: U64 = self.request("eth_blockNumber", json!([])).await?;
        Ok(height.saturating_to())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_transaction_prefers_1559_terms() {
        let raw: RpcTransaction = serde_json::from_value(json!({
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "from": "0x0000000000000000000000000000000000000001",
            "gas": "0x5208",
            "gasPrice": "0xf",
            "maxFeePerGas": "0x14",
            "maxPriorityFeePerGas": "0x3",
        }))
        .unwrap();
        let tx = raw.into_pending("test").unwrap();
        assert_eq!(
            tx.fee_terms,
            FeeTerms::Eip1559 {
                max_fee_per_gas: 20,
                max_priority_fee_per_gas: 3,
            }
        );
        assert_eq!(tx.gas_limit, 21_000);
    }

    #[test]
    fn rpc_transaction_falls_back_to_legacy() {
        let raw: RpcTransaction = serde_json::from_value(json!({
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000bb",
            "gas": "0x1f4",
            "gasPrice": "0x5",
        }))
        .unwrap();
        let tx = raw.into_pending("test").unwrap();
        assert_eq!(tx.fee_terms, FeeTerms::Legacy { gas_price: 5 });
    }

    #[test]
    fn rpc_transaction_without_terms_is_dropped() {
        let raw: RpcTransaction = serde_json::from_value(json!({
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000cc",
            "gas": "0x1f4",
        }))
        .unwrap();
        assert!(raw.into_pending("test").is_none());
    }
}
