//! blockscope capture pipeline.
//!
//! Watches a chain's mempool through redundant node endpoints, correlates
//! newly produced blocks against the local view, and persists per-block fee
//! economics when the view was complete enough to serve as ground truth.

/// Node capability trait and the HTTP JSON-RPC implementation.
pub mod client;
/// Runtime configuration and validation.
pub mod config;
/// Block detection, capture-rate gating and record building.
pub mod correlator;
/// Crash-safe read-modify-write persistence of the dataset.
pub mod dataset;
/// Tick-level error taxonomy.
pub mod error;
/// Mempool state tracking with TTL eviction.
pub mod mempool;
/// Redundant endpoint pool with the two failover disciplines.
pub mod pool;
/// The capture loop.
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::{
    BlockData, HttpNodeClient, NodeClient, PendingTransaction, TransactionReceipt, TransportError,
};
pub use config::{ConfigError, ObserverConfig};
pub use correlator::{BlockCorrelator, TickOutcome};
pub use dataset::{DatasetError, DatasetWriter};
pub use error::TickError;
pub use mempool::{MempoolTracker, TrackedTransaction};
pub use orchestrator::Orchestrator;
pub use pool::{EndpointPool, PoolError};
