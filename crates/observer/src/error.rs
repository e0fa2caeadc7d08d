use crate::dataset::DatasetError;
use crate::pool::PoolError;
use thiserror::Error;

/// Failure of a single capture tick.
///
/// Pool failures are transient: the orchestrator logs them and proceeds to
/// the next tick. Dataset failures are fatal: durable storage can no longer
/// be trusted and the process must stop with a non-zero status.
#[derive(Debug, Error)]
pub enum TickError {
    /// Every endpoint failed a one-shot query.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The dataset replace failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl TickError {
    /// Whether this failure must terminate the orchestrator.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Dataset(_))
    }
}
