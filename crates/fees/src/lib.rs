//! Fee economics for captured blocks.
//!
//! This crate holds the pure side of the capture pipeline: wei arithmetic
//! over transaction fee terms, the canonical ether decimal-string encoding,
//! and the record types that make up the persisted dataset.

pub mod amount;
pub mod compute;
pub mod types;

pub use amount::{format_ether, parse_ether, AmountError, EtherAmount, WEI_PER_ETHER};
pub use compute::{committed_fee_wei, paid_fee_wei, priority_fee_per_gas, FeeError};
pub use types::{BlockRecord, Dataset, FeeEntry, FeeTerms, Payment};
