use crate::amount::EtherAmount;
use alloy_primitives::B256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// JSON sentinel marking a transaction that was observed in the mempool but
/// never confirmed in the correlated block.
pub const UNCONFIRMED_SENTINEL: i64 = -1;

/// Fee terms a transaction was submitted with, in wei per gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeTerms {
    /// Pre-1559 transaction carrying a single gas price.
    Legacy {
        /// Offered price per gas unit.
        gas_price: u128,
    },
    /// EIP-1559 transaction with a tip cap and an overall fee cap.
    Eip1559 {
        /// Upper bound on the total fee per gas unit.
        max_fee_per_gas: u128,
        /// Upper bound on the priority fee per gas unit.
        max_priority_fee_per_gas: u128,
    },
}

impl FeeTerms {
    /// The highest per-gas price the submitter committed to: the gas price
    /// for legacy transactions, the fee cap for 1559 ones.
    pub const fn price_ceiling(&self) -> u128 {
        match *self {
            Self::Legacy { gas_price } => gas_price,
            Self::Eip1559 { max_fee_per_gas, .. } => max_fee_per_gas,
        }
    }
}

/// What a confirmed transaction actually paid, or the marker that it was
/// never confirmed. Serializes to an ether string or the numeric `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payment {
    /// Priority fee paid to the producer, in wei.
    Settled(EtherAmount),
    /// Seen in the mempool, absent from the correlated block.
    Unconfirmed,
}

impl Serialize for Payment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Settled(amount) => amount.serialize(serializer),
            Self::Unconfirmed => serializer.serialize_i64(UNCONFIRMED_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for Payment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PaymentVisitor;

        impl<'de> de::Visitor<'de> for PaymentVisitor {
            type Value = Payment;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an ether decimal string or the sentinel -1")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                crate::amount::parse_ether(v)
                    .map(|wei| Payment::Settled(EtherAmount::from_wei(wei)))
                    .map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                if v == UNCONFIRMED_SENTINEL {
                    Ok(Payment::Unconfirmed)
                } else {
                    Err(E::invalid_value(de::Unexpected::Signed(v), &self))
                }
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Err(E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }
        }

        deserializer.deserialize_any(PaymentVisitor)
    }
}

/// Fee economics of a single transaction within a captured block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEntry {
    /// Maximum fee the submitter committed to (price ceiling x gas limit).
    pub fee: EtherAmount,
    /// Priority fee actually paid, or the unconfirmed sentinel.
    pub payment: Payment,
}

/// Per-block dataset record: every correlated transaction plus the
/// aggregate producer reward. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Transaction hash to fee entry, in deterministic hash order.
    pub transactions: BTreeMap<B256, FeeEntry>,
    /// Sum of priority fees paid by the block's confirmed transactions.
    pub total_priority_fee: EtherAmount,
}

/// The on-disk dataset: block number to record, ascending.
pub type Dataset = BTreeMap<u64, BlockRecord>;
