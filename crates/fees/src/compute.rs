use crate::types::FeeTerms;
use thiserror::Error;

/// A transaction whose fee terms cannot yield a valid priority fee.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeeError {
    /// The fee cap does not cover the block's base fee; such a transaction
    /// cannot have been validly included and its terms are treated as
    /// corrupt rather than priced negatively.
    #[error("fee cap {max_fee_per_gas} below base fee {base_fee_per_gas}")]
    FeeCapBelowBaseFee {
        /// Fee cap carried by the transaction.
        max_fee_per_gas: u128,
        /// Base fee of the correlated block.
        base_fee_per_gas: u128,
    },
}

/// Effective priority fee per gas unit under the given base fee.
///
/// Legacy terms pay `max(0, gas_price - base_fee)`; 1559 terms pay the tip
/// cap bounded by the fee cap's headroom over the base fee.
pub fn priority_fee_per_gas(terms: &FeeTerms, base_fee_per_gas: u128) -> Result<u128, FeeError> {
    match *terms {
        FeeTerms::Legacy { gas_price } => Ok(gas_price.saturating_sub(base_fee_per_gas)),
        FeeTerms::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            let headroom = max_fee_per_gas
                .checked_sub(base_fee_per_gas)
                .ok_or(FeeError::FeeCapBelowBaseFee {
                    max_fee_per_gas,
                    base_fee_per_gas,
                })?;
            Ok(max_priority_fee_per_gas.min(headroom))
        }
    }
}

/// Maximum fee the submitter was willing to pay: price ceiling times the
/// gas limit (not gas used). This is the figure reported even for
/// transactions that never confirmed.
#[inline]
pub fn committed_fee_wei(terms: &FeeTerms, gas_limit: u64) -> u128 {
    terms.price_ceiling().saturating_mul(gas_limit as u128)
}

/// Priority fee actually paid by a confirmed transaction: effective
/// priority fee per gas times the gas its receipt reports as used.
pub fn paid_fee_wei(
    terms: &FeeTerms,
    base_fee_per_gas: u128,
    gas_used: u64,
) -> Result<u128, FeeError> {
    Ok(priority_fee_per_gas(terms, base_fee_per_gas)?.saturating_mul(gas_used as u128))
}
