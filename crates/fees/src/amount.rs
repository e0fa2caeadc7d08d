//! Canonical ether decimal encoding for wei amounts.
//!
//! Dataset values are written as base-10 ether strings with trailing zero
//! digits (and a then-dangling decimal point) stripped, never in exponent
//! form. `format_ether` and `parse_ether` are exact inverses on canonical
//! strings, which is what makes dataset merges byte-stable.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Wei per ether (10^18).
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Errors produced when decoding an ether decimal string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    /// The string was empty or contained non-decimal characters.
    #[error("invalid ether amount: {0:?}")]
    Invalid(String),
    /// More than 18 fractional digits cannot be represented in wei.
    #[error("ether amount has more than 18 fractional digits: {0:?}")]
    TooPrecise(String),
    /// The integral part overflows the wei representation.
    #[error("ether amount out of range: {0:?}")]
    OutOfRange(String),
}

/// Render a wei amount as a trimmed ether decimal string.
pub fn format_ether(wei: u128) -> String {
    let int = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return int.to_string();
    }
    let mut out = format!("{int}.{frac:018}");
    while out.ends_with('0') {
        out.pop();
    }
    out
}

/// Parse an ether decimal string back into wei. Accepts at most 18
/// fractional digits and no sign or exponent.
pub fn parse_ether(s: &str) -> Result<u128, AmountError> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountError::Invalid(s.to_string()));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(AmountError::Invalid(s.to_string()));
    }
    if frac_part.len() > 18 {
        return Err(AmountError::TooPrecise(s.to_string()));
    }
    let int: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| AmountError::OutOfRange(s.to_string()))?
    };
    let mut frac: u128 = if frac_part.is_empty() {
        0
    } else {
        frac_part
            .parse()
            .map_err(|_| AmountError::Invalid(s.to_string()))?
    };
    frac *= 10u128.pow(18 - frac_part.len() as u32);
    int.checked_mul(WEI_PER_ETHER)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| AmountError::OutOfRange(s.to_string()))
}

/// A monetary amount held in wei, serialized as a trimmed ether string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct EtherAmount(u128);

impl EtherAmount {
    /// Wrap a raw wei value.
    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    /// The raw wei value.
    pub const fn wei(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for EtherAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_ether(self.0))
    }
}

impl Serialize for EtherAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_ether(self.0))
    }
}

impl<'de> Deserialize<'de> for EtherAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_ether(&s).map(Self).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_ether_without_point() {
        assert_eq!(format_ether(0), "0");
        assert_eq!(format_ether(WEI_PER_ETHER), "1");
        assert_eq!(format_ether(42 * WEI_PER_ETHER), "42");
    }

    #[test]
    fn trims_trailing_zeros() {
        assert_eq!(format_ether(1_500_000_000_000_000_000), "1.5");
        assert_eq!(format_ether(15_000), "0.000000000000015");
        assert_eq!(format_ether(2_500), "0.0000000000000025");
        assert_eq!(format_ether(1), "0.000000000000000001");
    }

    #[test]
    fn parse_inverts_format() {
        for wei in [0u128, 1, 2_500, 15_000, WEI_PER_ETHER, 1_500_000_000_000_000_000, u128::MAX] {
            assert_eq!(parse_ether(&format_ether(wei)), Ok(wei));
        }
    }

    #[test]
    fn parse_pads_short_fractions() {
        assert_eq!(parse_ether("1.5"), Ok(1_500_000_000_000_000_000));
        assert_eq!(parse_ether(".5"), Ok(500_000_000_000_000_000));
        assert_eq!(parse_ether("3"), Ok(3 * WEI_PER_ETHER));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse_ether(""), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_ether("."), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_ether("-1"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_ether("1e5"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_ether("1.2.3"), Err(AmountError::Invalid(_))));
        assert!(matches!(
            parse_ether("0.0000000000000000001"),
            Err(AmountError::TooPrecise(_))
        ));
    }

    #[test]
    fn amount_serde_round_trip() {
        let amount = EtherAmount::from_wei(15_000);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"0.000000000000015\"");
        let back: EtherAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }
}
