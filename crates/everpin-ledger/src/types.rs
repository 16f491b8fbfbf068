use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PIN_DECIMALS: u32 = 9;
pub const PIN_BASE_UNIT: u64 = 1_000_000_000; // 10^9

/// Fixed-point precision of the per-stake reward accumulator.
pub const REWARD_SCALE: u128 = 1_000_000_000_000; // 10^12

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PinAmount(u64);

impl PinAmount {
    pub const ZERO: Self = Self(0);
    pub const MAX_SUPPLY: Self = Self(1_000_000_000 * PIN_BASE_UNIT); // 10^9 PIN

    pub fn from_pin(pin: f64) -> Self {
        Self((pin * PIN_BASE_UNIT as f64) as u64)
    }

    pub fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    pub fn to_pin(&self) -> f64 {
        self.0 as f64 / PIN_BASE_UNIT as f64
    }

    pub fn to_base_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0).min(Self::MAX_SUPPLY.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for PinAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9} PIN", self.to_pin())
    }
}

/// Opaque 32-byte account identity. Operators, challengers, and funders are
/// all addressed this way; the ledger never inspects the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim_start_matches("0x"))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| anyhow::anyhow!("Account id must be exactly 32 bytes"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}
