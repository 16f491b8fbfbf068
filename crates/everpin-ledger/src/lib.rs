//! # everpin Ledger
//!
//! Stake ledger and proportional reward accumulator for the everpin
//! archival network.
//!
//! Operators bond stake to join the active archiver set, earn a
//! stake-proportional share of externally funded rewards through a lazy
//! per-unit accumulator, and put that stake at risk of slashing when a
//! possession challenge goes against them.
//!
//! ## Accounting invariants
//!
//! - `total_stake` always equals the sum of every operator's bonded stake.
//! - The reward accumulator never decreases; rounding dust stays in the pool,
//!   so aggregate payouts never exceed aggregate funding.
//! - Pending rewards are settled before every stake mutation.

pub mod active_set;
pub mod error;
mod rewards;
pub mod stake;
pub mod types;

pub use active_set::ActiveSet;
pub use error::{LedgerError, Result};
pub use stake::{
    LedgerConfig, LedgerStats, OperatorRecord, SlashReceipt, StakeLedger, WithdrawReceipt,
};
pub use types::{AccountId, PinAmount, REWARD_SCALE};
