use crate::types::ChallengeId;
use everpin_ledger::{AccountId, LedgerError, PinAmount};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Operator not active: {0}")]
    NotActive(AccountId),

    #[error("Invalid challenge bond: expected {expected}, provided {provided}")]
    InvalidBond {
        expected: PinAmount,
        provided: PinAmount,
    },

    #[error("Challenge not found: {0}")]
    NotFound(ChallengeId),

    #[error("Challenge already resolved: {0}")]
    AlreadyResolved(ChallengeId),

    #[error("Challenge deadline not reached: deadline {deadline}, current {now}")]
    DeadlineNotReached { deadline: i64, now: i64 },

    #[error("Commitment batch too large: {len} exceeds maximum {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Verdict source failed: {0}")]
    VerdictFailed(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
