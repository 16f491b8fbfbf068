use crate::types::{AccountId, PinAmount};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient stake: required {required}, provided {provided}")]
    InsufficientStake {
        required: PinAmount,
        provided: PinAmount,
    },

    #[error("Operator already registered: {0}")]
    AlreadyRegistered(AccountId),

    #[error("Operator not registered: {0}")]
    NotRegistered(AccountId),

    #[error("Operator not active: {0}")]
    NotActive(AccountId),

    #[error("Withdrawal exceeds stake: stake {stake}, requested {requested}")]
    ExceedsStake {
        stake: PinAmount,
        requested: PinAmount,
    },

    #[error("Remaining stake below minimum: remaining {remaining}, minimum {minimum}")]
    BelowMinimum {
        remaining: PinAmount,
        minimum: PinAmount,
    },

    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
