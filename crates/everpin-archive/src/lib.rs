//! # everpin Archive
//!
//! Commitment index and challenge/slash protocol for the everpin archival
//! network.
//!
//! ## Overview
//!
//! Once a piece of content-addressed data falls out of its canonical
//! availability window, bonded operators advertise that they keep it by
//! committing to its content identifier. Any party may dispute such a
//! commitment by escrowing a fixed bond; an external verdict source decides
//! whether the operator still produces the data, and the loser pays. A lying
//! operator forfeits a slice of its stake to the challenger, while a
//! frivolous challenger forfeits its bond to the operator. A challenge left
//! unanswered past its deadline counts as a loss for the operator.
//!
//! ## Components
//!
//! - [`CommitmentIndex`]: append-only map from content identifiers to the
//!   operators claiming to store them
//! - [`ChallengeManager`]: the open → resolved dispute state machine,
//!   including bond custody and slashing arithmetic
//! - [`VerdictSource`]: pluggable seam for the external authority producing
//!   possession verdicts
//! - [`ArchiveCoordinator`]: composes the above with the stake ledger and
//!   exposes the public operation and read surface
//!
//! Stake accounting itself lives in the `everpin-ledger` crate.

pub mod challenge;
pub mod commitments;
pub mod coordinator;
pub mod error;
pub mod types;
pub mod verdict;

pub use challenge::{ChallengeManager, ChallengeStats};
pub use commitments::{CommitmentIndex, IndexStats};
pub use coordinator::{ArchiveCoordinator, ArchiveStats};
pub use error::{ArchiveError, Result};
pub use types::{
    ArchiveConfig, Challenge, ChallengeId, ChallengeOutcome, ContentId, OperatorProfile,
};
pub use verdict::{StaticVerdict, VerdictSource};
