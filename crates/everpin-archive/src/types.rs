use everpin_ledger::{AccountId, PinAmount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque fixed-length content identifier minted by the external
/// content-addressing scheme. The archive never inspects its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId([u8; 32]);

impl ContentId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Unique challenge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeId([u8; 32]);

impl ChallengeId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// A possession dispute against one operator's commitment.
///
/// Lifecycle: open until resolved, then terminal forever. The challenger's
/// bond stays escrowed while the challenge is open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub challenger: AccountId,
    pub operator: AccountId,
    pub content_id: ContentId,
    pub bond: PinAmount,
    pub opened_at: i64,
    pub deadline: i64,
    pub resolved: bool,
    pub operator_won: bool,
}

impl Challenge {
    pub fn new(
        challenger: AccountId,
        operator: AccountId,
        content_id: ContentId,
        bond: PinAmount,
        opened_at: i64,
        deadline: i64,
    ) -> Self {
        let now_nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(opened_at * 1_000_000_000);
        let mut id_data = Vec::new();
        id_data.extend_from_slice(challenger.as_bytes());
        id_data.extend_from_slice(operator.as_bytes());
        id_data.extend_from_slice(content_id.as_bytes());
        id_data.extend_from_slice(&now_nanos.to_le_bytes());

        Self {
            id: ChallengeId(*blake3::hash(&id_data).as_bytes()),
            challenger,
            operator,
            content_id,
            bond,
            opened_at,
            deadline,
            resolved: false,
            operator_won: false,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.resolved
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.deadline
    }
}

/// Value flows of a resolution, reported to the caller for transfer. On an
/// operator win the payee is the operator and the payout is the forfeited
/// bond; on a loss the payee is the challenger and the payout is the bond
/// refund plus the slashed stake.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeOutcome {
    pub challenge_id: ChallengeId,
    pub operator_won: bool,
    pub payee: AccountId,
    pub payout: PinAmount,
    pub slashed: PinAmount,
    pub operator_deactivated: bool,
}

/// Public per-operator read model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorProfile {
    pub operator: AccountId,
    pub stake: PinAmount,
    pub commitment_count: u64,
    pub success_rate: u64,
}

/// Archive parameters, fixed at construction.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Exact bond a challenger must escrow. Kept small relative to the
    /// minimum stake so frivolous challenges are cheap to punish while
    /// legitimate ones stay affordable.
    pub challenge_bond: PinAmount,
    /// Seconds an operator has to answer a challenge.
    pub challenge_period_secs: i64,
    /// Percentage of the operator's stake forfeited on a lost challenge.
    pub slash_percent: u64,
    /// Maximum content identifiers per commit batch.
    pub max_batch_size: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            challenge_bond: PinAmount::from_pin(5.0),
            challenge_period_secs: 24 * 60 * 60,
            slash_percent: 10,
            max_batch_size: 32,
        }
    }
}
