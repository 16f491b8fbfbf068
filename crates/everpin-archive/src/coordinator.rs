//! Archive Coordinator
//!
//! Orchestrates the archival incentive lifecycle:
//! 1. Operator registration and stake management
//! 2. Storage commitments against content identifiers
//! 3. Reward pool funding and claims
//! 4. Possession challenges, verdicts, and slashing

use crate::challenge::{ChallengeManager, ChallengeStats};
use crate::commitments::{CommitmentIndex, IndexStats};
use crate::error::{ArchiveError, Result};
use crate::types::{ArchiveConfig, Challenge, ChallengeId, ChallengeOutcome, ContentId, OperatorProfile};
use crate::verdict::VerdictSource;
use everpin_ledger::{
    AccountId, LedgerConfig, LedgerError, LedgerStats, OperatorRecord, PinAmount, StakeLedger,
    WithdrawReceipt,
};
use std::sync::Arc;

/// Archive-wide statistics.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveStats {
    pub ledger: LedgerStats,
    pub index: IndexStats,
    pub challenges: ChallengeStats,
}

/// Central coordinator for the archival incentive system.
///
/// Owns the stake ledger, the commitment index, and the challenge manager,
/// and supplies wall-clock time to the deadline-sensitive operations.
pub struct ArchiveCoordinator {
    config: ArchiveConfig,
    ledger: Arc<StakeLedger>,
    index: Arc<CommitmentIndex>,
    challenges: Arc<ChallengeManager>,
}

impl ArchiveCoordinator {
    pub fn new(
        config: ArchiveConfig,
        ledger_config: LedgerConfig,
        verdicts: Arc<dyn VerdictSource>,
    ) -> Self {
        let ledger = Arc::new(StakeLedger::new(ledger_config));
        let index = Arc::new(CommitmentIndex::new(config.clone(), ledger.clone()));
        let challenges = Arc::new(ChallengeManager::new(config.clone(), ledger.clone(), verdicts));
        Self {
            config,
            ledger,
            index,
            challenges,
        }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Direct access to the stake ledger, for funders and external readers.
    pub fn ledger(&self) -> &Arc<StakeLedger> {
        &self.ledger
    }

    // ========== Stake operations ==========

    pub async fn register_operator(
        &self,
        operator: AccountId,
        endpoint: String,
        initial_stake: PinAmount,
    ) -> Result<()> {
        Ok(self.ledger.register(operator, endpoint, initial_stake).await?)
    }

    pub async fn add_stake(&self, operator: AccountId, amount: PinAmount) -> Result<PinAmount> {
        Ok(self.ledger.add_stake(operator, amount).await?)
    }

    pub async fn withdraw_stake(
        &self,
        operator: AccountId,
        amount: PinAmount,
    ) -> Result<WithdrawReceipt> {
        Ok(self.ledger.withdraw_stake(operator, amount).await?)
    }

    pub async fn deactivate(&self, operator: AccountId) -> Result<()> {
        Ok(self.ledger.deactivate(operator).await?)
    }

    // ========== Reward operations ==========

    /// Credit the shared reward pool. Any actor may fund; unsolicited value
    /// transfers addressed to the ledger are credited the same way.
    pub async fn fund_pool(&self, amount: PinAmount) -> Result<()> {
        Ok(self.ledger.fund_pool(amount).await?)
    }

    pub async fn claim_rewards(&self, operator: AccountId) -> Result<PinAmount> {
        Ok(self.ledger.claim_rewards(operator).await?)
    }

    pub async fn pending_rewards(&self, operator: &AccountId) -> Result<PinAmount> {
        Ok(self.ledger.pending_rewards(operator).await?)
    }

    // ========== Commitment operations ==========

    pub async fn commit(&self, operator: AccountId, content_id: ContentId) -> Result<()> {
        self.index.commit(operator, content_id).await
    }

    pub async fn commit_batch(
        &self,
        operator: AccountId,
        content_ids: &[ContentId],
    ) -> Result<usize> {
        self.index.commit_batch(operator, content_ids).await
    }

    // ========== Challenge operations ==========

    pub async fn open_challenge(
        &self,
        challenger: AccountId,
        operator: AccountId,
        content_id: ContentId,
        bond: PinAmount,
    ) -> Result<ChallengeId> {
        let now = chrono::Utc::now().timestamp();
        self.challenges
            .open_challenge(challenger, operator, content_id, bond, now)
            .await
    }

    pub async fn resolve_challenge(&self, challenge_id: ChallengeId) -> Result<ChallengeOutcome> {
        self.challenges.resolve(challenge_id).await
    }

    pub async fn resolve_expired(&self, challenge_id: ChallengeId) -> Result<ChallengeOutcome> {
        let now = chrono::Utc::now().timestamp();
        self.challenges.resolve_expired(challenge_id, now).await
    }

    // ========== Read API ==========

    pub async fn active_archivers(&self) -> Vec<AccountId> {
        self.ledger.active_operators().await
    }

    pub async fn archivers_for(&self, content_id: &ContentId) -> Vec<AccountId> {
        self.index.archivers_for(content_id).await
    }

    pub async fn operator_record(&self, operator: &AccountId) -> Option<OperatorRecord> {
        self.ledger.operator(operator).await
    }

    pub async fn operator_profile(&self, operator: &AccountId) -> Result<OperatorProfile> {
        let record = self
            .ledger
            .operator(operator)
            .await
            .ok_or(ArchiveError::Ledger(LedgerError::NotRegistered(*operator)))?;
        Ok(OperatorProfile {
            operator: *operator,
            stake: record.stake,
            commitment_count: record.commitment_count,
            success_rate: record.success_rate(),
        })
    }

    pub async fn challenge(&self, challenge_id: &ChallengeId) -> Option<Challenge> {
        self.challenges.challenge(challenge_id).await
    }

    /// Open challenges whose response deadline has already passed.
    pub async fn expired_challenges(&self) -> Vec<Challenge> {
        let now = chrono::Utc::now().timestamp();
        self.challenges.expired_challenges(now).await
    }

    pub async fn stats(&self) -> ArchiveStats {
        ArchiveStats {
            ledger: self.ledger.stats().await,
            index: self.index.stats().await,
            challenges: self.challenges.stats().await,
        }
    }
}
