use crate::error::{ArchiveError, Result};
use crate::types::{ArchiveConfig, Challenge, ChallengeId, ChallengeOutcome, ContentId};
use crate::verdict::VerdictSource;
use everpin_ledger::{AccountId, PinAmount, StakeLedger};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Challenge statistics.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeStats {
    pub total_challenges: usize,
    pub open_challenges: usize,
    pub operator_wins: usize,
    pub operator_losses: usize,
}

/// Possession challenge lifecycle: open, resolve via the verdict source, or
/// force-resolve after the response deadline. A resolved challenge is
/// terminal; its outcome never changes.
pub struct ChallengeManager {
    config: ArchiveConfig,
    ledger: Arc<StakeLedger>,
    verdicts: Arc<dyn VerdictSource>,
    challenges: Arc<RwLock<HashMap<ChallengeId, Challenge>>>,
    // Metrics counters - updated externally by incrementing directly
    pub challenges_opened: Option<Arc<prometheus::IntCounter>>,
    pub challenges_resolved: Option<Arc<prometheus::IntCounter>>,
    pub operators_slashed: Option<Arc<prometheus::IntCounter>>,
}

impl ChallengeManager {
    pub fn new(
        config: ArchiveConfig,
        ledger: Arc<StakeLedger>,
        verdicts: Arc<dyn VerdictSource>,
    ) -> Self {
        Self {
            config,
            ledger,
            verdicts,
            challenges: Arc::new(RwLock::new(HashMap::new())),
            challenges_opened: None,
            challenges_resolved: None,
            operators_slashed: None,
        }
    }

    /// Set metrics for challenge tracking
    pub fn set_metrics(
        &mut self,
        challenges_opened: Arc<prometheus::IntCounter>,
        challenges_resolved: Arc<prometheus::IntCounter>,
        operators_slashed: Arc<prometheus::IntCounter>,
    ) {
        self.challenges_opened = Some(challenges_opened);
        self.challenges_resolved = Some(challenges_resolved);
        self.operators_slashed = Some(operators_slashed);
    }

    /// Open a possession challenge against an active operator's commitment.
    /// The bond must match the configured amount exactly and stays escrowed
    /// until resolution.
    pub async fn open_challenge(
        &self,
        challenger: AccountId,
        operator: AccountId,
        content_id: ContentId,
        bond: PinAmount,
        now: i64,
    ) -> Result<ChallengeId> {
        if bond != self.config.challenge_bond {
            return Err(ArchiveError::InvalidBond {
                expected: self.config.challenge_bond,
                provided: bond,
            });
        }
        if !self.ledger.is_active(&operator).await {
            return Err(ArchiveError::NotActive(operator));
        }

        let challenge = Challenge::new(
            challenger,
            operator,
            content_id,
            bond,
            now,
            now + self.config.challenge_period_secs,
        );
        let id = challenge.id;
        self.challenges.write().await.insert(id, challenge);

        if let Some(ref counter) = self.challenges_opened {
            counter.inc();
        }

        info!(
            challenge = %id,
            challenger = %challenger,
            operator = %operator,
            content = %content_id,
            bond = %bond,
            deadline = now + self.config.challenge_period_secs,
            "🎯 Challenge opened"
        );
        Ok(id)
    }

    /// Resolve a challenge with the verdict source's answer.
    pub async fn resolve(&self, challenge_id: ChallengeId) -> Result<ChallengeOutcome> {
        let challenge = {
            let challenges = self.challenges.read().await;
            challenges
                .get(&challenge_id)
                .cloned()
                .ok_or(ArchiveError::NotFound(challenge_id))?
        };
        if challenge.resolved {
            return Err(ArchiveError::AlreadyResolved(challenge_id));
        }

        let operator_has_data = self
            .verdicts
            .verdict(&challenge)
            .await
            .map_err(|e| ArchiveError::VerdictFailed(e.to_string()))?;

        self.apply_resolution(challenge_id, operator_has_data).await
    }

    /// Force-resolve a challenge whose response deadline has passed.
    /// Callable by anyone; silence is treated as failure to prove
    /// possession, so the operator is slashed exactly as on a losing
    /// verdict.
    pub async fn resolve_expired(
        &self,
        challenge_id: ChallengeId,
        now: i64,
    ) -> Result<ChallengeOutcome> {
        {
            let challenges = self.challenges.read().await;
            let challenge = challenges
                .get(&challenge_id)
                .ok_or(ArchiveError::NotFound(challenge_id))?;
            if challenge.resolved {
                return Err(ArchiveError::AlreadyResolved(challenge_id));
            }
            if !challenge.is_expired(now) {
                return Err(ArchiveError::DeadlineNotReached {
                    deadline: challenge.deadline,
                    now,
                });
            }
        }

        warn!(
            challenge = %challenge_id,
            "⌛ Challenge expired unanswered; resolving against the operator"
        );
        self.apply_resolution(challenge_id, false).await
    }

    /// Terminal transition shared by verdict and expiry resolution. Holds
    /// the challenge table lock for the whole transition so a challenge can
    /// never resolve twice.
    async fn apply_resolution(
        &self,
        challenge_id: ChallengeId,
        operator_has_data: bool,
    ) -> Result<ChallengeOutcome> {
        let mut challenges = self.challenges.write().await;
        let challenge = challenges
            .get_mut(&challenge_id)
            .ok_or(ArchiveError::NotFound(challenge_id))?;
        if challenge.resolved {
            return Err(ArchiveError::AlreadyResolved(challenge_id));
        }

        let outcome = if operator_has_data {
            self.ledger
                .record_challenge_result(&challenge.operator, true)
                .await?;
            ChallengeOutcome {
                challenge_id,
                operator_won: true,
                payee: challenge.operator,
                payout: challenge.bond,
                slashed: PinAmount::ZERO,
                operator_deactivated: false,
            }
        } else {
            let receipt = self
                .ledger
                .slash(challenge.operator, self.config.slash_percent)
                .await?;
            self.ledger
                .record_challenge_result(&challenge.operator, false)
                .await?;

            if let Some(ref counter) = self.operators_slashed {
                counter.inc();
            }

            let payout = receipt
                .slashed
                .checked_add(challenge.bond)
                .ok_or(everpin_ledger::LedgerError::ArithmeticOverflow("challenge payout"))?;
            ChallengeOutcome {
                challenge_id,
                operator_won: false,
                payee: challenge.challenger,
                payout,
                slashed: receipt.slashed,
                operator_deactivated: receipt.deactivated,
            }
        };

        challenge.resolved = true;
        challenge.operator_won = operator_has_data;

        if let Some(ref counter) = self.challenges_resolved {
            counter.inc();
        }

        let emoji = if operator_has_data { "🛡️" } else { "⚔️" };
        info!(
            challenge = %challenge_id,
            operator = %challenge.operator,
            operator_won = operator_has_data,
            payee = %outcome.payee,
            payout = %outcome.payout,
            slashed = %outcome.slashed,
            "{} Challenge resolved",
            emoji
        );
        Ok(outcome)
    }

    pub async fn challenge(&self, challenge_id: &ChallengeId) -> Option<Challenge> {
        self.challenges.read().await.get(challenge_id).cloned()
    }

    /// Open challenges whose deadline has passed; candidates for
    /// [`ChallengeManager::resolve_expired`].
    pub async fn expired_challenges(&self, now: i64) -> Vec<Challenge> {
        self.challenges
            .read()
            .await
            .values()
            .filter(|c| c.is_open() && c.is_expired(now))
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> ChallengeStats {
        let challenges = self.challenges.read().await;
        let open = challenges.values().filter(|c| c.is_open()).count();
        let wins = challenges.values().filter(|c| c.resolved && c.operator_won).count();
        let losses = challenges
            .values()
            .filter(|c| c.resolved && !c.operator_won)
            .count();
        ChallengeStats {
            total_challenges: challenges.len(),
            open_challenges: open,
            operator_wins: wins,
            operator_losses: losses,
        }
    }
}
