use crate::active_set::ActiveSet;
use crate::error::{LedgerError, Result};
use crate::rewards::scaled_accumulation;
use crate::types::{AccountId, PinAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Ledger parameters, fixed at construction.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Minimum stake required to register and to remain active.
    pub min_stake: PinAmount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_stake: PinAmount::from_pin(100.0),
        }
    }
}

/// Per-operator ledger record.
///
/// Created exactly once per identity. The record survives deactivation and
/// full withdrawal so historical counters stay queryable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorRecord {
    pub operator: AccountId,
    pub stake: PinAmount,
    pub registered_at: i64,
    pub last_claim_at: i64,
    /// Raw commit calls, not distinct content identifiers.
    pub commitment_count: u64,
    pub challenges_won: u64,
    pub challenges_lost: u64,
    pub active: bool,
    /// Opaque locator for out-of-band data retrieval.
    pub endpoint: String,
    /// Accumulator value already priced into this operator's stake.
    pub(crate) reward_debt: u128,
}

impl OperatorRecord {
    /// 100 when the operator has never been challenged, else the integer
    /// percentage of challenges won.
    pub fn success_rate(&self) -> u64 {
        let total = self.challenges_won + self.challenges_lost;
        if total == 0 {
            100
        } else {
            self.challenges_won * 100 / total
        }
    }
}

/// The explicit ledger state: operator arena plus scalar totals. Every
/// operation runs to completion under one write lock, so each either fully
/// applies or fails without mutation.
#[derive(Debug, Default)]
pub(crate) struct LedgerBook {
    pub(crate) operators: HashMap<AccountId, OperatorRecord>,
    pub(crate) active: ActiveSet,
    pub(crate) total_stake: PinAmount,
    pub(crate) reward_pool: PinAmount,
    pub(crate) acc_reward_per_stake: u128,
    pub(crate) total_funded: PinAmount,
    pub(crate) total_rewards_paid: PinAmount,
}

/// Result of a withdrawal, reported to the caller for value transfer.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawReceipt {
    pub withdrawn: PinAmount,
    pub rewards_paid: PinAmount,
    pub deactivated: bool,
}

/// Result of a slash, reported to the challenge layer.
#[derive(Debug, Clone, Copy)]
pub struct SlashReceipt {
    pub slashed: PinAmount,
    pub remaining_stake: PinAmount,
    pub rewards_paid: PinAmount,
    pub deactivated: bool,
}

/// Point-in-time ledger totals.
#[derive(Debug, Clone, Copy)]
pub struct LedgerStats {
    pub total_operators: usize,
    pub active_operators: usize,
    pub total_stake: PinAmount,
    pub reward_pool: PinAmount,
    pub acc_reward_per_stake: u128,
    pub total_funded: PinAmount,
    pub total_rewards_paid: PinAmount,
}

/// Stake ledger for the archiver set.
///
/// Tracks each operator's bonded stake, the active membership set, and the
/// aggregate totals the reward accumulator distributes against.
pub struct StakeLedger {
    config: LedgerConfig,
    pub(crate) book: Arc<RwLock<LedgerBook>>,
}

impl StakeLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            book: Arc::new(RwLock::new(LedgerBook::default())),
        }
    }

    pub fn min_stake(&self) -> PinAmount {
        self.config.min_stake
    }

    /// Register a new operator with its initial bonded stake.
    pub async fn register(
        &self,
        operator: AccountId,
        endpoint: String,
        initial_stake: PinAmount,
    ) -> Result<()> {
        if initial_stake < self.config.min_stake {
            return Err(LedgerError::InsufficientStake {
                required: self.config.min_stake,
                provided: initial_stake,
            });
        }

        let mut book = self.book.write().await;
        if book.operators.contains_key(&operator) {
            return Err(LedgerError::AlreadyRegistered(operator));
        }

        // A joiner owes nothing for rewards accrued before it joined.
        let reward_debt = scaled_accumulation(initial_stake, book.acc_reward_per_stake)?;
        let new_total = book
            .total_stake
            .checked_add(initial_stake)
            .ok_or(LedgerError::ArithmeticOverflow("total stake"))?;

        let now = chrono::Utc::now().timestamp();
        book.operators.insert(
            operator,
            OperatorRecord {
                operator,
                stake: initial_stake,
                registered_at: now,
                last_claim_at: now,
                commitment_count: 0,
                challenges_won: 0,
                challenges_lost: 0,
                active: true,
                endpoint: endpoint.clone(),
                reward_debt,
            },
        );
        book.active.insert(operator);
        book.total_stake = new_total;

        info!(
            operator = %operator,
            stake = %initial_stake,
            endpoint = %endpoint,
            total_stake = %book.total_stake,
            "🔐 Operator registered"
        );
        Ok(())
    }

    /// Bond additional stake. Pending rewards are settled first so past
    /// earnings are not re-priced at the new stake level. Re-activates an
    /// inactive operator once its stake reaches the minimum again.
    pub async fn add_stake(&self, operator: AccountId, amount: PinAmount) -> Result<PinAmount> {
        let now = chrono::Utc::now().timestamp();
        let mut book = self.book.write().await;

        let record = book
            .operators
            .get(&operator)
            .ok_or(LedgerError::NotRegistered(operator))?;
        let new_stake = record
            .stake
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("operator stake"))?;
        let new_total = book
            .total_stake
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("total stake"))?;
        let new_debt = scaled_accumulation(new_stake, book.acc_reward_per_stake)?;

        let rewards_paid = book.settle(&operator, now)?;

        let record = book
            .operators
            .get_mut(&operator)
            .ok_or(LedgerError::NotRegistered(operator))?;
        record.stake = new_stake;
        record.reward_debt = new_debt;
        let reactivated = !record.active && new_stake >= self.config.min_stake;
        if reactivated {
            record.active = true;
        }
        book.total_stake = new_total;
        if reactivated {
            book.active.insert(operator);
        }

        info!(
            operator = %operator,
            amount = %amount,
            stake = %new_stake,
            reactivated,
            "📥 Stake added"
        );
        Ok(rewards_paid)
    }

    /// Withdraw bonded stake. The remaining stake must be zero or at least
    /// the minimum; a full withdrawal deactivates the operator but keeps the
    /// zeroed record for historical lookups.
    pub async fn withdraw_stake(
        &self,
        operator: AccountId,
        amount: PinAmount,
    ) -> Result<WithdrawReceipt> {
        let now = chrono::Utc::now().timestamp();
        let mut book = self.book.write().await;

        let record = book
            .operators
            .get(&operator)
            .ok_or(LedgerError::NotRegistered(operator))?;
        let remaining = record.stake.checked_sub(amount).ok_or(LedgerError::ExceedsStake {
            stake: record.stake,
            requested: amount,
        })?;
        if !remaining.is_zero() && remaining < self.config.min_stake {
            return Err(LedgerError::BelowMinimum {
                remaining,
                minimum: self.config.min_stake,
            });
        }
        let new_total = book
            .total_stake
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticOverflow("total stake"))?;
        let new_debt = scaled_accumulation(remaining, book.acc_reward_per_stake)?;

        let rewards_paid = book.settle(&operator, now)?;

        let record = book
            .operators
            .get_mut(&operator)
            .ok_or(LedgerError::NotRegistered(operator))?;
        record.stake = remaining;
        record.reward_debt = new_debt;
        let deactivated = remaining.is_zero() && record.active;
        if deactivated {
            record.active = false;
        }
        book.total_stake = new_total;
        if deactivated {
            book.active.remove(&operator);
        }

        info!(
            operator = %operator,
            amount = %amount,
            remaining = %remaining,
            deactivated,
            "💸 Stake withdrawn"
        );
        Ok(WithdrawReceipt {
            withdrawn: amount,
            rewards_paid,
            deactivated,
        })
    }

    /// Leave the active set without touching stake. The residual balance
    /// stays claimable through a later withdrawal.
    pub async fn deactivate(&self, operator: AccountId) -> Result<()> {
        let mut book = self.book.write().await;
        let record = book
            .operators
            .get_mut(&operator)
            .ok_or(LedgerError::NotRegistered(operator))?;
        if !record.active {
            return Err(LedgerError::NotActive(operator));
        }
        record.active = false;
        book.active.remove(&operator);

        info!(operator = %operator, "🚪 Operator deactivated");
        Ok(())
    }

    /// Forfeit a percentage of the operator's stake. Pending rewards are
    /// settled before the deduction. Drops the operator out of the active set
    /// when the remainder falls below the minimum; the record and any
    /// residual stake stay in place.
    pub async fn slash(&self, operator: AccountId, percent: u64) -> Result<SlashReceipt> {
        let now = chrono::Utc::now().timestamp();
        let mut book = self.book.write().await;

        let record = book
            .operators
            .get(&operator)
            .ok_or(LedgerError::NotRegistered(operator))?;
        let stake_units = record.stake.to_base_units() as u128;
        let slashed = PinAmount::from_base_units((stake_units * percent as u128 / 100) as u64);
        let remaining = record
            .stake
            .checked_sub(slashed)
            .ok_or(LedgerError::ArithmeticOverflow("operator stake"))?;
        let new_total = book
            .total_stake
            .checked_sub(slashed)
            .ok_or(LedgerError::ArithmeticOverflow("total stake"))?;
        let new_debt = scaled_accumulation(remaining, book.acc_reward_per_stake)?;

        let rewards_paid = book.settle(&operator, now)?;

        let record = book
            .operators
            .get_mut(&operator)
            .ok_or(LedgerError::NotRegistered(operator))?;
        record.stake = remaining;
        record.reward_debt = new_debt;
        let deactivated = record.active && remaining < self.config.min_stake;
        if deactivated {
            record.active = false;
        }
        book.total_stake = new_total;
        if deactivated {
            book.active.remove(&operator);
        }

        warn!(
            operator = %operator,
            slashed = %slashed,
            remaining = %remaining,
            deactivated,
            "⚡ Operator slashed"
        );
        Ok(SlashReceipt {
            slashed,
            remaining_stake: remaining,
            rewards_paid,
            deactivated,
        })
    }

    /// Count a commit call against the operator's record.
    pub async fn note_commitment(&self, operator: &AccountId) -> Result<()> {
        let mut book = self.book.write().await;
        let record = book
            .operators
            .get_mut(operator)
            .ok_or(LedgerError::NotRegistered(*operator))?;
        record.commitment_count += 1;
        Ok(())
    }

    /// Count a resolved challenge against the operator's record.
    pub async fn record_challenge_result(&self, operator: &AccountId, won: bool) -> Result<()> {
        let mut book = self.book.write().await;
        let record = book
            .operators
            .get_mut(operator)
            .ok_or(LedgerError::NotRegistered(*operator))?;
        if won {
            record.challenges_won += 1;
        } else {
            record.challenges_lost += 1;
        }
        Ok(())
    }

    pub async fn operator(&self, operator: &AccountId) -> Option<OperatorRecord> {
        self.book.read().await.operators.get(operator).cloned()
    }

    pub async fn is_active(&self, operator: &AccountId) -> bool {
        self.book.read().await.active.contains(operator)
    }

    pub async fn active_operators(&self) -> Vec<AccountId> {
        self.book.read().await.active.members().to_vec()
    }

    pub async fn total_stake(&self) -> PinAmount {
        self.book.read().await.total_stake
    }

    pub async fn stats(&self) -> LedgerStats {
        let book = self.book.read().await;
        LedgerStats {
            total_operators: book.operators.len(),
            active_operators: book.active.len(),
            total_stake: book.total_stake,
            reward_pool: book.reward_pool,
            acc_reward_per_stake: book.acc_reward_per_stake,
            total_funded: book.total_funded,
            total_rewards_paid: book.total_rewards_paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 32])
    }

    fn test_ledger() -> StakeLedger {
        StakeLedger::new(LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_register_requires_minimum_stake() {
        let ledger = test_ledger();
        let err = ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(99.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStake { .. }));

        ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        assert!(ledger.is_active(&id(1)).await);
        assert_eq!(ledger.total_stake().await, PinAmount::from_pin(100.0));
    }

    #[tokio::test]
    async fn test_register_once_per_identity() {
        let ledger = test_ledger();
        ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        let err = ledger
            .register(id(1), "https://b.example.com".to_string(), PinAmount::from_pin(200.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRegistered(_)));

        // Still refused after the operator fully withdraws.
        ledger
            .withdraw_stake(id(1), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        let err = ledger
            .register(id(1), "https://b.example.com".to_string(), PinAmount::from_pin(200.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_withdraw_enforces_minimum_remainder() {
        let ledger = test_ledger();
        ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(150.0))
            .await
            .unwrap();

        // Leaving 0 < stake < min is refused.
        let err = ledger
            .withdraw_stake(id(1), PinAmount::from_pin(100.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BelowMinimum { .. }));

        // Withdrawing more than the stake is refused.
        let err = ledger
            .withdraw_stake(id(1), PinAmount::from_pin(200.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ExceedsStake { .. }));

        // Partial withdrawal down to exactly the minimum is fine.
        let receipt = ledger
            .withdraw_stake(id(1), PinAmount::from_pin(50.0))
            .await
            .unwrap();
        assert!(!receipt.deactivated);
        assert_eq!(ledger.total_stake().await, PinAmount::from_pin(100.0));
    }

    #[tokio::test]
    async fn test_full_withdrawal_deactivates_but_keeps_record() {
        let ledger = test_ledger();
        ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();

        let receipt = ledger
            .withdraw_stake(id(1), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        assert!(receipt.deactivated);
        assert!(!ledger.is_active(&id(1)).await);
        assert!(ledger.active_operators().await.is_empty());

        let record = ledger.operator(&id(1)).await.unwrap();
        assert_eq!(record.stake, PinAmount::ZERO);
        assert!(!record.active);
    }

    #[tokio::test]
    async fn test_deactivate_keeps_stake_claimable() {
        let ledger = test_ledger();
        ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        ledger.deactivate(id(1)).await.unwrap();

        let err = ledger.deactivate(id(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotActive(_)));

        // Residual stake is still there and withdrawable.
        let record = ledger.operator(&id(1)).await.unwrap();
        assert_eq!(record.stake, PinAmount::from_pin(100.0));
        ledger
            .withdraw_stake(id(1), PinAmount::from_pin(100.0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_slash_below_minimum_deactivates() {
        let ledger = test_ledger();
        ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();

        let receipt = ledger.slash(id(1), 10).await.unwrap();
        assert_eq!(receipt.slashed, PinAmount::from_pin(10.0));
        assert_eq!(receipt.remaining_stake, PinAmount::from_pin(90.0));
        assert!(receipt.deactivated);
        assert!(!ledger.is_active(&id(1)).await);
        assert_eq!(ledger.total_stake().await, PinAmount::from_pin(90.0));
    }

    #[tokio::test]
    async fn test_top_up_reactivates_slashed_operator() {
        let ledger = test_ledger();
        ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        ledger.slash(id(1), 20).await.unwrap();
        assert!(!ledger.is_active(&id(1)).await);

        // Topping back up over the minimum restores active membership.
        ledger.add_stake(id(1), PinAmount::from_pin(20.0)).await.unwrap();
        assert!(ledger.is_active(&id(1)).await);
        assert_eq!(ledger.total_stake().await, PinAmount::from_pin(100.0));
    }

    #[tokio::test]
    async fn test_add_stake_unknown_operator() {
        let ledger = test_ledger();
        let err = ledger
            .add_stake(id(1), PinAmount::from_pin(10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotRegistered(_)));
    }

    #[tokio::test]
    async fn test_success_rate() {
        let ledger = test_ledger();
        ledger
            .register(id(1), "https://a.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();

        let record = ledger.operator(&id(1)).await.unwrap();
        assert_eq!(record.success_rate(), 100);

        ledger.record_challenge_result(&id(1), true).await.unwrap();
        ledger.record_challenge_result(&id(1), true).await.unwrap();
        ledger.record_challenge_result(&id(1), false).await.unwrap();

        let record = ledger.operator(&id(1)).await.unwrap();
        assert_eq!(record.challenges_won, 2);
        assert_eq!(record.challenges_lost, 1);
        assert_eq!(record.success_rate(), 66);
    }
}
