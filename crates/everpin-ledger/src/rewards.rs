//! Proportional reward distribution over bonded stake.
//!
//! Funding events bump a single per-unit accumulator instead of iterating
//! operators; each operator carries a reward debt marking the accumulator
//! value already priced into its stake. Pending reward is always
//! `stake * acc / REWARD_SCALE - debt`, so settlement must run before every
//! stake mutation or past earnings would be re-priced at the new stake level.

use crate::error::{LedgerError, Result};
use crate::stake::{LedgerBook, StakeLedger};
use crate::types::{AccountId, PinAmount, REWARD_SCALE};
use tracing::{debug, info, warn};

/// `stake * acc / REWARD_SCALE`, the accumulated reward units priced in for
/// a stake level at an accumulator value. Floor division; dust stays in the
/// pool and never manufactures value.
pub(crate) fn scaled_accumulation(stake: PinAmount, acc_reward_per_stake: u128) -> Result<u128> {
    (stake.to_base_units() as u128)
        .checked_mul(acc_reward_per_stake)
        .map(|units| units / REWARD_SCALE)
        .ok_or(LedgerError::ArithmeticOverflow("reward accumulation"))
}

impl LedgerBook {
    /// Pay out the operator's pending reward and re-anchor its reward debt.
    /// Returns the amount paid (zero when nothing is pending).
    pub(crate) fn settle(&mut self, operator: &AccountId, now: i64) -> Result<PinAmount> {
        let record = self
            .operators
            .get(operator)
            .ok_or(LedgerError::NotRegistered(*operator))?;
        let accumulated = scaled_accumulation(record.stake, self.acc_reward_per_stake)?;
        let pending_units = accumulated.saturating_sub(record.reward_debt);
        if pending_units == 0 {
            return Ok(PinAmount::ZERO);
        }

        let pending = PinAmount::from_base_units(
            u64::try_from(pending_units)
                .map_err(|_| LedgerError::ArithmeticOverflow("pending reward"))?,
        );
        self.reward_pool = self
            .reward_pool
            .checked_sub(pending)
            .ok_or(LedgerError::ArithmeticOverflow("reward pool"))?;
        self.total_rewards_paid = self
            .total_rewards_paid
            .checked_add(pending)
            .ok_or(LedgerError::ArithmeticOverflow("rewards paid"))?;

        let record = self
            .operators
            .get_mut(operator)
            .ok_or(LedgerError::NotRegistered(*operator))?;
        record.reward_debt = accumulated;
        record.last_claim_at = now;
        Ok(pending)
    }
}

impl StakeLedger {
    /// Credit the reward pool. With stake bonded, the per-unit accumulator
    /// advances so every active staker earns proportionally; with no stake
    /// bonded, the amount sits unattributed in the pool until someone stakes.
    pub async fn fund_pool(&self, amount: PinAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let mut book = self.book.write().await;
        let new_pool = book
            .reward_pool
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("reward pool"))?;
        let new_funded = book
            .total_funded
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("total funded"))?;

        if book.total_stake.is_zero() {
            book.reward_pool = new_pool;
            book.total_funded = new_funded;
            warn!(
                amount = %amount,
                pool = %book.reward_pool,
                "💰 Pool funded with no stake bonded; amount held unattributed"
            );
            return Ok(());
        }

        let delta = (amount.to_base_units() as u128)
            .checked_mul(REWARD_SCALE)
            .ok_or(LedgerError::ArithmeticOverflow("accumulator delta"))?
            / (book.total_stake.to_base_units() as u128);
        book.acc_reward_per_stake = book
            .acc_reward_per_stake
            .checked_add(delta)
            .ok_or(LedgerError::ArithmeticOverflow("reward accumulator"))?;
        book.reward_pool = new_pool;
        book.total_funded = new_funded;

        info!(
            amount = %amount,
            total_stake = %book.total_stake,
            pool = %book.reward_pool,
            "💰 Reward pool funded"
        );
        Ok(())
    }

    /// Settle and pay out the caller's pending reward. Zero pending is a
    /// no-op, not an error.
    pub async fn claim_rewards(&self, operator: AccountId) -> Result<PinAmount> {
        let now = chrono::Utc::now().timestamp();
        let mut book = self.book.write().await;
        let paid = book.settle(&operator, now)?;

        if paid.is_zero() {
            debug!(operator = %operator, "No pending rewards to claim");
        } else {
            info!(operator = %operator, amount = %paid, "🎁 Rewards claimed");
        }
        Ok(paid)
    }

    /// Pending reward for an operator; same formula as settlement, without
    /// mutation.
    pub async fn pending_rewards(&self, operator: &AccountId) -> Result<PinAmount> {
        let book = self.book.read().await;
        let record = book
            .operators
            .get(operator)
            .ok_or(LedgerError::NotRegistered(*operator))?;
        let accumulated = scaled_accumulation(record.stake, book.acc_reward_per_stake)?;
        let pending = accumulated.saturating_sub(record.reward_debt);
        Ok(PinAmount::from_base_units(
            u64::try_from(pending).map_err(|_| LedgerError::ArithmeticOverflow("pending reward"))?,
        ))
    }

    pub async fn reward_pool(&self) -> PinAmount {
        self.book.read().await.reward_pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stake::LedgerConfig;

    fn id(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 32])
    }

    async fn ledger_with(operators: &[(u8, f64)]) -> StakeLedger {
        let ledger = StakeLedger::new(LedgerConfig::default());
        for (byte, stake) in operators {
            ledger
                .register(
                    id(*byte),
                    format!("https://op{}.example.com", byte),
                    PinAmount::from_pin(*stake),
                )
                .await
                .unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn test_sole_staker_earns_everything() {
        let ledger = ledger_with(&[(1, 100.0)]).await;
        ledger.fund_pool(PinAmount::from_pin(100.0)).await.unwrap();

        let pending = ledger.pending_rewards(&id(1)).await.unwrap();
        assert_eq!(pending, PinAmount::from_pin(100.0));

        let paid = ledger.claim_rewards(id(1)).await.unwrap();
        assert_eq!(paid, PinAmount::from_pin(100.0));
        assert_eq!(ledger.reward_pool().await, PinAmount::ZERO);
    }

    #[tokio::test]
    async fn test_rewards_split_proportionally() {
        let ledger = ledger_with(&[(1, 200.0), (2, 100.0)]).await;
        ledger.fund_pool(PinAmount::from_pin(90.0)).await.unwrap();

        assert_eq!(
            ledger.pending_rewards(&id(1)).await.unwrap(),
            PinAmount::from_pin(60.0)
        );
        assert_eq!(
            ledger.pending_rewards(&id(2)).await.unwrap(),
            PinAmount::from_pin(30.0)
        );
    }

    #[tokio::test]
    async fn test_claim_is_idempotent_without_new_funding() {
        let ledger = ledger_with(&[(1, 100.0)]).await;
        ledger.fund_pool(PinAmount::from_pin(50.0)).await.unwrap();

        let first = ledger.claim_rewards(id(1)).await.unwrap();
        assert_eq!(first, PinAmount::from_pin(50.0));
        let second = ledger.claim_rewards(id(1)).await.unwrap();
        assert_eq!(second, PinAmount::ZERO);
    }

    #[tokio::test]
    async fn test_late_joiner_owes_nothing_for_past_funding() {
        let ledger = ledger_with(&[(1, 100.0)]).await;
        ledger.fund_pool(PinAmount::from_pin(40.0)).await.unwrap();

        ledger
            .register(id(2), "https://op2.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        assert_eq!(ledger.pending_rewards(&id(2)).await.unwrap(), PinAmount::ZERO);

        // The earlier funding still belongs to the first operator in full.
        assert_eq!(
            ledger.pending_rewards(&id(1)).await.unwrap(),
            PinAmount::from_pin(40.0)
        );
    }

    #[tokio::test]
    async fn test_funding_with_no_stake_is_stranded() {
        let ledger = StakeLedger::new(LedgerConfig::default());
        ledger.fund_pool(PinAmount::from_pin(25.0)).await.unwrap();

        let stats = ledger.stats().await;
        assert_eq!(stats.reward_pool, PinAmount::from_pin(25.0));
        assert_eq!(stats.acc_reward_per_stake, 0);

        // A later staker does not inherit the stranded amount.
        ledger
            .register(id(1), "https://op1.example.com".to_string(), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        assert_eq!(ledger.pending_rewards(&id(1)).await.unwrap(), PinAmount::ZERO);
    }

    #[tokio::test]
    async fn test_settlement_runs_before_stake_changes() {
        let ledger = ledger_with(&[(1, 100.0)]).await;
        ledger.fund_pool(PinAmount::from_pin(30.0)).await.unwrap();

        // Doubling the stake must pay out the old pending first, not
        // re-price it at the new stake level.
        let settled = ledger
            .add_stake(id(1), PinAmount::from_pin(100.0))
            .await
            .unwrap();
        assert_eq!(settled, PinAmount::from_pin(30.0));
        assert_eq!(ledger.pending_rewards(&id(1)).await.unwrap(), PinAmount::ZERO);

        ledger.fund_pool(PinAmount::from_pin(30.0)).await.unwrap();
        assert_eq!(
            ledger.pending_rewards(&id(1)).await.unwrap(),
            PinAmount::from_pin(30.0)
        );
    }

    #[tokio::test]
    async fn test_pending_for_unknown_operator() {
        let ledger = StakeLedger::new(LedgerConfig::default());
        let err = ledger.pending_rewards(&id(9)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotRegistered(_)));
    }
}
