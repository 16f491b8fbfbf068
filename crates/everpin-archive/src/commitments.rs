use crate::error::{ArchiveError, Result};
use crate::types::{ArchiveConfig, ContentId};
use everpin_ledger::{AccountId, StakeLedger};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Index statistics.
#[derive(Debug, Clone, Copy)]
pub struct IndexStats {
    pub tracked_content: usize,
    pub total_commitments: usize,
}

/// Records which operators claim to store which content identifiers.
///
/// Commitments are append-only and deliberately not deduplicated: an
/// operator may commit to the same content several times and every call
/// counts toward its raw commitment tally.
pub struct CommitmentIndex {
    config: ArchiveConfig,
    ledger: Arc<StakeLedger>,
    commitments: Arc<RwLock<HashMap<ContentId, Vec<AccountId>>>>,
}

impl CommitmentIndex {
    pub fn new(config: ArchiveConfig, ledger: Arc<StakeLedger>) -> Self {
        Self {
            config,
            ledger,
            commitments: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Advertise storage of one content identifier.
    pub async fn commit(&self, operator: AccountId, content_id: ContentId) -> Result<()> {
        if !self.ledger.is_active(&operator).await {
            return Err(ArchiveError::NotActive(operator));
        }

        self.commitments
            .write()
            .await
            .entry(content_id)
            .or_default()
            .push(operator);
        self.ledger.note_commitment(&operator).await?;

        debug!(
            operator = %operator,
            content = %content_id,
            "📌 Storage commitment recorded"
        );
        Ok(())
    }

    /// Advertise storage of several content identifiers at once. Returns the
    /// number of commitments recorded.
    pub async fn commit_batch(
        &self,
        operator: AccountId,
        content_ids: &[ContentId],
    ) -> Result<usize> {
        if content_ids.len() > self.config.max_batch_size {
            return Err(ArchiveError::BatchTooLarge {
                len: content_ids.len(),
                max: self.config.max_batch_size,
            });
        }
        if !self.ledger.is_active(&operator).await {
            return Err(ArchiveError::NotActive(operator));
        }

        {
            let mut commitments = self.commitments.write().await;
            for content_id in content_ids {
                commitments.entry(*content_id).or_default().push(operator);
            }
        }
        for _ in content_ids {
            self.ledger.note_commitment(&operator).await?;
        }

        info!(
            operator = %operator,
            count = content_ids.len(),
            "📦 Commitment batch recorded"
        );
        Ok(content_ids.len())
    }

    /// Raw (possibly duplicated) list of operators committed to a content
    /// identifier.
    pub async fn archivers_for(&self, content_id: &ContentId) -> Vec<AccountId> {
        self.commitments
            .read()
            .await
            .get(content_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn stats(&self) -> IndexStats {
        let commitments = self.commitments.read().await;
        IndexStats {
            tracked_content: commitments.len(),
            total_commitments: commitments.values().map(Vec::len).sum(),
        }
    }
}
