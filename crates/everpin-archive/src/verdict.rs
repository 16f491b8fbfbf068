use crate::types::Challenge;
use anyhow::Result;
use async_trait::async_trait;

/// External authority that decides whether a challenged operator produced
/// valid data.
///
/// The reference deployment wires this to a single privileged caller, a
/// documented centralization point. Swapping in a multi-party oracle or a
/// proof verifier only means providing another implementation; ledger logic
/// never changes.
#[async_trait]
pub trait VerdictSource: Send + Sync {
    /// True when the operator demonstrated possession of the challenged
    /// content.
    async fn verdict(&self, challenge: &Challenge) -> Result<bool>;
}

/// Verdict source that always answers the same way. Used by simulations and
/// test harnesses.
pub struct StaticVerdict {
    has_data: bool,
}

impl StaticVerdict {
    pub fn new(has_data: bool) -> Self {
        Self { has_data }
    }
}

#[async_trait]
impl VerdictSource for StaticVerdict {
    async fn verdict(&self, _challenge: &Challenge) -> Result<bool> {
        Ok(self.has_data)
    }
}
