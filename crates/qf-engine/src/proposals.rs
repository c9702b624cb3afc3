use crate::error::{FundingError, Result};
use crate::types::{AccountAddress, ProposalId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// A fundable proposal. Never deleted; eligible for any round whose
/// proposal set references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub owner: AccountAddress,
    pub meta: String,
}

/// Sparse proposal patch: absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProposalUpdate {
    pub owner: Option<AccountAddress>,
    pub meta: Option<String>,
}

pub struct ProposalRegistry {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
    next_id: AtomicU64,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self {
            proposals: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a proposal. No admin gate; any caller may register and
    /// becomes the owner.
    pub async fn create_proposal(&self, owner: AccountAddress, meta: String) -> ProposalId {
        let proposal_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut proposals = self.proposals.write().await;
        proposals.insert(proposal_id, Proposal { owner, meta });

        info!(proposal_id = proposal_id, owner = %owner, "📋 Proposal created");
        proposal_id
    }

    /// Apply a sparse patch to a proposal. Owner only.
    pub async fn update_proposal(
        &self,
        caller: AccountAddress,
        proposal_id: ProposalId,
        update: ProposalUpdate,
    ) -> Result<()> {
        let mut proposals = self.proposals.write().await;
        let proposal = proposals
            .get_mut(&proposal_id)
            .ok_or(FundingError::ProposalNotFound(proposal_id))?;

        if caller != proposal.owner {
            return Err(FundingError::Unauthorized);
        }

        if let Some(owner) = update.owner {
            proposal.owner = owner;
        }
        if let Some(meta) = update.meta {
            proposal.meta = meta;
        }

        info!(proposal_id = proposal_id, caller = %caller, "✏️ Proposal updated");
        Ok(())
    }

    pub async fn get_proposal(&self, proposal_id: ProposalId) -> Result<Proposal> {
        let proposals = self.proposals.read().await;
        proposals
            .get(&proposal_id)
            .cloned()
            .ok_or(FundingError::ProposalNotFound(proposal_id))
    }
}

impl Default for ProposalRegistry {
    fn default() -> Self {
        Self::new()
    }
}
