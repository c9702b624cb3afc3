use crate::chain::HeightOracle;
use crate::error::{FundingError, Result};
use crate::types::{AccountAddress, ProposalId, RoundId, TokenAmount, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// A time-boxed funding round. Never deleted once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub admin: AccountAddress,
    pub donation_token: TokenId,
    pub matching_token: TokenId,
    pub start_at: u64,
    pub end_at: u64,
    pub meta: String,
    /// Proposals eligible in this round. Membership is round-scoped; the
    /// same proposal may appear in any number of rounds.
    pub proposals: Vec<ProposalId>,
    /// Accumulated matching pool, monotonically increasing until claims
    /// start reading it.
    pub matching_pool: TokenAmount,
}

/// Everything needed to open a round.
#[derive(Debug, Clone)]
pub struct RoundParams {
    pub admin: AccountAddress,
    pub donation_token: TokenId,
    pub matching_token: TokenId,
    pub start_at: u64,
    pub end_at: u64,
    pub meta: String,
    pub proposals: Option<Vec<ProposalId>>,
}

/// Sparse round patch: absent fields are left unchanged. The proposal set
/// is deliberately not patchable here; `replace_proposals` owns it.
#[derive(Debug, Clone, Default)]
pub struct RoundUpdate {
    pub admin: Option<AccountAddress>,
    pub donation_token: Option<TokenId>,
    pub matching_token: Option<TokenId>,
    pub start_at: Option<u64>,
    pub end_at: Option<u64>,
    pub meta: Option<String>,
}

/// Receipt for a proposal-set replacement, carrying the height at which
/// the new set took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalReplacement {
    pub round_id: RoundId,
    pub effective_height: u64,
}

pub struct RoundRegistry {
    chain: Arc<dyn HeightOracle>,
    rounds: RwLock<HashMap<RoundId, Round>>,
    next_id: AtomicU64,
}

impl RoundRegistry {
    pub fn new(chain: Arc<dyn HeightOracle>) -> Self {
        Self {
            chain,
            rounds: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Open a round. The window must lie strictly in the future and be
    /// non-empty; violations are `InvalidWindow`, not a generic failure.
    pub async fn create_round(&self, params: RoundParams) -> Result<RoundId> {
        let height = self.chain.current_height();
        if params.start_at <= height || params.end_at <= params.start_at {
            return Err(FundingError::InvalidWindow {
                start: params.start_at,
                end: params.end_at,
                height,
            });
        }

        let round = Round {
            admin: params.admin,
            donation_token: params.donation_token,
            matching_token: params.matching_token,
            start_at: params.start_at,
            end_at: params.end_at,
            meta: params.meta,
            proposals: params.proposals.unwrap_or_default(),
            matching_pool: TokenAmount::ZERO,
        };

        let round_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut rounds = self.rounds.write().await;
        rounds.insert(round_id, round);

        info!(
            round_id = round_id,
            admin = %params.admin,
            start_at = params.start_at,
            end_at = params.end_at,
            "🏁 Round created"
        );
        Ok(round_id)
    }

    /// Apply a sparse patch to a round. Admin only.
    pub async fn update_round(
        &self,
        caller: AccountAddress,
        round_id: RoundId,
        update: RoundUpdate,
    ) -> Result<()> {
        let mut rounds = self.rounds.write().await;
        let round = rounds
            .get_mut(&round_id)
            .ok_or(FundingError::RoundNotFound(round_id))?;

        if caller != round.admin {
            return Err(FundingError::Unauthorized);
        }

        if let Some(admin) = update.admin {
            round.admin = admin;
        }
        if let Some(token) = update.donation_token {
            round.donation_token = token;
        }
        if let Some(token) = update.matching_token {
            round.matching_token = token;
        }
        if let Some(start_at) = update.start_at {
            round.start_at = start_at;
        }
        if let Some(end_at) = update.end_at {
            round.end_at = end_at;
        }
        if let Some(meta) = update.meta {
            round.meta = meta;
        }

        info!(round_id = round_id, caller = %caller, "✏️ Round updated");
        Ok(())
    }

    /// Replace the round's proposal set wholesale. Admin only. The previous
    /// set is not consulted; this is a full overwrite.
    pub async fn replace_proposals(
        &self,
        caller: AccountAddress,
        round_id: RoundId,
        proposal_ids: Vec<ProposalId>,
    ) -> Result<ProposalReplacement> {
        let mut rounds = self.rounds.write().await;
        let round = rounds
            .get_mut(&round_id)
            .ok_or(FundingError::RoundNotFound(round_id))?;

        if caller != round.admin {
            return Err(FundingError::Unauthorized);
        }

        let count = proposal_ids.len();
        round.proposals = proposal_ids;
        let effective_height = self.chain.current_height();

        info!(
            round_id = round_id,
            proposals = count,
            effective_height = effective_height,
            "🔁 Proposal set replaced"
        );
        Ok(ProposalReplacement {
            round_id,
            effective_height,
        })
    }

    pub async fn get_round(&self, round_id: RoundId) -> Result<Round> {
        let rounds = self.rounds.read().await;
        rounds
            .get(&round_id)
            .cloned()
            .ok_or(FundingError::RoundNotFound(round_id))
    }

    /// Credit the matching pool. Called by the contribution ledger after
    /// the deposit transfer has gone through.
    pub(crate) async fn credit_matching_pool(
        &self,
        round_id: RoundId,
        amount: TokenAmount,
    ) -> Result<TokenAmount> {
        let mut rounds = self.rounds.write().await;
        let round = rounds
            .get_mut(&round_id)
            .ok_or(FundingError::RoundNotFound(round_id))?;

        round.matching_pool = round
            .matching_pool
            .checked_add(amount)
            .ok_or(FundingError::Overflow)?;
        Ok(round.matching_pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::BlockClock;

    fn params(admin: AccountAddress, start_at: u64, end_at: u64) -> RoundParams {
        RoundParams {
            admin,
            donation_token: TokenId::from_bytes([7; 32]),
            matching_token: TokenId::from_bytes([7; 32]),
            start_at,
            end_at,
            meta: "https://example.org/round".to_string(),
            proposals: None,
        }
    }

    #[tokio::test]
    async fn test_create_round_sequential_ids() {
        let registry = RoundRegistry::new(Arc::new(BlockClock::new()));
        let admin = AccountAddress::from_bytes([1; 32]);

        assert_eq!(registry.create_round(params(admin, 5, 10)).await.unwrap(), 0);
        assert_eq!(registry.create_round(params(admin, 5, 10)).await.unwrap(), 1);
        assert_eq!(registry.create_round(params(admin, 5, 10)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_create_round_rejects_past_start() {
        let clock = Arc::new(BlockClock::at(4));
        let registry = RoundRegistry::new(clock);
        let admin = AccountAddress::from_bytes([1; 32]);

        // Start at the current height is not in the future.
        let err = registry.create_round(params(admin, 4, 10)).await.unwrap_err();
        assert!(matches!(err, FundingError::InvalidWindow { .. }));

        let err = registry.create_round(params(admin, 1, 10)).await.unwrap_err();
        assert!(matches!(err, FundingError::InvalidWindow { .. }));

        assert!(registry.create_round(params(admin, 5, 10)).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_round_rejects_empty_window() {
        let registry = RoundRegistry::new(Arc::new(BlockClock::new()));
        let admin = AccountAddress::from_bytes([1; 32]);

        let err = registry.create_round(params(admin, 10, 10)).await.unwrap_err();
        assert!(matches!(err, FundingError::InvalidWindow { .. }));

        let err = registry.create_round(params(admin, 10, 5)).await.unwrap_err();
        assert!(matches!(err, FundingError::InvalidWindow { .. }));
    }

    #[tokio::test]
    async fn test_update_round_patches_only_given_fields() {
        let registry = RoundRegistry::new(Arc::new(BlockClock::new()));
        let admin = AccountAddress::from_bytes([1; 32]);

        let id = registry.create_round(params(admin, 5, 10)).await.unwrap();
        registry
            .update_round(
                admin,
                id,
                RoundUpdate {
                    start_at: Some(8),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let round = registry.get_round(id).await.unwrap();
        assert_eq!(round.start_at, 8);
        assert_eq!(round.end_at, 10);
        assert_eq!(round.meta, "https://example.org/round");
        assert_eq!(round.admin, admin);
    }

    #[tokio::test]
    async fn test_update_round_requires_admin() {
        let registry = RoundRegistry::new(Arc::new(BlockClock::new()));
        let admin = AccountAddress::from_bytes([1; 32]);
        let outsider = AccountAddress::from_bytes([2; 32]);

        let id = registry.create_round(params(admin, 5, 10)).await.unwrap();
        let err = registry
            .update_round(
                outsider,
                id,
                RoundUpdate {
                    start_at: Some(8),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Unauthorized));
    }

    #[tokio::test]
    async fn test_replace_proposals_overwrites_and_reports_height() {
        let clock = Arc::new(BlockClock::at(2));
        let registry = RoundRegistry::new(clock.clone());
        let admin = AccountAddress::from_bytes([1; 32]);

        let mut p = params(admin, 5, 10);
        p.proposals = Some(vec![0, 1]);
        let id = registry.create_round(p).await.unwrap();

        clock.advance(1);
        let receipt = registry
            .replace_proposals(admin, id, vec![2, 3])
            .await
            .unwrap();
        assert_eq!(receipt.round_id, id);
        assert_eq!(receipt.effective_height, 3);

        let round = registry.get_round(id).await.unwrap();
        assert_eq!(round.proposals, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_replace_proposals_requires_admin() {
        let registry = RoundRegistry::new(Arc::new(BlockClock::new()));
        let admin = AccountAddress::from_bytes([1; 32]);
        let outsider = AccountAddress::from_bytes([2; 32]);

        let id = registry.create_round(params(admin, 5, 10)).await.unwrap();
        let err = registry
            .replace_proposals(outsider, id, vec![2, 3])
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Unauthorized));
    }

    #[tokio::test]
    async fn test_missing_round_not_found() {
        let registry = RoundRegistry::new(Arc::new(BlockClock::new()));
        let caller = AccountAddress::from_bytes([1; 32]);

        assert!(matches!(
            registry.get_round(9).await.unwrap_err(),
            FundingError::RoundNotFound(9)
        ));
        assert!(matches!(
            registry
                .update_round(caller, 9, RoundUpdate::default())
                .await
                .unwrap_err(),
            FundingError::RoundNotFound(9)
        ));
    }
}
