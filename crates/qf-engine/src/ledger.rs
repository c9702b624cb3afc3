use crate::chain::HeightOracle;
use crate::custody::TokenTransfer;
use crate::error::{FundingError, Result};
use crate::proposals::ProposalRegistry;
use crate::rounds::RoundRegistry;
use crate::types::{AccountAddress, ProposalId, RoundId, TokenAmount, TokenId};
use qf_math::donation_weight;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Running totals for one (round, proposal) pair. The weight is the sum of
/// per-donation fixed-point square roots, never the root of the sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionAggregate {
    pub funding_amount: TokenAmount,
    pub weight: u64,
}

/// One accepted matching-pool deposit. `contributor` is withheld when the
/// deposit was made anonymously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub round_id: RoundId,
    pub contributor: Option<AccountAddress>,
    pub amount: TokenAmount,
    pub height: u64,
}

type AggregateMap = HashMap<(RoundId, ProposalId), ContributionAggregate>;

/// Records donations and matching-pool deposits. Every accepted call moves
/// funds into custody and updates the aggregates in the same step; a failed
/// transfer leaves no trace.
pub struct ContributionLedger {
    rounds: Arc<RoundRegistry>,
    proposals: Arc<ProposalRegistry>,
    transfers: Arc<dyn TokenTransfer>,
    chain: Arc<dyn HeightOracle>,
    aggregates: RwLock<AggregateMap>,
    match_history: RwLock<Vec<MatchRecord>>,
}

impl ContributionLedger {
    pub fn new(
        rounds: Arc<RoundRegistry>,
        proposals: Arc<ProposalRegistry>,
        transfers: Arc<dyn TokenTransfer>,
        chain: Arc<dyn HeightOracle>,
    ) -> Self {
        Self {
            rounds,
            proposals,
            transfers,
            chain,
            aggregates: RwLock::new(HashMap::new()),
            match_history: RwLock::new(Vec::new()),
        }
    }

    /// Deposit into a round's matching pool. No height gate: matching funds
    /// may arrive any time before settlement reads the pool. When `anon` is
    /// set the contributor is left out of the match history.
    pub async fn add_match(
        &self,
        caller: AccountAddress,
        round_id: RoundId,
        token: TokenId,
        amount: TokenAmount,
        anon: bool,
    ) -> Result<()> {
        let round = self.rounds.get_round(round_id).await?;
        if token != round.matching_token {
            return Err(FundingError::TokenMismatch {
                expected: round.matching_token,
                actual: token,
            });
        }

        // Reject a pool overflow before funds move.
        round
            .matching_pool
            .checked_add(amount)
            .ok_or(FundingError::Overflow)?;

        self.transfers
            .transfer(caller, AccountAddress::custodian(), token, amount)
            .await?;
        let pool = self.rounds.credit_matching_pool(round_id, amount).await?;

        let mut history = self.match_history.write().await;
        history.push(MatchRecord {
            round_id,
            contributor: (!anon).then_some(caller),
            amount,
            height: self.chain.current_height(),
        });

        info!(
            round_id = round_id,
            amount = %amount,
            pool = %pool,
            anon = anon,
            "🎁 Matching deposit accepted"
        );
        Ok(())
    }

    /// Donate to a proposal within a round. Accepted at any height; only
    /// claiming is height-gated. The quadratic weight grows by the
    /// fixed-point square root of this donation alone.
    pub async fn donate(
        &self,
        caller: AccountAddress,
        proposal_id: ProposalId,
        token: TokenId,
        amount: TokenAmount,
        round_id: RoundId,
    ) -> Result<()> {
        let round = self.rounds.get_round(round_id).await?;
        self.proposals.get_proposal(proposal_id).await?;

        if !round.proposals.contains(&proposal_id) {
            return Err(FundingError::ProposalNotInRound {
                round_id,
                proposal_id,
            });
        }
        if token != round.donation_token {
            return Err(FundingError::TokenMismatch {
                expected: round.donation_token,
                actual: token,
            });
        }

        // Compute the post-donation aggregate under the write lock, then
        // move funds, then commit. A failed transfer commits nothing.
        let mut aggregates = self.aggregates.write().await;
        let current = aggregates
            .get(&(round_id, proposal_id))
            .copied()
            .unwrap_or_default();

        let funding_amount = current
            .funding_amount
            .checked_add(amount)
            .ok_or(FundingError::Overflow)?;
        let weight = current
            .weight
            .checked_add(donation_weight(amount.to_base_units()))
            .ok_or(FundingError::Overflow)?;

        self.transfers
            .transfer(caller, AccountAddress::custodian(), token, amount)
            .await?;

        aggregates.insert(
            (round_id, proposal_id),
            ContributionAggregate {
                funding_amount,
                weight,
            },
        );

        info!(
            round_id = round_id,
            proposal_id = proposal_id,
            donor = %caller,
            amount = %amount,
            funding_amount = %funding_amount,
            weight = weight,
            "💝 Donation recorded"
        );
        Ok(())
    }

    /// Aggregate for one (round, proposal) pair; zero if nothing donated.
    pub async fn aggregate(
        &self,
        round_id: RoundId,
        proposal_id: ProposalId,
    ) -> ContributionAggregate {
        let aggregates = self.aggregates.read().await;
        aggregates
            .get(&(round_id, proposal_id))
            .copied()
            .unwrap_or_default()
    }

    /// Aggregates for a round's proposals, in the given order. One read of
    /// the shared map, so settlement sees a consistent snapshot.
    pub async fn aggregates_for(
        &self,
        round_id: RoundId,
        proposal_ids: &[ProposalId],
    ) -> Vec<ContributionAggregate> {
        let aggregates = self.aggregates.read().await;
        proposal_ids
            .iter()
            .map(|proposal_id| {
                aggregates
                    .get(&(round_id, *proposal_id))
                    .copied()
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Matching deposits recorded for a round, oldest first.
    pub async fn match_history(&self, round_id: RoundId) -> Vec<MatchRecord> {
        let history = self.match_history.read().await;
        history
            .iter()
            .filter(|record| record.round_id == round_id)
            .cloned()
            .collect()
    }
}
