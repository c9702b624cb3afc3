use crate::chain::HeightOracle;
use crate::custody::TokenTransfer;
use crate::error::{FundingError, Result};
use crate::ledger::ContributionLedger;
use crate::proposals::ProposalRegistry;
use crate::rounds::{Round, RoundRegistry};
use crate::types::{AccountAddress, ProposalId, RoundId, TokenAmount, TokenId};
use qf_math::{match_share, quadratic_score, total_score};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Match status for a (round, proposal) pair. Before settlement the
/// amounts are a live preview; once `claimed` they are frozen forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub claimed: bool,
    pub funding_amount: TokenAmount,
    pub match_amount: TokenAmount,
}

/// Pays out each proposal exactly once after its round closes.
///
/// The claim map is the only defense the engine needs against competing
/// claim transactions in one batch: the settled flag is re-checked under
/// the map's write lock, which is held across compute, transfer and
/// commit, so the second claim always observes `AlreadyClaimed`.
pub struct ClaimSettlement {
    rounds: Arc<RoundRegistry>,
    proposals: Arc<ProposalRegistry>,
    ledger: Arc<ContributionLedger>,
    transfers: Arc<dyn TokenTransfer>,
    chain: Arc<dyn HeightOracle>,
    claims: RwLock<HashMap<(RoundId, ProposalId), MatchStatus>>,
}

impl ClaimSettlement {
    pub fn new(
        rounds: Arc<RoundRegistry>,
        proposals: Arc<ProposalRegistry>,
        ledger: Arc<ContributionLedger>,
        transfers: Arc<dyn TokenTransfer>,
        chain: Arc<dyn HeightOracle>,
    ) -> Self {
        Self {
            rounds,
            proposals,
            ledger,
            transfers,
            chain,
            claims: RwLock::new(HashMap::new()),
        }
    }

    /// Recompute one proposal's funding and match from the current
    /// aggregates. Pure read; identical output for identical aggregates.
    async fn compute_match(
        &self,
        round_id: RoundId,
        round: &Round,
        proposal_id: ProposalId,
    ) -> Result<(TokenAmount, TokenAmount)> {
        let position = round
            .proposals
            .iter()
            .position(|id| *id == proposal_id)
            .ok_or(FundingError::ProposalNotInRound {
                round_id,
                proposal_id,
            })?;

        let aggregates = self.ledger.aggregates_for(round_id, &round.proposals).await;
        let weights: Vec<u64> = aggregates.iter().map(|a| a.weight).collect();

        let total = total_score(&weights)?;
        let share = match_share(
            quadratic_score(weights[position]),
            total,
            round.matching_pool.to_base_units(),
        )?;

        Ok((
            aggregates[position].funding_amount,
            TokenAmount::from_base_units(share),
        ))
    }

    /// Inspect a proposal's match without settling anything. Settled pairs
    /// report their frozen amounts; open pairs report a live preview
    /// against the current aggregates and pool.
    pub async fn get_match(
        &self,
        round_id: RoundId,
        proposal_id: ProposalId,
    ) -> Result<MatchStatus> {
        {
            let claims = self.claims.read().await;
            if let Some(settled) = claims.get(&(round_id, proposal_id)) {
                return Ok(*settled);
            }
        }

        let round = self.rounds.get_round(round_id).await?;
        self.proposals.get_proposal(proposal_id).await?;
        let (funding_amount, match_amount) =
            self.compute_match(round_id, &round, proposal_id).await?;

        Ok(MatchStatus {
            claimed: false,
            funding_amount,
            match_amount,
        })
    }

    /// Settle one proposal: freeze its amounts and pay the owner. Succeeds
    /// at most once per (round, proposal) pair.
    pub async fn claim_single(
        &self,
        caller: AccountAddress,
        round_id: RoundId,
        proposal_id: ProposalId,
        token: TokenId,
    ) -> Result<()> {
        // Held until the claim record is committed.
        let mut claims = self.claims.write().await;

        let round = self.rounds.get_round(round_id).await?;

        let height = self.chain.current_height();
        if height <= round.end_at {
            return Err(FundingError::RoundNotEnded {
                round_id,
                height,
                end: round.end_at,
            });
        }

        if claims.contains_key(&(round_id, proposal_id)) {
            return Err(FundingError::AlreadyClaimed {
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

        let proposal = self.proposals.get_proposal(proposal_id).await?;
        let (funding_amount, match_amount) =
            self.compute_match(round_id, &round, proposal_id).await?;
        let payout = funding_amount
            .checked_add(match_amount)
            .ok_or(FundingError::Overflow)?;

        self.transfers
            .transfer(AccountAddress::custodian(), proposal.owner, token, payout)
            .await?;

        claims.insert(
            (round_id, proposal_id),
            MatchStatus {
                claimed: true,
                funding_amount,
                match_amount,
            },
        );

        info!(
            round_id = round_id,
            proposal_id = proposal_id,
            caller = %caller,
            owner = %proposal.owner,
            funding_amount = %funding_amount,
            match_amount = %match_amount,
            payout = %payout,
            "🏆 Claim settled"
        );
        Ok(())
    }
}
