/*!
# Quadratic Funding Settlement Engine

A ledger for time-boxed funding rounds: an admin opens a round, anyone
registers proposals, donors contribute per proposal, backers fill a
round-level matching pool, and after the round closes each proposal is paid
its donations plus a quadratic-funding match, exactly once.

## Core Principles

- **Deterministic settlement**: all match math is integer-only
  (`qf-math`), so independent replays agree on every payout.
- **Exactly-once payout**: the claim record's settled flag is re-checked
  inside each claim, which is atomic against competing claims.
- **All-or-nothing mutations**: a failed token transfer aborts the
  operation before any aggregate is committed.
- **Closed error surface**: every operation returns a tagged
  [`FundingError`], never an ambient failure.

## Module Structure

- **types**: amounts, principals, token identities
- **chain**: chain-height oracle abstraction
- **custody**: token transfer collaborator and in-memory reference ledger
- **rounds** / **proposals**: the two registries and their authorization
- **ledger**: donations, matching deposits, running aggregates
- **claims**: height-gated, one-shot settlement
*/

pub mod chain;
pub mod claims;
pub mod custody;
pub mod error;
pub mod ledger;
pub mod proposals;
pub mod rounds;
pub mod types;

pub use chain::{BlockClock, HeightOracle};
pub use claims::{ClaimSettlement, MatchStatus};
pub use custody::{MemoryTokenLedger, TokenTransfer, TransferRecord};
pub use error::{FundingError, Result};
pub use ledger::{ContributionAggregate, ContributionLedger, MatchRecord};
pub use proposals::{Proposal, ProposalRegistry, ProposalUpdate};
pub use rounds::{ProposalReplacement, Round, RoundParams, RoundRegistry, RoundUpdate};
pub use types::{AccountAddress, ProposalId, RoundId, TokenAmount, TokenId};

use std::sync::Arc;

/// The assembled engine: registries, contribution ledger and settlement
/// wired to one transfer service and one height oracle.
pub struct FundingEngine {
    pub rounds: Arc<RoundRegistry>,
    pub proposals: Arc<ProposalRegistry>,
    pub ledger: Arc<ContributionLedger>,
    pub claims: Arc<ClaimSettlement>,
}

impl FundingEngine {
    pub fn new(transfers: Arc<dyn TokenTransfer>, chain: Arc<dyn HeightOracle>) -> Self {
        let rounds = Arc::new(RoundRegistry::new(chain.clone()));
        let proposals = Arc::new(ProposalRegistry::new());
        let ledger = Arc::new(ContributionLedger::new(
            rounds.clone(),
            proposals.clone(),
            transfers.clone(),
            chain.clone(),
        ));
        let claims = Arc::new(ClaimSettlement::new(
            rounds.clone(),
            proposals.clone(),
            ledger.clone(),
            transfers,
            chain,
        ));

        Self {
            rounds,
            proposals,
            ledger,
            claims,
        }
    }
}
