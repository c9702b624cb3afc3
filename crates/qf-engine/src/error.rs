use crate::types::{ProposalId, RoundId, TokenId};
use thiserror::Error;

/// Settlement operation result type
pub type Result<T> = std::result::Result<T, FundingError>;

/// Closed set of settlement errors. Every operation returns one of these
/// to its immediate caller; nothing is retried or swallowed internally.
#[derive(Debug, Error)]
pub enum FundingError {
    #[error("Invalid round window: start {start} end {end} at height {height}")]
    InvalidWindow { start: u64, end: u64, height: u64 },

    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("Proposal {proposal_id} is not part of round {round_id}")]
    ProposalNotInRound {
        round_id: RoundId,
        proposal_id: ProposalId,
    },

    #[error("Caller is not the required admin or owner")]
    Unauthorized,

    #[error("Token mismatch: expected {expected}, got {actual}")]
    TokenMismatch { expected: TokenId, actual: TokenId },

    #[error("Round {round_id} has not ended: height {height}, ends at {end}")]
    RoundNotEnded {
        round_id: RoundId,
        height: u64,
        end: u64,
    },

    #[error("Already claimed: round {round_id}, proposal {proposal_id}")]
    AlreadyClaimed {
        round_id: RoundId,
        proposal_id: ProposalId,
    },

    #[error("Token transfer failed: {0}")]
    TransferFailed(String),

    #[error("Arithmetic overflow in settlement state")]
    Overflow,
}

impl From<qf_math::MathError> for FundingError {
    fn from(_: qf_math::MathError) -> Self {
        FundingError::Overflow
    }
}
