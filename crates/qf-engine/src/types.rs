use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a funding round, assigned sequentially from 0.
pub type RoundId = u64;

/// Identifier of a proposal, assigned sequentially from 0 across all rounds.
pub type ProposalId = u64;

/// A token amount in indivisible base units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TokenAmount(u64);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    pub fn to_base_units(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated principal: round admin, proposal owner, donor or
/// matching-pool contributor. Opaque to the engine; supplied by the
/// execution environment with every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The engine's custodial account. Donations and matching deposits are
    /// held here until a claim pays them out.
    pub fn custodian() -> Self {
        Self([0xFF; 32])
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

/// Identity of a fungible token. Each round configures one donation token
/// and one matching token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId([u8; 32]);

impl TokenId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token:{}", hex::encode(&self.0[..8]))
    }
}
