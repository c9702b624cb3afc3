use crate::error::{FundingError, Result};
use crate::types::{AccountAddress, TokenAmount, TokenId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Record of an executed transfer, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub token: TokenId,
    pub amount: TokenAmount,
}

/// Token transfer collaborator. The engine decides how much moves and
/// between whom; the implementation executes or fails the transfer. A
/// failure aborts the requesting operation before any aggregate is
/// committed.
#[async_trait]
pub trait TokenTransfer: Send + Sync {
    async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        token: TokenId,
        amount: TokenAmount,
    ) -> Result<()>;

    async fn balance_of(&self, account: AccountAddress, token: TokenId) -> Result<TokenAmount>;
}

type BalanceMap = HashMap<(AccountAddress, TokenId), TokenAmount>;

/// In-memory token ledger: per-(account, token) balances with a transfer
/// history. Reference implementation of [`TokenTransfer`].
pub struct MemoryTokenLedger {
    balances: RwLock<BalanceMap>,
    history: RwLock<Vec<TransferRecord>>,
}

impl MemoryTokenLedger {
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Credit an account out of thin air. Test funding only.
    pub async fn mint(&self, account: AccountAddress, token: TokenId, amount: TokenAmount) {
        let mut balances = self.balances.write().await;
        let entry = balances.entry((account, token)).or_insert(TokenAmount::ZERO);
        *entry = entry.saturating_add(amount);

        info!(
            account = %account,
            token = %token,
            amount = %amount,
            "🪙 Minted"
        );
    }

    pub async fn history(&self) -> Vec<TransferRecord> {
        let history = self.history.read().await;
        history.clone()
    }
}

impl Default for MemoryTokenLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenTransfer for MemoryTokenLedger {
    async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        token: TokenId,
        amount: TokenAmount,
    ) -> Result<()> {
        if amount == TokenAmount::ZERO {
            return Ok(());
        }

        if from == to {
            return Err(FundingError::TransferFailed(
                "cannot transfer to the same account".to_string(),
            ));
        }

        // One write lock across debit and credit keeps the pair atomic.
        let mut balances = self.balances.write().await;

        let from_balance = balances
            .get(&(from, token))
            .copied()
            .unwrap_or(TokenAmount::ZERO);
        let new_from = from_balance.checked_sub(amount).ok_or_else(|| {
            FundingError::TransferFailed(format!(
                "insufficient balance: {} has {}, needs {}",
                from, from_balance, amount
            ))
        })?;

        let to_balance = balances
            .get(&(to, token))
            .copied()
            .unwrap_or(TokenAmount::ZERO);
        let new_to = to_balance
            .checked_add(amount)
            .ok_or(FundingError::Overflow)?;

        balances.insert((from, token), new_from);
        balances.insert((to, token), new_to);

        let mut history = self.history.write().await;
        history.push(TransferRecord {
            from,
            to,
            token,
            amount,
        });

        info!(
            from = %from,
            to = %to,
            token = %token,
            amount = %amount,
            "💸 Transfer executed"
        );
        Ok(())
    }

    async fn balance_of(&self, account: AccountAddress, token: TokenId) -> Result<TokenAmount> {
        let balances = self.balances.read().await;
        Ok(balances
            .get(&(account, token))
            .copied()
            .unwrap_or(TokenAmount::ZERO))
    }
}
