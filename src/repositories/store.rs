//! Storage boundary used by the trading services.
//!
//! A [`TradeCommit`] carries both the new values and the values the caller read
//! before pricing. Stores apply it only if every expected value still matches,
//! as one atomic unit, and report [`RepositoryError::Conflict`] otherwise.

use crate::error::RepositoryResult;
use crate::models::{Holding, NewPlayer, NewTrade, Player, Trade, UserAccount};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

#[cfg(doc)]
use crate::error::RepositoryError;

/// New price and supply for the traded player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerUpdate {
    pub player_id: Uuid,
    pub expected_price: Decimal,
    pub expected_available: i64,
    pub new_price: Decimal,
    pub new_available: i64,
}

/// New balance for the trading user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub user_id: Uuid,
    pub expected_balance: Decimal,
    pub new_balance: Decimal,
}

/// What happens to the (user, player) holding row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingChange {
    /// First buy; no row may exist yet
    Create {
        user_id: Uuid,
        player_id: Uuid,
        shares: i64,
        average_buy_price: Decimal,
    },
    Update {
        user_id: Uuid,
        player_id: Uuid,
        expected_shares: i64,
        shares: i64,
        average_buy_price: Decimal,
    },
    /// Sell of the whole position
    Delete {
        user_id: Uuid,
        player_id: Uuid,
        expected_shares: i64,
    },
}

impl HoldingChange {
    /// Shares held after the change
    pub fn resulting_shares(&self) -> i64 {
        match self {
            HoldingChange::Create { shares, .. } | HoldingChange::Update { shares, .. } => *shares,
            HoldingChange::Delete { .. } => 0,
        }
    }
}

/// Every write one trade settles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeCommit {
    pub trade: NewTrade,
    pub player: PlayerUpdate,
    pub balance: BalanceUpdate,
    pub holding: HoldingChange,
}

/// Persistence for players, accounts, holdings and the trade ledger
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn get_player(&self, id: Uuid) -> RepositoryResult<Option<Player>>;

    async fn get_account(&self, id: Uuid) -> RepositoryResult<Option<UserAccount>>;

    async fn get_holding(&self, user_id: Uuid, player_id: Uuid) -> RepositoryResult<Option<Holding>>;

    /// Apply all writes of a trade atomically, or none of them.
    async fn commit_trade(&self, commit: TradeCommit) -> RepositoryResult<Trade>;

    /// All players ordered by name
    async fn list_players(&self) -> RepositoryResult<Vec<Player>>;

    async fn insert_player(&self, player: NewPlayer) -> RepositoryResult<Player>;

    async fn insert_account(&self, email: &str, balance: Decimal) -> RepositoryResult<UserAccount>;

    async fn list_accounts(&self) -> RepositoryResult<Vec<UserAccount>>;

    async fn list_holdings(&self) -> RepositoryResult<Vec<Holding>>;

    async fn list_holdings_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Holding>>;

    /// Most recent first
    async fn list_trades_for_user(&self, user_id: Uuid, limit: i64) -> RepositoryResult<Vec<Trade>>;

    /// Most recent first
    async fn list_trades_for_player(&self, player_id: Uuid, limit: i64) -> RepositoryResult<Vec<Trade>>;
}
