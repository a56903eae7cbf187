//! In-process [`MarketStore`] used by tests and `STORAGE_BACKEND=memory` runs.

use super::store::{HoldingChange, MarketStore, TradeCommit};
use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{Holding, NewPlayer, Player, Trade, UserAccount};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MarketTables {
    players: HashMap<Uuid, Player>,
    accounts: HashMap<Uuid, UserAccount>,
    holdings: HashMap<(Uuid, Uuid), Holding>,
    trades: Vec<Trade>,
}

impl MarketTables {
    /// Check every expected value of `commit` against the current rows
    fn verify(&self, commit: &TradeCommit) -> RepositoryResult<()> {
        let player = self
            .players
            .get(&commit.player.player_id)
            .ok_or_else(|| RepositoryError::NotFound("player".to_string()))?;
        if player.current_price != commit.player.expected_price
            || player.available_shares != commit.player.expected_available
        {
            return Err(RepositoryError::Conflict("player changed since it was read".to_string()));
        }

        if commit.player.new_available < 0 || commit.player.new_available > player.total_shares {
            return Err(RepositoryError::ConstraintViolation(format!(
                "available_shares {} outside 0..={}",
                commit.player.new_available, player.total_shares
            )));
        }
        if commit.player.new_price < player.price_floor || commit.player.new_price > player.price_cap {
            return Err(RepositoryError::ConstraintViolation(format!(
                "current_price {} outside [{}, {}]",
                commit.player.new_price, player.price_floor, player.price_cap
            )));
        }

        let account = self
            .accounts
            .get(&commit.balance.user_id)
            .ok_or_else(|| RepositoryError::NotFound("user".to_string()))?;
        if account.virtual_balance != commit.balance.expected_balance {
            return Err(RepositoryError::Conflict(
                "account balance changed since it was read".to_string(),
            ));
        }

        if commit.balance.new_balance < Decimal::ZERO {
            return Err(RepositoryError::ConstraintViolation(
                "virtual_balance must not be negative".to_string(),
            ));
        }

        let holding_matches = match &commit.holding {
            HoldingChange::Create { user_id, player_id, .. } => {
                !self.holdings.contains_key(&(*user_id, *player_id))
            }
            HoldingChange::Update { user_id, player_id, expected_shares, .. }
            | HoldingChange::Delete { user_id, player_id, expected_shares } => self
                .holdings
                .get(&(*user_id, *player_id))
                .is_some_and(|h| h.shares == *expected_shares),
        };
        if !holding_matches {
            return Err(RepositoryError::Conflict("holding changed since it was read".to_string()));
        }
        if !matches!(commit.holding, HoldingChange::Delete { .. })
            && commit.holding.resulting_shares() <= 0
        {
            return Err(RepositoryError::ConstraintViolation(
                "holding shares must be positive".to_string(),
            ));
        }

        Ok(())
    }

    fn apply(&mut self, commit: TradeCommit) -> Trade {
        let now = Utc::now().naive_utc();

        if let Some(player) = self.players.get_mut(&commit.player.player_id) {
            player.current_price = commit.player.new_price;
            player.available_shares = commit.player.new_available;
            player.updated_at = now;
        }

        if let Some(account) = self.accounts.get_mut(&commit.balance.user_id) {
            account.virtual_balance = commit.balance.new_balance;
            account.updated_at = now;
        }

        match commit.holding {
            HoldingChange::Create { user_id, player_id, shares, average_buy_price } => {
                self.holdings.insert(
                    (user_id, player_id),
                    Holding {
                        id: Uuid::new_v4(),
                        user_id,
                        player_id,
                        shares,
                        average_buy_price,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
            HoldingChange::Update { user_id, player_id, shares, average_buy_price, .. } => {
                if let Some(holding) = self.holdings.get_mut(&(user_id, player_id)) {
                    holding.shares = shares;
                    holding.average_buy_price = average_buy_price;
                    holding.updated_at = now;
                }
            }
            HoldingChange::Delete { user_id, player_id, .. } => {
                self.holdings.remove(&(user_id, player_id));
            }
        }

        let trade = commit.trade.into_trade();
        self.trades.push(trade.clone());
        trade
    }
}

/// Market store keeping every table behind a single lock
#[derive(Default)]
pub struct InMemoryMarketStore {
    tables: RwLock<MarketTables>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger entries
    pub async fn trade_count(&self) -> usize {
        self.tables.read().await.trades.len()
    }
}

fn recent_first(mut trades: Vec<Trade>, limit: i64) -> Vec<Trade> {
    trades.reverse();
    trades.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
    trades
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn get_player(&self, id: Uuid) -> RepositoryResult<Option<Player>> {
        Ok(self.tables.read().await.players.get(&id).cloned())
    }

    async fn get_account(&self, id: Uuid) -> RepositoryResult<Option<UserAccount>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn get_holding(&self, user_id: Uuid, player_id: Uuid) -> RepositoryResult<Option<Holding>> {
        Ok(self.tables.read().await.holdings.get(&(user_id, player_id)).cloned())
    }

    async fn commit_trade(&self, commit: TradeCommit) -> RepositoryResult<Trade> {
        let mut tables = self.tables.write().await;
        tables.verify(&commit)?;
        Ok(tables.apply(commit))
    }

    async fn list_players(&self) -> RepositoryResult<Vec<Player>> {
        let mut players: Vec<Player> = self.tables.read().await.players.values().cloned().collect();
        players.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(players)
    }

    async fn insert_player(&self, player: NewPlayer) -> RepositoryResult<Player> {
        let now = Utc::now().naive_utc();
        let player = Player {
            id: Uuid::new_v4(),
            name: player.name,
            team: player.team,
            position: player.position.as_str().to_string(),
            base_price: player.base_price,
            current_price: player.base_price,
            price_cap: player.price_cap,
            price_floor: player.price_floor,
            total_shares: player.total_shares,
            available_shares: player.total_shares,
            created_at: now,
            updated_at: now,
        };
        player.validate().map_err(RepositoryError::ConstraintViolation)?;

        self.tables.write().await.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn insert_account(&self, email: &str, balance: Decimal) -> RepositoryResult<UserAccount> {
        if balance < Decimal::ZERO {
            return Err(RepositoryError::ConstraintViolation(
                "virtual_balance must not be negative".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        if tables.accounts.values().any(|a| a.email == email) {
            return Err(RepositoryError::Duplicate(format!("email {} already registered", email)));
        }

        let now = Utc::now().naive_utc();
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            virtual_balance: balance,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn list_accounts(&self) -> RepositoryResult<Vec<UserAccount>> {
        let mut accounts: Vec<UserAccount> =
            self.tables.read().await.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }

    async fn list_holdings(&self) -> RepositoryResult<Vec<Holding>> {
        Ok(self.tables.read().await.holdings.values().cloned().collect())
    }

    async fn list_holdings_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Holding>> {
        let mut holdings: Vec<Holding> = self
            .tables
            .read()
            .await
            .holdings
            .values()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        holdings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(holdings)
    }

    async fn list_trades_for_user(&self, user_id: Uuid, limit: i64) -> RepositoryResult<Vec<Trade>> {
        let trades = self
            .tables
            .read()
            .await
            .trades
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(recent_first(trades, limit))
    }

    async fn list_trades_for_player(&self, player_id: Uuid, limit: i64) -> RepositoryResult<Vec<Trade>> {
        let trades = self
            .tables
            .read()
            .await
            .trades
            .iter()
            .filter(|t| t.player_id == player_id)
            .cloned()
            .collect();
        Ok(recent_first(trades, limit))
    }
}
