use crate::config::MarketConfig;
use crate::error::{AppError, AppResult};
use crate::models::{NewPlayer, Player, Position, Trade, UserAccount};
use crate::pricing::{round_currency, round_price};
use crate::repositories::MarketStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Most trades a history query returns
pub const MAX_HISTORY_LIMIT: i64 = 500;

/// Values for issuing a player onto the market
#[derive(Debug, Clone)]
pub struct PlayerIssue {
    pub name: String,
    pub team: String,
    pub position: String,
    pub base_price: Decimal,
    pub total_shares: Option<i64>,
}

/// Service for the player catalogue, accounts and trade history
pub struct MarketService {
    store: Arc<dyn MarketStore>,
    config: MarketConfig,
}

impl MarketService {
    pub fn new(store: Arc<dyn MarketStore>, config: MarketConfig) -> Self {
        Self { store, config }
    }

    /// All players, ordered by name
    pub async fn list_players(&self) -> AppResult<Vec<Player>> {
        Ok(self.store.list_players().await?)
    }

    pub async fn get_player(&self, player_id: Uuid) -> AppResult<Player> {
        self.store
            .get_player(player_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player {} not found", player_id)))
    }

    /// Issue a player: price bounds derive from the base price and every share starts available
    pub async fn issue_player(&self, issue: PlayerIssue) -> AppResult<Player> {
        let name = issue.name.trim();
        let team = issue.team.trim();
        if name.is_empty() || team.is_empty() {
            return Err(AppError::InvalidArgument(
                "Player name and team are required".to_string(),
            ));
        }

        let position = Position::from_str(&issue.position).map_err(AppError::InvalidArgument)?;

        let base_price = round_currency(issue.base_price);
        if base_price <= Decimal::ZERO {
            return Err(AppError::InvalidArgument(format!(
                "Base price must be positive, got {}",
                issue.base_price
            )));
        }

        let total_shares = issue.total_shares.unwrap_or(self.config.default_total_shares);
        if total_shares <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "Total shares must be positive, got {}",
                total_shares
            )));
        }

        let player = self
            .store
            .insert_player(NewPlayer {
                name: name.to_string(),
                team: team.to_string(),
                position,
                base_price,
                price_cap: round_price(base_price * self.config.cap_multiplier),
                price_floor: round_price(base_price * self.config.floor_multiplier),
                total_shares,
            })
            .await?;

        info!(
            "Issued player {} ({}, {}) at {} with {} shares",
            player.id, player.name, player.position, player.base_price, player.total_shares
        );

        Ok(player)
    }

    /// Open an account credited with `starting_balance` or the configured default
    pub async fn create_account(
        &self,
        email: &str,
        starting_balance: Option<Decimal>,
    ) -> AppResult<UserAccount> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::InvalidArgument(format!("Invalid email: {}", email)));
        }

        let balance = round_currency(starting_balance.unwrap_or(self.config.starting_balance));
        if balance < Decimal::ZERO {
            return Err(AppError::InvalidArgument(
                "Starting balance must not be negative".to_string(),
            ));
        }

        let account = self.store.insert_account(&email, balance).await?;
        info!("Created account {} with balance {}", account.id, account.virtual_balance);

        Ok(account)
    }

    pub async fn get_account(&self, user_id: Uuid) -> AppResult<UserAccount> {
        self.store
            .get_account(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Recent trades in a player, newest first
    pub async fn player_trades(&self, player_id: Uuid, limit: i64) -> AppResult<Vec<Trade>> {
        self.get_player(player_id).await?;
        Ok(self
            .store
            .list_trades_for_player(player_id, clamp_limit(limit))
            .await?)
    }

    /// Recent trades by a user, newest first
    pub async fn user_trades(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Trade>> {
        self.get_account(user_id).await?;
        Ok(self
            .store
            .list_trades_for_user(user_id, clamp_limit(limit))
            .await?)
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_HISTORY_LIMIT)
}
