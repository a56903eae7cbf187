//! PostgreSQL-backed [`MarketStore`].

use super::store::{HoldingChange, MarketStore, TradeCommit};
use super::trade_repository::TRADE_COLUMNS;
use super::{AccountRepository, HoldingRepository, PlayerRepository, TradeRepository};
use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{Holding, NewPlayer, Player, Trade, UserAccount};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

/// Market store running each trade commit in one database transaction
pub struct PgMarketStore {
    pool: PgPool,
    players: PlayerRepository,
    accounts: AccountRepository,
    holdings: HoldingRepository,
    trades: TradeRepository,
}

impl PgMarketStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            players: PlayerRepository::new(pool.clone()),
            accounts: AccountRepository::new(pool.clone()),
            holdings: HoldingRepository::new(pool.clone()),
            trades: TradeRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Roll back and report which row moved under us
async fn abort(tx: Transaction<'_, Postgres>, what: &str) -> RepositoryResult<Trade> {
    tx.rollback().await?;
    warn!("Trade commit conflicted on {}", what);
    Err(RepositoryError::Conflict(format!("{} changed since it was read", what)))
}

#[async_trait]
impl MarketStore for PgMarketStore {
    async fn get_player(&self, id: Uuid) -> RepositoryResult<Option<Player>> {
        Ok(self.players.find_by_id(id).await?)
    }

    async fn get_account(&self, id: Uuid) -> RepositoryResult<Option<UserAccount>> {
        Ok(self.accounts.find_by_id(id).await?)
    }

    async fn get_holding(&self, user_id: Uuid, player_id: Uuid) -> RepositoryResult<Option<Holding>> {
        Ok(self.holdings.find(user_id, player_id).await?)
    }

    async fn commit_trade(&self, commit: TradeCommit) -> RepositoryResult<Trade> {
        let TradeCommit {
            trade,
            player,
            balance,
            holding,
        } = commit;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE players
            SET current_price = $2, available_shares = $3, updated_at = NOW()
            WHERE id = $1 AND current_price = $4 AND available_shares = $5
            "#,
        )
        .bind(player.player_id)
        .bind(player.new_price)
        .bind(player.new_available)
        .bind(player.expected_price)
        .bind(player.expected_available)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return abort(tx, "player").await;
        }

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET virtual_balance = $2, updated_at = NOW()
            WHERE id = $1 AND virtual_balance = $3
            "#,
        )
        .bind(balance.user_id)
        .bind(balance.new_balance)
        .bind(balance.expected_balance)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return abort(tx, "account balance").await;
        }

        let updated = match &holding {
            HoldingChange::Create {
                user_id,
                player_id,
                shares,
                average_buy_price,
            } => {
                sqlx::query(
                    r#"
                    INSERT INTO holdings (user_id, player_id, shares, average_buy_price)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (user_id, player_id) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(player_id)
                .bind(shares)
                .bind(average_buy_price)
                .execute(&mut *tx)
                .await?
            }
            HoldingChange::Update {
                user_id,
                player_id,
                expected_shares,
                shares,
                average_buy_price,
            } => {
                sqlx::query(
                    r#"
                    UPDATE holdings
                    SET shares = $3, average_buy_price = $4, updated_at = NOW()
                    WHERE user_id = $1 AND player_id = $2 AND shares = $5
                    "#,
                )
                .bind(user_id)
                .bind(player_id)
                .bind(shares)
                .bind(average_buy_price)
                .bind(expected_shares)
                .execute(&mut *tx)
                .await?
            }
            HoldingChange::Delete {
                user_id,
                player_id,
                expected_shares,
            } => {
                sqlx::query(
                    "DELETE FROM holdings WHERE user_id = $1 AND player_id = $2 AND shares = $3",
                )
                .bind(user_id)
                .bind(player_id)
                .bind(expected_shares)
                .execute(&mut *tx)
                .await?
            }
        };

        if updated.rows_affected() == 0 {
            return abort(tx, "holding").await;
        }

        let recorded = sqlx::query_as::<_, Trade>(&format!(
            r#"
            INSERT INTO trades (user_id, player_id, side, shares, price_per_share, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TRADE_COLUMNS}
            "#
        ))
        .bind(trade.user_id)
        .bind(trade.player_id)
        .bind(trade.side.as_str())
        .bind(trade.shares)
        .bind(trade.price_per_share)
        .bind(trade.total_amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(trade_id = %recorded.id, "Trade committed");
        Ok(recorded)
    }

    async fn list_players(&self) -> RepositoryResult<Vec<Player>> {
        Ok(self.players.find_all().await?)
    }

    async fn insert_player(&self, player: NewPlayer) -> RepositoryResult<Player> {
        Ok(self.players.create(&player).await?)
    }

    async fn insert_account(&self, email: &str, balance: Decimal) -> RepositoryResult<UserAccount> {
        Ok(self.accounts.create(email, balance).await?)
    }

    async fn list_accounts(&self) -> RepositoryResult<Vec<UserAccount>> {
        Ok(self.accounts.find_all().await?)
    }

    async fn list_holdings(&self) -> RepositoryResult<Vec<Holding>> {
        Ok(self.holdings.find_all().await?)
    }

    async fn list_holdings_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Holding>> {
        Ok(self.holdings.find_by_user(user_id).await?)
    }

    async fn list_trades_for_user(&self, user_id: Uuid, limit: i64) -> RepositoryResult<Vec<Trade>> {
        Ok(self.trades.find_by_user(user_id, limit).await?)
    }

    async fn list_trades_for_player(&self, player_id: Uuid, limit: i64) -> RepositoryResult<Vec<Trade>> {
        Ok(self.trades.find_by_player(player_id, limit).await?)
    }
}
