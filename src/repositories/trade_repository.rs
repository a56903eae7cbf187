use crate::models::Trade;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

pub(crate) const TRADE_COLUMNS: &str =
    "id, user_id, player_id, side, shares, price_per_share, total_amount, created_at";

/// Repository for the trade ledger (read side; inserts happen inside trade commits)
pub struct TradeRepository {
    pool: PgPool,
}

impl TradeRepository {
    /// Create a new TradeRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recent trades of a user
    pub async fn find_by_user(&self, user_id: Uuid, limit: i64) -> SqlxResult<Vec<Trade>> {
        sqlx::query_as::<_, Trade>(&format!(
            r#"
            SELECT {TRADE_COLUMNS}
            FROM trades
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Most recent trades in a player
    pub async fn find_by_player(&self, player_id: Uuid, limit: i64) -> SqlxResult<Vec<Trade>> {
        sqlx::query_as::<_, Trade>(&format!(
            r#"
            SELECT {TRADE_COLUMNS}
            FROM trades
            WHERE player_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2
            "#
        ))
        .bind(player_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
