use crate::models::Holding;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

pub(crate) const HOLDING_COLUMNS: &str =
    "id, user_id, player_id, shares, average_buy_price, created_at, updated_at";

/// Repository for holding data access (read side; writes go through trade commits)
pub struct HoldingRepository {
    pool: PgPool,
}

impl HoldingRepository {
    /// Create a new HoldingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the holding of a user in a player
    pub async fn find(&self, user_id: Uuid, player_id: Uuid) -> SqlxResult<Option<Holding>> {
        sqlx::query_as::<_, Holding>(&format!(
            "SELECT {HOLDING_COLUMNS} FROM holdings WHERE user_id = $1 AND player_id = $2"
        ))
        .bind(user_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// All holdings of a user
    pub async fn find_by_user(&self, user_id: Uuid) -> SqlxResult<Vec<Holding>> {
        sqlx::query_as::<_, Holding>(&format!(
            "SELECT {HOLDING_COLUMNS} FROM holdings WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Every holding in the market
    pub async fn find_all(&self) -> SqlxResult<Vec<Holding>> {
        sqlx::query_as::<_, Holding>(&format!(
            "SELECT {HOLDING_COLUMNS} FROM holdings ORDER BY user_id, created_at"
        ))
        .fetch_all(&self.pool)
        .await
    }
}
