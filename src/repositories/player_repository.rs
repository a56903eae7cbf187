use crate::models::{NewPlayer, Player};
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

pub(crate) const PLAYER_COLUMNS: &str = "id, name, team, position, base_price, current_price, \
     price_cap, price_floor, total_shares, available_shares, created_at, updated_at";

/// Repository for player data access
pub struct PlayerRepository {
    pool: PgPool,
}

impl PlayerRepository {
    /// Create a new PlayerRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issue a new player with its full share supply available
    pub async fn create(&self, player: &NewPlayer) -> SqlxResult<Player> {
        sqlx::query_as::<_, Player>(&format!(
            r#"
            INSERT INTO players
                (name, team, position, base_price, current_price, price_cap, price_floor,
                 total_shares, available_shares)
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $7)
            RETURNING {PLAYER_COLUMNS}
            "#
        ))
        .bind(&player.name)
        .bind(&player.team)
        .bind(player.position.as_str())
        .bind(player.base_price)
        .bind(player.price_cap)
        .bind(player.price_floor)
        .bind(player.total_shares)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a player by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<Player>> {
        sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// All players ordered by name
    pub async fn find_all(&self) -> SqlxResult<Vec<Player>> {
        sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await
    }
}
