use crate::models::UserAccount;
use rust_decimal::Decimal;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, virtual_balance, created_at, updated_at";

/// Repository for user account data access
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new AccountRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account with an opening balance
    pub async fn create(&self, email: &str, virtual_balance: Decimal) -> SqlxResult<UserAccount> {
        sqlx::query_as::<_, UserAccount>(&format!(
            r#"
            INSERT INTO users (email, virtual_balance)
            VALUES ($1, $2)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(virtual_balance)
        .fetch_one(&self.pool)
        .await
    }

    /// Find an account by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<UserAccount>> {
        sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// All accounts
    pub async fn find_all(&self) -> SqlxResult<Vec<UserAccount>> {
        sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
    }
}
