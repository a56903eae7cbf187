use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User account holding the virtual trading balance
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub virtual_balance: Decimal, // NUMERIC(16, 2)
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl UserAccount {
    /// Check whether the account can pay `amount`
    pub fn can_afford(&self, amount: Decimal) -> bool {
        self.virtual_balance >= amount
    }
}
