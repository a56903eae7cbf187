use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Convert from database / request string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            _ => Err(format!("Invalid trade side: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only trade ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: Uuid,
    pub user_id: Uuid,
    pub player_id: Uuid,
    pub side: String, // Stored as TEXT, use TradeSide enum for type safety
    pub shares: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_share: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub created_at: NaiveDateTime,
}

/// Trade ledger entry about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrade {
    pub user_id: Uuid,
    pub player_id: Uuid,
    pub side: TradeSide,
    pub shares: i64,
    pub price_per_share: Decimal,
    pub total_amount: Decimal,
}

impl NewTrade {
    /// Materialize the ledger row with a fresh id and timestamp
    pub fn into_trade(self) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            player_id: self.player_id,
            side: self.side.as_str().to_string(),
            shares: self.shares,
            price_per_share: self.price_per_share,
            total_amount: self.total_amount,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_side_conversion() {
        assert_eq!(TradeSide::from_str("BUY").unwrap(), TradeSide::Buy);
        assert_eq!(TradeSide::from_str(" sell ").unwrap(), TradeSide::Sell);
        assert!(TradeSide::from_str("short").is_err());
        assert_eq!(TradeSide::Sell.to_string(), "sell");
    }
}
