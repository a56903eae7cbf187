use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Playing position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Gk,
    Def,
    Mid,
    Fwd,
}

impl Position {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_uppercase().as_str() {
            "GK" => Ok(Position::Gk),
            "DEF" => Ok(Position::Def),
            "MID" => Ok(Position::Mid),
            "FWD" => Ok(Position::Fwd),
            _ => Err(format!("Invalid position: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Gk => "GK",
            Position::Def => "DEF",
            Position::Mid => "MID",
            Position::Fwd => "FWD",
        }
    }
}

/// Player model: one tradeable share issue
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub team: String,
    pub position: String, // Stored as TEXT, use Position enum for type safety
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal, // NUMERIC(14, 4)
    #[serde(with = "rust_decimal::serde::float")]
    pub price_cap: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_floor: Decimal,
    pub total_shares: i64,
    pub available_shares: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Player {
    /// Check the price band and supply invariants
    pub fn validate(&self) -> Result<(), String> {
        if self.total_shares <= 0 {
            return Err("Total shares must be greater than zero".to_string());
        }
        if self.available_shares < 0 || self.available_shares > self.total_shares {
            return Err(format!(
                "Available shares {} outside 0..={}",
                self.available_shares, self.total_shares
            ));
        }
        if self.price_floor <= Decimal::ZERO || self.price_floor > self.price_cap {
            return Err("Price floor must be positive and not above the cap".to_string());
        }
        if self.current_price < self.price_floor || self.current_price > self.price_cap {
            return Err(format!(
                "Current price {} outside [{}, {}]",
                self.current_price, self.price_floor, self.price_cap
            ));
        }
        Ok(())
    }
}

/// Values for issuing a new player
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub name: String,
    pub team: String,
    pub position: Position,
    pub base_price: Decimal,
    pub price_cap: Decimal,
    pub price_floor: Decimal,
    pub total_shares: i64,
}
