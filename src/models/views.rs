//! Read-side views computed from players, accounts and holdings.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::Player;

/// Player fields shown next to a holding
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub team: String,
    pub position: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            team: player.team.clone(),
            position: player.position.clone(),
            current_price: player.current_price,
        }
    }
}

/// One holding valued at the current market price
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntry {
    pub id: Uuid,
    pub player: PlayerSummary,
    pub shares: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_buy_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost_basis: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl_percent: Decimal,
}

/// Totals across a user's holdings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub virtual_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub total_holdings: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub portfolio_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost_basis: Decimal,
    #[serde(rename = "totalPnL", with = "rust_decimal::serde::float")]
    pub total_pnl: Decimal,
    #[serde(rename = "totalPnLPercent", with = "rust_decimal::serde::float")]
    pub total_pnl_percent: Decimal,
}

/// A user's portfolio
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub entries: Vec<PortfolioEntry>,
    pub summary: PortfolioSummary,
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub virtual_balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub portfolio_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub holdings_count: usize,
}
