//! Domain models for the share market.
//!
//! Database-backed entities plus the derived views served by the API.

pub mod account;
pub mod holding;
pub mod player;
pub mod trade;
pub mod views;

// Re-export all models for convenient access
pub use account::UserAccount;
pub use holding::{weighted_average_price, Holding};
pub use player::{NewPlayer, Player, Position};
pub use trade::{NewTrade, Trade, TradeSide};
pub use views::{LeaderboardEntry, PortfolioEntry, PortfolioSummary, PortfolioView, PlayerSummary};
