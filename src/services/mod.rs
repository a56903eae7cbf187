pub mod audit;
pub mod leaderboard_service;
pub mod market_service;
pub mod portfolio_service;
pub mod trade_service;

pub use audit::AuditTrailService;
pub use leaderboard_service::LeaderboardService;
pub use market_service::{MarketService, PlayerIssue};
pub use portfolio_service::PortfolioService;
pub use trade_service::{plan_trade, TradeReceipt, TradeRequest, TradeService};
