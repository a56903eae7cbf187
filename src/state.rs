//! Shared state handed to every HTTP handler.

use crate::config::AppConfig;
use crate::repositories::MarketStore;
use crate::services::{
    AuditTrailService, LeaderboardService, MarketService, PortfolioService, TradeService,
};
use crate::websocket::WebSocketServer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn MarketStore>,
    pub trades: Arc<TradeService>,
    pub market: Arc<MarketService>,
    pub portfolio: Arc<PortfolioService>,
    pub leaderboard: Arc<LeaderboardService>,
    pub feed: WebSocketServer,
}

impl AppState {
    /// Wire the services around `store`
    pub fn new(
        config: AppConfig,
        store: Arc<dyn MarketStore>,
        audit: Option<Arc<AuditTrailService>>,
    ) -> Self {
        let feed = WebSocketServer::new();

        let mut trades = TradeService::new(store.clone(), config.market.commit_retries)
            .with_feed(feed.clone());
        if let Some(audit) = audit {
            trades = trades.with_audit(audit);
        }

        Self {
            market: Arc::new(MarketService::new(store.clone(), config.market.clone())),
            portfolio: Arc::new(PortfolioService::new(store.clone())),
            leaderboard: Arc::new(LeaderboardService::new(store.clone())),
            trades: Arc::new(trades),
            config: Arc::new(config),
            store,
            feed,
        }
    }
}
