//! Trade orchestration.
//!
//! A trade is loaded, validated and priced by [`plan_trade`], then committed
//! through [`MarketStore::commit_trade`]. A commit that loses a race with another
//! trade is re-run from the load step, so validation always sees fresh state.

use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{
    weighted_average_price, Holding, NewTrade, Player, Trade, TradeSide, UserAccount,
};
use crate::pricing::{
    compute_buy_price, compute_sell_price, compute_trade_total, round_currency, round_price,
};
use crate::repositories::{BalanceUpdate, HoldingChange, MarketStore, PlayerUpdate, TradeCommit};
use crate::services::AuditTrailService;
use crate::websocket::WebSocketServer;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A validated order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeRequest {
    pub user_id: Uuid,
    pub player_id: Uuid,
    pub side: TradeSide,
    pub shares: i64,
}

/// Outcome of a committed trade
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub trade: Trade,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_change: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub updated_balance: Decimal,
    /// Shares the user holds in the player after the trade
    pub holding_shares: i64,
}

/// Round the engine's price to storage precision without leaving [floor, cap]
fn settle_price(price: Decimal, player: &Player) -> Decimal {
    round_price(price).max(player.price_floor).min(player.price_cap)
}

/// Validate `request` against freshly loaded state and build the commit that settles it.
pub fn plan_trade(
    request: &TradeRequest,
    player: &Player,
    account: &UserAccount,
    holding: Option<&Holding>,
) -> AppResult<TradeCommit> {
    if request.shares <= 0 {
        return Err(AppError::InvalidArgument(format!(
            "Shares must be a positive integer, got {}",
            request.shares
        )));
    }

    match request.side {
        TradeSide::Buy => plan_buy(request, player, account, holding),
        TradeSide::Sell => plan_sell(request, player, account, holding),
    }
}

fn plan_buy(
    request: &TradeRequest,
    player: &Player,
    account: &UserAccount,
    holding: Option<&Holding>,
) -> AppResult<TradeCommit> {
    // Supply is checked before pricing
    if request.shares > player.available_shares {
        return Err(AppError::InsufficientSupply(format!(
            "Requested {} shares, only {} available",
            request.shares, player.available_shares
        )));
    }

    let update = compute_buy_price(
        player.current_price,
        request.shares,
        player.total_shares,
        player.price_cap,
    )?;
    let price = settle_price(update.new_price, player);
    let total = round_currency(compute_trade_total(request.shares, price));

    if !account.can_afford(total) {
        return Err(AppError::InsufficientFunds(format!(
            "Required {}, available {}",
            total, account.virtual_balance
        )));
    }

    let holding = match holding {
        Some(h) => HoldingChange::Update {
            user_id: request.user_id,
            player_id: request.player_id,
            expected_shares: h.shares,
            shares: h.shares + request.shares,
            average_buy_price: weighted_average_price(
                h.shares,
                h.average_buy_price,
                request.shares,
                price,
            ),
        },
        None => HoldingChange::Create {
            user_id: request.user_id,
            player_id: request.player_id,
            shares: request.shares,
            average_buy_price: price,
        },
    };

    Ok(TradeCommit {
        trade: NewTrade {
            user_id: request.user_id,
            player_id: request.player_id,
            side: TradeSide::Buy,
            shares: request.shares,
            price_per_share: price,
            total_amount: total,
        },
        player: PlayerUpdate {
            player_id: player.id,
            expected_price: player.current_price,
            expected_available: player.available_shares,
            new_price: price,
            new_available: player.available_shares - request.shares,
        },
        balance: BalanceUpdate {
            user_id: account.id,
            expected_balance: account.virtual_balance,
            new_balance: account.virtual_balance - total,
        },
        holding,
    })
}

fn plan_sell(
    request: &TradeRequest,
    player: &Player,
    account: &UserAccount,
    holding: Option<&Holding>,
) -> AppResult<TradeCommit> {
    let held = holding.map(|h| h.shares).unwrap_or(0);
    let holding = match holding {
        Some(h) if h.shares >= request.shares => h,
        _ => {
            return Err(AppError::InsufficientHoldings(format!(
                "Requested {} shares, holding {}",
                request.shares, held
            )))
        }
    };

    let new_available = player.available_shares + request.shares;
    if new_available > player.total_shares {
        return Err(AppError::Internal(format!(
            "Selling {} shares would exceed total supply of player {}",
            request.shares, player.id
        )));
    }

    let update = compute_sell_price(
        player.current_price,
        request.shares,
        player.total_shares,
        player.price_floor,
    )?;
    let price = settle_price(update.new_price, player);
    let total = round_currency(compute_trade_total(request.shares, price));

    let remaining = holding.shares - request.shares;
    let holding = if remaining == 0 {
        HoldingChange::Delete {
            user_id: request.user_id,
            player_id: request.player_id,
            expected_shares: holding.shares,
        }
    } else {
        HoldingChange::Update {
            user_id: request.user_id,
            player_id: request.player_id,
            expected_shares: holding.shares,
            shares: remaining,
            average_buy_price: holding.average_buy_price,
        }
    };

    Ok(TradeCommit {
        trade: NewTrade {
            user_id: request.user_id,
            player_id: request.player_id,
            side: TradeSide::Sell,
            shares: request.shares,
            price_per_share: price,
            total_amount: total,
        },
        player: PlayerUpdate {
            player_id: player.id,
            expected_price: player.current_price,
            expected_available: player.available_shares,
            new_price: price,
            new_available,
        },
        balance: BalanceUpdate {
            user_id: account.id,
            expected_balance: account.virtual_balance,
            new_balance: account.virtual_balance + total,
        },
        holding,
    })
}

/// Service executing buy and sell orders
pub struct TradeService {
    store: Arc<dyn MarketStore>,
    feed: Option<WebSocketServer>,
    audit: Option<Arc<AuditTrailService>>,
    commit_retries: u32,
}

impl TradeService {
    pub fn new(store: Arc<dyn MarketStore>, commit_retries: u32) -> Self {
        Self {
            store,
            feed: None,
            audit: None,
            commit_retries,
        }
    }

    /// Publish settled trades on the price feed
    pub fn with_feed(mut self, feed: WebSocketServer) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Record executed and rejected trades
    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Execute a buy or sell order
    pub async fn execute_trade(&self, request: TradeRequest) -> AppResult<TradeReceipt> {
        info!(
            "Executing trade: user={}, player={}, side={}, shares={}",
            request.user_id, request.player_id, request.side, request.shares
        );

        if request.shares <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "Shares must be a positive integer, got {}",
                request.shares
            )));
        }

        let mut attempt: u32 = 0;
        loop {
            let (player, account, holding) = self.load(&request).await?;

            let commit = match plan_trade(&request, &player, &account, holding.as_ref()) {
                Ok(commit) => commit,
                Err(err) => {
                    if err.is_rejection() {
                        info!("Trade rejected: {}", err);
                        self.audit_rejection(&request, &err).await;
                    }
                    return Err(err);
                }
            };

            let price_change = commit.player.new_price - commit.player.expected_price;
            let new_available = commit.player.new_available;
            let updated_balance = commit.balance.new_balance;
            let holding_shares = commit.holding.resulting_shares();

            match self.store.commit_trade(commit).await {
                Ok(trade) => {
                    let receipt = TradeReceipt {
                        new_price: trade.price_per_share,
                        price_change,
                        total_amount: trade.total_amount,
                        updated_balance,
                        holding_shares,
                        trade,
                    };
                    self.publish(&receipt, new_available).await;
                    return Ok(receipt);
                }
                Err(RepositoryError::Conflict(reason)) if attempt < self.commit_retries => {
                    attempt += 1;
                    warn!(
                        "Trade commit conflicted ({}), retrying {}/{}",
                        reason, attempt, self.commit_retries
                    );
                }
                Err(RepositoryError::Conflict(reason)) => {
                    warn!("Trade abandoned after {} retries: {}", attempt, reason);
                    return Err(AppError::Conflict(format!(
                        "Market moved during the trade {} times, please retry",
                        attempt + 1
                    )));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn load(
        &self,
        request: &TradeRequest,
    ) -> AppResult<(Player, UserAccount, Option<Holding>)> {
        let player = self
            .store
            .get_player(request.player_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player {} not found", request.player_id)))?;

        let account = self
            .store
            .get_account(request.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", request.user_id)))?;

        let holding = self
            .store
            .get_holding(request.user_id, request.player_id)
            .await?;

        debug!(
            price = %player.current_price,
            available = player.available_shares,
            balance = %account.virtual_balance,
            held = holding.as_ref().map(|h| h.shares).unwrap_or(0),
            "Loaded trade state"
        );

        Ok((player, account, holding))
    }

    async fn publish(&self, receipt: &TradeReceipt, available_shares: i64) {
        info!(
            "Trade {} settled: {} {} @ {} (total {}, balance {})",
            receipt.trade.id,
            receipt.trade.side,
            receipt.trade.shares,
            receipt.new_price,
            receipt.total_amount,
            receipt.updated_balance
        );

        if let Some(feed) = &self.feed {
            feed.broadcast_price_update(
                receipt.trade.player_id,
                receipt.new_price,
                receipt.price_change,
                available_shares,
            );
            feed.broadcast_trade_executed(&receipt.trade);
        }

        if let Some(audit) = &self.audit {
            if let Err(e) = audit
                .log_trade_executed(&receipt.trade, receipt.updated_balance)
                .await
            {
                warn!("Failed to audit trade {}: {}", receipt.trade.id, e);
            }
        }
    }

    async fn audit_rejection(&self, request: &TradeRequest, err: &AppError) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit
                .log_trade_rejected(
                    request.user_id,
                    request.player_id,
                    request.side,
                    request.shares,
                    err,
                )
                .await
            {
                warn!("Failed to audit rejected trade: {}", e);
            }
        }
    }
}
