mod helpers;

use footy_exchange::error::{AppError, RepositoryError};
use footy_exchange::models::TradeSide;
use footy_exchange::repositories::{InMemoryMarketStore, MarketStore};
use footy_exchange::services::{AuditTrailService, TradeRequest, TradeService};
use footy_exchange::websocket::{WebSocketServer, WsMessage};
use helpers::*;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn buy(user_id: Uuid, player_id: Uuid, shares: i64) -> TradeRequest {
    TradeRequest {
        user_id,
        player_id,
        side: TradeSide::Buy,
        shares,
    }
}

fn sell(user_id: Uuid, player_id: Uuid, shares: i64) -> TradeRequest {
    TradeRequest {
        user_id,
        player_id,
        side: TradeSide::Sell,
        shares,
    }
}

fn service(store: Arc<dyn MarketStore>) -> TradeService {
    TradeService::new(store, 3)
}

#[tokio::test]
async fn test_buy_moves_price_and_settles_every_row() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let trades = service(store.clone());

    let receipt = assert_ok!(trades.execute_trade(buy(user.id, player.id, 100)).await);

    assert_eq!(receipt.new_price, dec(2020, 2));
    assert_eq!(receipt.price_change, dec(20, 2));
    assert_eq!(receipt.total_amount, dec(2020, 0));
    assert_eq!(receipt.updated_balance, dec(7980, 0));
    assert_eq!(receipt.holding_shares, 100);
    assert_eq!(receipt.trade.side, "buy");

    let player = store.get_player(player.id).await.unwrap().unwrap();
    assert_eq!(player.current_price, dec(2020, 2));
    assert_eq!(player.available_shares, 900);

    let account = store.get_account(user.id).await.unwrap().unwrap();
    assert_eq!(account.virtual_balance, dec(7980, 0));

    let holding = store.get_holding(user.id, player.id).await.unwrap().unwrap();
    assert_eq!(holding.shares, 100);
    assert_eq!(holding.average_buy_price, dec(2020, 2));

    assert_eq!(store.trade_count().await, 1);
}

#[tokio::test]
async fn test_buy_beyond_supply_changes_nothing() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(1_000_000, 0)).await;
    let trades = service(store.clone());

    let err = assert_err!(trades.execute_trade(buy(user.id, player.id, 5000)).await);
    assert!(matches!(err, AppError::InsufficientSupply(_)));

    let unchanged = store.get_player(player.id).await.unwrap().unwrap();
    assert_eq!(unchanged.current_price, dec(20, 0));
    assert_eq!(unchanged.available_shares, 1000);
    let account = store.get_account(user.id).await.unwrap().unwrap();
    assert_eq!(account.virtual_balance, dec(1_000_000, 0));
    assert!(store.get_holding(user.id, player.id).await.unwrap().is_none());
    assert_eq!(store.trade_count().await, 0);
}

#[tokio::test]
async fn test_buy_beyond_balance_changes_nothing() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "broke@example.com", dec(100, 0)).await;
    let trades = service(store.clone());

    let err = assert_err!(trades.execute_trade(buy(user.id, player.id, 100)).await);
    assert!(matches!(err, AppError::InsufficientFunds(_)));

    let unchanged = store.get_player(player.id).await.unwrap().unwrap();
    assert_eq!(unchanged.available_shares, 1000);
    assert_eq!(store.trade_count().await, 0);
}

#[tokio::test]
async fn test_buy_clamps_to_cap() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player =
        seed_player_with_bounds(store.as_ref(), dec(38, 0), dec(40, 0), dec(19, 0), 1000).await;
    let user = seed_account(store.as_ref(), "whale@example.com", dec(100_000, 0)).await;
    let trades = service(store.clone());

    // 38 * 1.10 = 41.80, above the cap
    let receipt = assert_ok!(trades.execute_trade(buy(user.id, player.id, 1000)).await);
    assert_eq!(receipt.new_price, dec(40, 0));
    assert_eq!(receipt.price_change, dec(2, 0));
    assert_eq!(receipt.total_amount, dec(40_000, 0));

    let player = store.get_player(player.id).await.unwrap().unwrap();
    assert_eq!(player.available_shares, 0);
    assert_eq!(player.current_price, player.price_cap);
}

#[tokio::test]
async fn test_selling_whole_position_deletes_holding_and_keeps_ledger() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let trades = service(store.clone());

    assert_ok!(trades.execute_trade(buy(user.id, player.id, 100)).await);
    let receipt = assert_ok!(trades.execute_trade(sell(user.id, player.id, 100)).await);

    // 20.20 * 0.99 = 19.998
    assert_eq!(receipt.new_price, dec(19998, 3));
    assert_eq!(receipt.total_amount, dec(199980, 2));
    assert_eq!(receipt.updated_balance, dec(997980, 2));
    assert_eq!(receipt.holding_shares, 0);

    assert!(store.get_holding(user.id, player.id).await.unwrap().is_none());

    let player = store.get_player(player.id).await.unwrap().unwrap();
    assert_eq!(player.available_shares, 1000);

    let ledger = store.list_trades_for_user(user.id, 10).await.unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0].side, "sell");
    assert_eq!(ledger[1].side, "buy");
}

#[tokio::test]
async fn test_repeat_buys_average_cost_and_partial_sell_keeps_it() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let trades = service(store.clone());

    // 20 -> 20.20, then 20.20 -> 20.402
    assert_ok!(trades.execute_trade(buy(user.id, player.id, 100)).await);
    let second = assert_ok!(trades.execute_trade(buy(user.id, player.id, 100)).await);
    assert_eq!(second.new_price, dec(20402, 3));
    assert_eq!(second.holding_shares, 200);

    let holding = store.get_holding(user.id, player.id).await.unwrap().unwrap();
    // (2020 + 2040.20) / 200 = 20.301
    assert_eq!(holding.average_buy_price, dec(20301, 3));

    assert_ok!(trades.execute_trade(sell(user.id, player.id, 50)).await);
    let holding = store.get_holding(user.id, player.id).await.unwrap().unwrap();
    assert_eq!(holding.shares, 150);
    assert_eq!(holding.average_buy_price, dec(20301, 3));
}

#[tokio::test]
async fn test_sell_more_than_held_rejected() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let trades = service(store.clone());

    let err = assert_err!(trades.execute_trade(sell(user.id, player.id, 1)).await);
    assert!(matches!(err, AppError::InsufficientHoldings(_)));

    assert_ok!(trades.execute_trade(buy(user.id, player.id, 10)).await);
    let err = assert_err!(trades.execute_trade(sell(user.id, player.id, 11)).await);
    assert!(matches!(err, AppError::InsufficientHoldings(_)));
    assert_eq!(store.trade_count().await, 1);
}

#[tokio::test]
async fn test_unknown_player_or_user_not_found() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let trades = service(store.clone());

    let err = assert_err!(trades.execute_trade(buy(user.id, Uuid::new_v4(), 1)).await);
    assert!(err.is_not_found());

    let err = assert_err!(trades.execute_trade(buy(Uuid::new_v4(), player.id, 1)).await);
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_non_positive_shares_rejected_before_lookup() {
    let store = Arc::new(ScriptedStore::conflicts(0));
    let trades = service(store.clone());

    // Ids do not exist: a lookup would report NotFound instead
    let err = assert_err!(trades.execute_trade(buy(Uuid::new_v4(), Uuid::new_v4(), 0)).await);
    assert!(matches!(err, AppError::InvalidArgument(_)));
    assert_eq!(store.commits(), 0);
}

#[tokio::test]
async fn test_conflicted_commit_is_retried() {
    let store = Arc::new(ScriptedStore::conflicts(2));
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let trades = service(store.clone());

    let receipt = assert_ok!(trades.execute_trade(buy(user.id, player.id, 100)).await);
    assert_eq!(receipt.new_price, dec(2020, 2));
    assert_eq!(store.commits(), 3);
    assert_eq!(store.inner.trade_count().await, 1);
}

#[tokio::test]
async fn test_retries_exhausted_reports_conflict() {
    let store = Arc::new(ScriptedStore::conflicts(5));
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let trades = TradeService::new(store.clone(), 1);

    let err = assert_err!(trades.execute_trade(buy(user.id, player.id, 100)).await);
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(store.commits(), 2);

    let unchanged = store.get_player(player.id).await.unwrap().unwrap();
    assert_eq!(unchanged.available_shares, 1000);
}

#[tokio::test]
async fn test_storage_failure_is_not_retried() {
    let store = Arc::new(ScriptedStore::failing_with(vec![RepositoryError::Query(
        sqlx::Error::PoolTimedOut,
    )]));
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let trades = service(store.clone());

    let err = assert_err!(trades.execute_trade(buy(user.id, player.id, 100)).await);
    assert_eq!(err.code(), "STORAGE_FAILURE");
    assert_eq!(store.commits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buys_exceeding_supply() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let first = seed_account(store.as_ref(), "first@example.com", dec(1_000_000, 0)).await;
    let second = seed_account(store.as_ref(), "second@example.com", dec(1_000_000, 0)).await;
    let trades = Arc::new(service(store.clone()));

    let a = {
        let trades = trades.clone();
        let request = buy(first.id, player.id, 600);
        tokio::spawn(async move { trades.execute_trade(request).await })
    };
    let b = {
        let trades = trades.clone();
        let request = buy(second.id, player.id, 600);
        tokio::spawn(async move { trades.execute_trade(request).await })
    };

    let results = vec![a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let supply_rejections = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientSupply(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(supply_rejections, 1);

    let player = store.get_player(player.id).await.unwrap().unwrap();
    assert_eq!(player.available_shares, 400);
    assert_eq!(store.trade_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buys_conserve_shares() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 100).await;
    let trades = Arc::new(service(store.clone()));

    let mut handles = Vec::new();
    for i in 0..12 {
        let user = seed_account(store.as_ref(), &format!("fan{}@example.com", i), dec(100_000, 0)).await;
        let trades = trades.clone();
        let request = buy(user.id, player.id, 10);
        handles.push(tokio::spawn(async move { trades.execute_trade(request).await }));
    }

    let mut bought = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => bought += receipt.trade.shares,
            Err(AppError::InsufficientSupply(_)) | Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    let player = store.get_player(player.id).await.unwrap().unwrap();
    assert!(player.available_shares >= 0);
    assert!(bought <= 100);
    assert_eq!(player.available_shares, 100 - bought);
    assert_eq!(store.trade_count().await as i64, bought / 10);
    assert!(player.current_price <= player.price_cap);
}

#[tokio::test]
async fn test_settled_trade_published_on_feed() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;
    let feed = WebSocketServer::new();
    let mut rx = feed.receiver();
    let trades = service(store.clone()).with_feed(feed);

    assert_ok!(trades.execute_trade(buy(user.id, player.id, 100)).await);

    match rx.recv().await.unwrap() {
        WsMessage::PriceUpdate {
            player_id,
            price,
            available_shares,
            ..
        } => {
            assert_eq!(player_id, player.id);
            assert_eq!(price, dec(2020, 2));
            assert_eq!(available_shares, 900);
        }
        other => panic!("expected price update, got {:?}", other),
    }
    match rx.recv().await.unwrap() {
        WsMessage::TradeExecuted { user_id, shares, .. } => {
            assert_eq!(user_id, user.id);
            assert_eq!(shares, 100);
        }
        other => panic!("expected trade, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejections_are_audited() {
    let store = Arc::new(InMemoryMarketStore::new());
    let player = seed_player(store.as_ref(), "Bukayo Saka", dec(20, 0), 1000).await;
    let user = seed_account(store.as_ref(), "fan@example.com", dec(10_000, 0)).await;

    let dir = std::env::temp_dir().join(format!("footy-trade-audit-{}", Uuid::new_v4()));
    let audit = Arc::new(AuditTrailService::new(&dir).unwrap());
    let trades = service(store.clone()).with_audit(audit.clone());

    assert_ok!(trades.execute_trade(buy(user.id, player.id, 100)).await);
    assert_err!(trades.execute_trade(buy(user.id, player.id, 5000)).await);

    let contents = std::fs::read_to_string(audit.log_file()).unwrap();
    let events: Vec<String> = contents
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .map(|entry| entry["event_type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(events, vec!["trade_executed", "trade_rejected"]);

    let _ = std::fs::remove_dir_all(&dir);
}
