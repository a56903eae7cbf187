#![allow(dead_code)]

use async_trait::async_trait;
use footy_exchange::config::AppConfig;
use footy_exchange::error::{RepositoryError, RepositoryResult};
use footy_exchange::models::*;
use footy_exchange::repositories::*;
use footy_exchange::AppState;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Price helper: `dec(2020, 2)` is 20.20
pub fn dec(num: i64, scale: u32) -> Decimal {
    Decimal::new(num, scale)
}

/// Player priced at `price` with the standard 2x cap and 0.5x floor
pub fn new_player(name: &str, price: Decimal, total_shares: i64) -> NewPlayer {
    NewPlayer {
        name: name.to_string(),
        team: "Arsenal".to_string(),
        position: Position::Mid,
        base_price: price,
        price_cap: price * dec(2, 0),
        price_floor: price * dec(5, 1),
        total_shares,
    }
}

pub async fn seed_player(store: &dyn MarketStore, name: &str, price: Decimal, total_shares: i64) -> Player {
    store
        .insert_player(new_player(name, price, total_shares))
        .await
        .expect("Failed to seed player")
}

pub async fn seed_player_with_bounds(
    store: &dyn MarketStore,
    price: Decimal,
    cap: Decimal,
    floor: Decimal,
    total_shares: i64,
) -> Player {
    let mut player = new_player("Bounded Player", price, total_shares);
    player.price_cap = cap;
    player.price_floor = floor;
    store.insert_player(player).await.expect("Failed to seed player")
}

pub async fn seed_account(store: &dyn MarketStore, email: &str, balance: Decimal) -> UserAccount {
    store
        .insert_account(email, balance)
        .await
        .expect("Failed to seed account")
}

/// App state over a fresh in-memory store
pub fn memory_state() -> (AppState, Arc<InMemoryMarketStore>) {
    let store = Arc::new(InMemoryMarketStore::new());
    let state = AppState::new(AppConfig::default(), store.clone(), None);
    (state, store)
}

/// In-memory store whose commits fail on demand
pub struct ScriptedStore {
    pub inner: InMemoryMarketStore,
    failures: Mutex<Vec<RepositoryError>>,
    pub commit_calls: AtomicUsize,
}

impl ScriptedStore {
    /// Fail the next commits with `failures`, in order
    pub fn failing_with(failures: Vec<RepositoryError>) -> Self {
        Self {
            inner: InMemoryMarketStore::new(),
            failures: Mutex::new(failures.into_iter().rev().collect()),
            commit_calls: AtomicUsize::new(0),
        }
    }

    pub fn conflicts(count: usize) -> Self {
        Self::failing_with(
            (0..count)
                .map(|i| RepositoryError::Conflict(format!("scripted conflict {}", i)))
                .collect(),
        )
    }

    pub fn commits(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketStore for ScriptedStore {
    async fn get_player(&self, id: Uuid) -> RepositoryResult<Option<Player>> {
        self.inner.get_player(id).await
    }

    async fn get_account(&self, id: Uuid) -> RepositoryResult<Option<UserAccount>> {
        self.inner.get_account(id).await
    }

    async fn get_holding(&self, user_id: Uuid, player_id: Uuid) -> RepositoryResult<Option<Holding>> {
        self.inner.get_holding(user_id, player_id).await
    }

    async fn commit_trade(&self, commit: TradeCommit) -> RepositoryResult<Trade> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.failures.lock().unwrap().pop();
        match scripted {
            Some(err) => Err(err),
            None => self.inner.commit_trade(commit).await,
        }
    }

    async fn list_players(&self) -> RepositoryResult<Vec<Player>> {
        self.inner.list_players().await
    }

    async fn insert_player(&self, player: NewPlayer) -> RepositoryResult<Player> {
        self.inner.insert_player(player).await
    }

    async fn insert_account(&self, email: &str, balance: Decimal) -> RepositoryResult<UserAccount> {
        self.inner.insert_account(email, balance).await
    }

    async fn list_accounts(&self) -> RepositoryResult<Vec<UserAccount>> {
        self.inner.list_accounts().await
    }

    async fn list_holdings(&self) -> RepositoryResult<Vec<Holding>> {
        self.inner.list_holdings().await
    }

    async fn list_holdings_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Holding>> {
        self.inner.list_holdings_for_user(user_id).await
    }

    async fn list_trades_for_user(&self, user_id: Uuid, limit: i64) -> RepositoryResult<Vec<Trade>> {
        self.inner.list_trades_for_user(user_id, limit).await
    }

    async fn list_trades_for_player(&self, player_id: Uuid, limit: i64) -> RepositoryResult<Vec<Trade>> {
        self.inner.list_trades_for_player(player_id, limit).await
    }
}
