pub mod account_repository;
pub mod holding_repository;
pub mod memory_store;
pub mod pg_store;
pub mod player_repository;
pub mod store;
pub mod trade_repository;

// Re-export all repositories for convenient access
pub use account_repository::AccountRepository;
pub use holding_repository::HoldingRepository;
pub use memory_store::InMemoryMarketStore;
pub use pg_store::PgMarketStore;
pub use player_repository::PlayerRepository;
pub use store::{BalanceUpdate, HoldingChange, MarketStore, PlayerUpdate, TradeCommit};
pub use trade_repository::TradeRepository;
