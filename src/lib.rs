//! Footy Exchange Backend Library
//!
//! Share trading on football players: the pricing engine, the trade
//! orchestrator and the storage, HTTP and price-feed layers around them.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod pricing;
pub mod repositories;
pub mod services;
pub mod state;
pub mod websocket;

// Re-export commonly used types
pub use api::create_app;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use state::AppState;
