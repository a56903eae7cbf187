//! HTTP API.

pub mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router with all routes
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(handlers::health))
        // Trading
        .route("/api/trade", post(handlers::execute_trade))
        // Player catalogue
        .route(
            "/api/players",
            get(handlers::list_players).post(handlers::issue_player),
        )
        .route("/api/players/:id", get(handlers::get_player))
        .route("/api/players/:id/trades", get(handlers::player_trades))
        // Accounts
        .route("/api/users", post(handlers::create_user))
        .route("/api/users/:id/trades", get(handlers::user_trades))
        .route("/api/portfolio", get(handlers::portfolio))
        .route("/api/leaderboard", get(handlers::leaderboard))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
