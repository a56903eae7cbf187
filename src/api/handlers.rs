use super::dto::*;
use crate::error::{AppError, AppResult};
use crate::models::{LeaderboardEntry, Player, Trade, TradeSide, UserAccount};
use crate::services::{PlayerIssue, TradeRequest};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidArgument(format!("Invalid {} id: {}", what, raw)))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidArgument(rejection.body_text()))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    params
        .map(|Query(query)| query)
        .map_err(|rejection| AppError::InvalidArgument(rejection.body_text()))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        storage: state.config.storage.as_str(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// `POST /api/trade`
pub async fn execute_trade(
    State(state): State<AppState>,
    payload: Result<Json<TradeBody>, JsonRejection>,
) -> AppResult<Json<TradeResponse>> {
    let body = json_body(payload)?;

    let side = TradeSide::from_str(&body.side).map_err(AppError::InvalidArgument)?;
    if body.shares <= 0 {
        return Err(AppError::InvalidArgument(format!(
            "Shares must be a positive integer, got {}",
            body.shares
        )));
    }

    let receipt = state
        .trades
        .execute_trade(TradeRequest {
            user_id: body.user_id,
            player_id: body.player_id,
            side,
            shares: body.shares,
        })
        .await?;

    Ok(Json(TradeResponse {
        success: true,
        receipt,
    }))
}

/// `GET /api/players`
pub async fn list_players(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Player>>>> {
    let players = state.market.list_players().await?;
    Ok(Json(DataResponse::list(players)))
}

/// `GET /api/players/:id`
pub async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Player>>> {
    let player = state.market.get_player(parse_id(&id, "player")?).await?;
    Ok(Json(DataResponse::new(player)))
}

/// `GET /api/players/:id/trades`
pub async fn player_trades(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Json<DataResponse<Vec<Trade>>>> {
    let query = query_params(params)?;
    let trades = state
        .market
        .player_trades(parse_id(&id, "player")?, query.limit())
        .await?;
    Ok(Json(DataResponse::list(trades)))
}

/// `POST /api/players`
pub async fn issue_player(
    State(state): State<AppState>,
    payload: Result<Json<IssuePlayerBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<Player>>)> {
    let body = json_body(payload)?;
    let player = state
        .market
        .issue_player(PlayerIssue {
            name: body.name,
            team: body.team,
            position: body.position,
            base_price: body.base_price,
            total_shares: body.total_shares,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(player))))
}

/// `POST /api/users`
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<UserAccount>>)> {
    let body = json_body(payload)?;
    let account = state
        .market
        .create_account(&body.email, body.starting_balance)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(account))))
}

/// `GET /api/users/:id/trades`
pub async fn user_trades(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Json<DataResponse<Vec<Trade>>>> {
    let query = query_params(params)?;
    let trades = state
        .market
        .user_trades(parse_id(&id, "user")?, query.limit())
        .await?;
    Ok(Json(DataResponse::list(trades)))
}

/// `GET /api/portfolio?user_id=`
pub async fn portfolio(
    State(state): State<AppState>,
    params: Result<Query<PortfolioQuery>, QueryRejection>,
) -> AppResult<Json<PortfolioResponse>> {
    let query = query_params(params)?;
    let user_id = query
        .user_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidArgument("user_id query parameter is required".into()))?;

    let view = state.portfolio.portfolio(parse_id(user_id, "user")?).await?;

    Ok(Json(PortfolioResponse {
        success: true,
        data: view.entries,
        summary: view.summary,
    }))
}

/// `GET /api/leaderboard`
pub async fn leaderboard(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<LeaderboardEntry>>>> {
    let board = state.leaderboard.leaderboard().await?;
    Ok(Json(DataResponse::list(board)))
}
