//! Request and response bodies of the HTTP API.

use crate::models::{PortfolioEntry, PortfolioSummary};
use crate::services::TradeReceipt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of trades returned by history endpoints
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// `POST /api/trade` body; snake_case names are accepted too
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeBody {
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
    #[serde(alias = "player_id")]
    pub player_id: Uuid,
    #[serde(alias = "type")]
    pub side: String,
    pub shares: i64,
}

/// `POST /api/players` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePlayerBody {
    pub name: String,
    pub team: String,
    pub position: String,
    #[serde(alias = "base_price", with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    #[serde(default, alias = "total_shares")]
    pub total_shares: Option<i64>,
}

/// `POST /api/users` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    pub email: String,
    #[serde(default, alias = "starting_balance", with = "rust_decimal::serde::float_option")]
    pub starting_balance: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct PortfolioQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

impl HistoryQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}

/// `{success: true, data, count?}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
        }
    }
}

impl<T> DataResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            data,
        }
    }
}

/// Successful trade: the receipt fields next to `success`
#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub receipt: TradeReceipt,
}

#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    pub success: bool,
    pub data: Vec<PortfolioEntry>,
    pub summary: PortfolioSummary,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
    pub timestamp: i64,
}
