use crate::error::{AppError, AppResult};
use crate::models::{Trade, TradeSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub event_type: String, // "trade_executed", "trade_rejected"
    pub user_id: Option<Uuid>,
    pub player_id: Option<Uuid>,
    pub details: serde_json::Value,
}

/// Append-only JSON-lines record of trading activity
pub struct AuditTrailService {
    log_file: PathBuf,
    file_handle: Arc<Mutex<std::fs::File>>,
}

impl AuditTrailService {
    /// Open (or create) today's audit file under `log_directory`
    pub fn new(log_directory: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(log_directory)
            .map_err(|e| AppError::Internal(format!("Failed to create log directory: {}", e)))?;

        let date = chrono::Utc::now().format("%Y-%m-%d");
        let log_file = log_directory.join(format!("audit_{}.log", date));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| AppError::Internal(format!("Failed to open audit log file: {}", e)))?;

        info!("Audit trail initialized: {:?}", log_file);

        Ok(Self {
            log_file,
            file_handle: Arc::new(Mutex::new(file)),
        })
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> AppResult<()> {
        let json = serde_json::to_string(&entry)
            .map_err(|e| AppError::Internal(format!("Failed to encode audit entry: {}", e)))?;

        let mut file = self.file_handle.lock().await;
        writeln!(file, "{}", json)
            .map_err(|e| AppError::Internal(format!("Failed to write audit log: {}", e)))?;

        file.flush()
            .map_err(|e| AppError::Internal(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Log a settled trade
    pub async fn log_trade_executed(&self, trade: &Trade, updated_balance: Decimal) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "trade_executed".to_string(),
            user_id: Some(trade.user_id),
            player_id: Some(trade.player_id),
            details: serde_json::json!({
                "trade_id": trade.id.to_string(),
                "side": trade.side,
                "shares": trade.shares,
                "price_per_share": trade.price_per_share.to_string(),
                "total_amount": trade.total_amount.to_string(),
                "updated_balance": updated_balance.to_string(),
            }),
        };

        self.log(entry).await
    }

    /// Log a trade refused by validation
    pub async fn log_trade_rejected(
        &self,
        user_id: Uuid,
        player_id: Uuid,
        side: TradeSide,
        shares: i64,
        error: &AppError,
    ) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "trade_rejected".to_string(),
            user_id: Some(user_id),
            player_id: Some(player_id),
            details: serde_json::json!({
                "side": side.as_str(),
                "shares": shares,
                "code": error.code(),
                "reason": error.to_string(),
            }),
        };

        self.log(entry).await
    }
}
