use crate::error::{AppError, AppResult};
use crate::models::Trade;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Channel carrying every price update
pub const MARKET_CHANNEL: &str = "market";

pub fn player_channel(player_id: Uuid) -> String {
    format!("player:{}", player_id)
}

pub fn user_channel(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

/// WebSocket message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "subscribe")]
    Subscribe {
        channel: String, // "market", "player:{id}", "user:{id}"
    },
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        channel: String,
    },
    #[serde(rename = "price_update")]
    PriceUpdate {
        player_id: Uuid,
        #[serde(with = "rust_decimal::serde::float")]
        price: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        price_change: Decimal,
        available_shares: i64,
        timestamp: i64,
    },
    #[serde(rename = "trade_executed")]
    TradeExecuted {
        trade_id: Uuid,
        user_id: Uuid,
        player_id: Uuid,
        side: String,
        shares: i64,
        #[serde(with = "rust_decimal::serde::float")]
        price: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        total_amount: Decimal,
    },
    #[serde(rename = "error")]
    Error {
        message: String,
    },
}

impl WsMessage {
    /// Channels whose subscribers receive this message
    pub fn channels(&self) -> Vec<String> {
        match self {
            WsMessage::PriceUpdate { player_id, .. } => {
                vec![MARKET_CHANNEL.to_string(), player_channel(*player_id)]
            }
            WsMessage::TradeExecuted {
                user_id, player_id, ..
            } => vec![player_channel(*player_id), user_channel(*user_id)],
            // Client-to-server and direct replies are never broadcast
            _ => Vec::new(),
        }
    }
}

/// Reject channel names the feed never publishes to
fn validate_channel(channel: &str) -> Result<(), String> {
    if channel == MARKET_CHANNEL {
        return Ok(());
    }
    match channel.split_once(':') {
        Some(("player", id)) | Some(("user", id)) => Uuid::parse_str(id)
            .map(|_| ())
            .map_err(|_| format!("Invalid id in channel {}", channel)),
        _ => Err(format!("Unknown channel {}", channel)),
    }
}

/// WebSocket price feed
pub struct WebSocketServer {
    /// Broadcast sender for sending messages to all clients
    tx: broadcast::Sender<WsMessage>,
    /// Active subscriptions: channel -> client IDs
    subscriptions: Arc<RwLock<HashMap<String, HashSet<Uuid>>>>,
    /// Client subscriptions: client_id -> channels
    client_channels: Arc<RwLock<HashMap<Uuid, HashSet<String>>>>,
}

impl WebSocketServer {
    /// Create a new WebSocket server
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000); // Buffer up to 1000 messages

        Self {
            tx,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            client_channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Receiver of every broadcast message, unfiltered
    pub fn receiver(&self) -> broadcast::Receiver<WsMessage> {
        self.tx.subscribe()
    }

    /// Hand a message to every connection; each one filters by its subscriptions
    pub fn publish(&self, message: WsMessage) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.tx.send(message) {
            warn!("Failed to broadcast message: {}", e);
        }
    }

    /// Subscribe a client to a channel
    pub async fn subscribe(&self, client_id: Uuid, channel: String) {
        let mut subscriptions = self.subscriptions.write().await;
        let mut client_channels = self.client_channels.write().await;

        subscriptions
            .entry(channel.clone())
            .or_default()
            .insert(client_id);

        client_channels
            .entry(client_id)
            .or_default()
            .insert(channel.clone());

        info!("Client {} subscribed to {}", client_id, channel);
    }

    /// Unsubscribe a client from a channel
    pub async fn unsubscribe(&self, client_id: Uuid, channel: &str) {
        let mut subscriptions = self.subscriptions.write().await;
        let mut client_channels = self.client_channels.write().await;

        if let Some(subscribers) = subscriptions.get_mut(channel) {
            subscribers.remove(&client_id);
            if subscribers.is_empty() {
                subscriptions.remove(channel);
            }
        }

        if let Some(channels) = client_channels.get_mut(&client_id) {
            channels.remove(channel);
        }

        info!("Client {} unsubscribed from {}", client_id, channel);
    }

    /// Drop every subscription of a disconnected client
    pub async fn disconnect(&self, client_id: Uuid) {
        let channels = self
            .client_channels
            .write()
            .await
            .remove(&client_id)
            .unwrap_or_default();

        let mut subscriptions = self.subscriptions.write().await;
        for channel in channels {
            if let Some(subscribers) = subscriptions.get_mut(&channel) {
                subscribers.remove(&client_id);
                if subscribers.is_empty() {
                    subscriptions.remove(&channel);
                }
            }
        }
    }

    /// Get all channels a client is subscribed to
    pub async fn get_client_channels(&self, client_id: Uuid) -> Vec<String> {
        let client_channels = self.client_channels.read().await;
        let mut channels: Vec<String> = client_channels
            .get(&client_id)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default();
        channels.sort();
        channels
    }

    /// Whether `client_id` subscribed to any channel `message` targets
    pub async fn should_forward(&self, client_id: Uuid, message: &WsMessage) -> bool {
        let client_channels = self.client_channels.read().await;
        match client_channels.get(&client_id) {
            Some(channels) => message.channels().iter().any(|c| channels.contains(c)),
            None => false,
        }
    }

    /// Accept connections until the listener fails
    pub async fn serve(&self, listener: TcpListener) -> AppResult<()> {
        loop {
            let (stream, addr) = listener
                .accept()
                .await
                .map_err(|e| AppError::Internal(format!("WebSocket accept failed: {}", e)))?;
            debug!("WebSocket connection from {}", addr);

            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    warn!("WebSocket connection error: {}", e);
                }
            });
        }
    }

    /// Serve one connection until the client leaves or the feed shuts down
    pub async fn handle_connection(&self, stream: TcpStream) -> AppResult<()> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| AppError::Internal(format!("WebSocket handshake failed: {}", e)))?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let mut rx = self.tx.subscribe();
        let client_id = Uuid::new_v4();

        info!("New WebSocket connection: {}", client_id);

        let welcome = serde_json::json!({
            "type": "connected",
            "client_id": client_id.to_string(),
            "message": "Connected to the Footy Exchange price feed"
        });
        if let Err(e) = ws_sender.send(Message::Text(welcome.to_string())).await {
            warn!("Failed to send welcome message: {}", e);
        }

        loop {
            let outgoing = tokio::select! {
                incoming = ws_receiver.next() => {
                    let text = match incoming {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => {
                            info!("WebSocket connection closed: {}", client_id);
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            break;
                        }
                    };
                    self.handle_client_message(client_id, &text).await.to_string()
                }
                received = rx.recv() => {
                    let msg = match received {
                        Ok(msg) => msg,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Client {} lagged, skipped {} messages", client_id, skipped);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };

                    if !self.should_forward(client_id, &msg).await {
                        continue;
                    }

                    match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    }
                }
            };

            if let Err(e) = ws_sender.send(Message::Text(outgoing)).await {
                debug!("Stopped writing to client {}: {}", client_id, e);
                break;
            }
        }

        self.disconnect(client_id).await;
        if let Err(e) = ws_sender.close().await {
            debug!("Closing socket of client {} failed: {}", client_id, e);
        }

        Ok(())
    }

    /// Apply a subscribe or unsubscribe request and build the reply
    async fn handle_client_message(&self, client_id: Uuid, text: &str) -> serde_json::Value {
        match serde_json::from_str::<WsMessage>(text) {
            Ok(WsMessage::Subscribe { channel }) => match validate_channel(&channel) {
                Ok(()) => {
                    self.subscribe(client_id, channel.clone()).await;
                    serde_json::json!({ "type": "subscribed", "channel": channel })
                }
                Err(message) => serde_json::json!({ "type": "error", "message": message }),
            },
            Ok(WsMessage::Unsubscribe { channel }) => {
                self.unsubscribe(client_id, &channel).await;
                serde_json::json!({ "type": "unsubscribed", "channel": channel })
            }
            Ok(_) => {
                warn!("Unexpected message type from client {}", client_id);
                serde_json::json!({ "type": "error", "message": "Unsupported message type" })
            }
            Err(_) => {
                warn!("Failed to parse message from client {}: {}", client_id, text);
                serde_json::json!({ "type": "error", "message": "Invalid message format" })
            }
        }
    }

    /// Open broadcast receivers, one per live connection plus any from `receiver`
    pub fn connection_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Broadcast a player's new price
    pub fn broadcast_price_update(
        &self,
        player_id: Uuid,
        price: Decimal,
        price_change: Decimal,
        available_shares: i64,
    ) {
        self.publish(WsMessage::PriceUpdate {
            player_id,
            price,
            price_change,
            available_shares,
            timestamp: chrono::Utc::now().timestamp(),
        });
    }

    /// Broadcast a settled trade
    pub fn broadcast_trade_executed(&self, trade: &Trade) {
        self.publish(WsMessage::TradeExecuted {
            trade_id: trade.id,
            user_id: trade.user_id,
            player_id: trade.player_id,
            side: trade.side.clone(),
            shares: trade.shares,
            price: trade.price_per_share,
            total_amount: trade.total_amount,
        });
    }
}

impl Clone for WebSocketServer {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            subscriptions: Arc::clone(&self.subscriptions),
            client_channels: Arc::clone(&self.client_channels),
        }
    }
}

impl Default for WebSocketServer {
    fn default() -> Self {
        Self::new()
    }
}
