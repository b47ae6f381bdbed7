// ===============================
// src/domain.rs
// ===============================
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Credential string. Serialized as-is, never shown by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self { Self(s.into()) }
    pub fn expose(&self) -> &str { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.trim().is_empty() }

    /// Short SHA-256 prefix, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..4])
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Single active bot configuration. Read as a snapshot per decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot_enabled: bool,
    pub max_daily_trades: u32,
    pub max_position_size: f64,
    pub total_capital: f64,
    pub stop_loss_pct: f64,
    pub take_profit_1_pct: f64,
    pub take_profit_2_pct: f64,
    pub take_profit_3_pct: f64,
    pub min_confidence: f64,
    pub min_market_cap: f64,
    pub max_market_cap: f64,
    pub min_liquidity: f64,
    pub binance_api_key: Secret,
    pub binance_api_secret: Secret,
    pub telegram_bot_token: Secret,
    pub telegram_chat_id: Secret,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub token_symbol: String,
    pub network: String,
    pub confidence: f64,
    pub market_cap: f64,
    pub liquidity: f64,
    pub proposed_entry_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType { Buy, Sell }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus { Active, Completed, Stopped }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType { GemDetected, RiskWarning, Error }

impl AlertType {
    pub fn label(&self) -> &'static str {
        match self {
            AlertType::GemDetected => "GEM DETECTED",
            AlertType::RiskWarning => "RISK WARNING",
            AlertType::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority { High, Medium, Low }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub token_symbol: String,
    pub network: String,
    pub trade_type: TradeType,
    pub entry_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub status: TradeStatus,
    pub confidence: f64,
    pub market_cap: f64,
    pub liquidity: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub alert_type: AlertType,
    pub message: String,
    pub token_symbol: String,
    pub priority: Priority,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Aggregate derived from the trade log; never stored on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub daily_trades_count: u32,
    pub active_positions: u32,
    pub used_capital: f64,
    pub available_capital: f64,
    pub daily_pnl: f64,
    pub winning_trades: u32,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub daily_trades: u32,
    pub daily_pnl: f64,
    pub win_rate: f64,
    pub active_positions: u32,
}

/// Recorder line. Adjacently tagged so every variant serializes as an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Event {
    Trade(Trade),
    Alert(Alert),
    Rejection { ts: DateTime<Utc>, token_symbol: String, reason: String },
    ConfigChanged { ts: DateTime<Utc>, fields: Vec<String> },
    Note(String),
}
