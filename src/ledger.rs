// ===============================
// src/ledger.rs
// ===============================
//
// In-memory store: singleton config + append-only trade/alert logs.
// Ids are monotonic and start at 1; nothing is ever removed.
//
use chrono::{DateTime, Utc};

use crate::admission::{Admission, Stamp};
use crate::domain::{Alert, BotConfig, PortfolioState, Trade};
use crate::portfolio;

#[derive(Debug)]
pub struct Ledger {
    config: BotConfig,
    trades: Vec<Trade>,
    alerts: Vec<Alert>,
    next_trade_id: u64,
    next_alert_id: u64,
}

impl Ledger {
    pub fn new(config: BotConfig) -> Self {
        Self { config, trades: Vec::new(), alerts: Vec::new(), next_trade_id: 1, next_alert_id: 1 }
    }

    pub fn config(&self) -> &BotConfig { &self.config }

    pub fn replace_config(&mut self, config: BotConfig) {
        self.config = config;
    }

    pub fn portfolio(&self, now: DateTime<Utc>) -> PortfolioState {
        portfolio::recompute(&self.trades, &self.config, now.date_naive())
    }

    /// Ids the next admission would get. Only consumed by `append`.
    pub fn stamp(&self, at: DateTime<Utc>) -> Stamp {
        Stamp { trade_id: self.next_trade_id, alert_id: self.next_alert_id, at }
    }

    pub fn append(&mut self, adm: &Admission) {
        self.next_trade_id = self.next_trade_id.max(adm.trade.id + 1);
        self.next_alert_id = self.next_alert_id.max(adm.alert.id + 1);
        self.trades.push(adm.trade.clone());
        self.alerts.push(adm.alert.clone());
    }

    /// Newest first.
    pub fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        self.trades.iter().rev().take(limit).cloned().collect()
    }

    /// Newest first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        self.alerts.iter().rev().take(limit).cloned().collect()
    }

    pub fn mark_alert_read(&mut self, id: u64) -> Option<Alert> {
        let alert = self.alerts.iter_mut().find(|a| a.id == id)?;
        alert.is_read = true;
        Some(alert.clone())
    }

    pub fn trade_count(&self) -> usize { self.trades.len() }
    pub fn alert_count(&self) -> usize { self.alerts.len() }
}
