// ===============================
// src/notifier.rs
// ===============================
// Messaging stub: alerts are logged instead of being pushed to a chat.
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::domain::{Alert, AlertType};

pub async fn run(mut alert_rx: mpsc::Receiver<Alert>) {
    while let Some(a) = alert_rx.recv().await {
        match a.alert_type {
            AlertType::GemDetected => info!(id = a.id, symbol = %a.token_symbol, priority = ?a.priority, "GEM"),
            AlertType::RiskWarning => warn!(id = a.id, symbol = %a.token_symbol, priority = ?a.priority, "RISK"),
            AlertType::Error => error!(id = a.id, symbol = %a.token_symbol, message = %a.message, "ERROR"),
        }
    }
    info!("notifier: channel closed, stopped");
}
