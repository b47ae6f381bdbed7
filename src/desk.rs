// ===============================
// src/desk.rs
// ===============================
//
// Shared trading desk: owns the ledger behind a single lock so that
// read-portfolio -> evaluate -> append happens as one step. Every caller
// (bot loop, startup seeding, API) admits through here, which keeps a single
// writer and avoids admitting against a stale available_capital.
//
use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::admission::{AdmissionEngine, Decision};
use crate::config::ConfigPatch;
use crate::domain::{Alert, BotConfig, Candidate, Event, PortfolioState, Trade};
use crate::error::BotError;
use crate::ledger::Ledger;
use crate::metrics::{self, ADMISSIONS, ADMISSION_ERRORS, CANDIDATES, CONFIG_UPDATES, REJECTIONS};

const CREDENTIAL_FIELDS: [&str; 4] =
    ["binance_api_key", "binance_api_secret", "telegram_bot_token", "telegram_chat_id"];

pub struct Desk {
    ledger: RwLock<Ledger>,
    engine: AdmissionEngine,
    rec_tx: Option<mpsc::Sender<Event>>,
    alert_tx: Option<mpsc::Sender<Alert>>,
}

impl Desk {
    pub fn new(config: BotConfig, engine: AdmissionEngine) -> Self {
        Self { ledger: RwLock::new(Ledger::new(config)), engine, rec_tx: None, alert_tx: None }
    }

    pub fn with_recorder(mut self, tx: mpsc::Sender<Event>) -> Self {
        self.rec_tx = Some(tx);
        self
    }

    pub fn with_notifier(mut self, tx: mpsc::Sender<Alert>) -> Self {
        self.alert_tx = Some(tx);
        self
    }

    fn record(&self, ev: Event) {
        if let Some(tx) = &self.rec_tx {
            if let Err(e) = tx.try_send(ev) {
                debug!(error = %e, "recorder busy, event dropped");
            }
        }
    }

    fn notify(&self, alert: Alert) {
        let Some(tx) = &self.alert_tx else { return };
        match tx.try_send(alert) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(a)) => {
                warn!(alert_id = a.id, "notifier queue full, alert not dispatched");
            }
            Err(mpsc::error::TrySendError::Closed(a)) => {
                let e = BotError::DependencyUnavailable("messaging".into());
                warn!(error = %e, alert_id = a.id, "alert not dispatched");
            }
        }
    }

    /// Evaluate one candidate and persist the result if admitted.
    pub async fn admit(&self, candidate: &Candidate) -> Result<Decision, BotError> {
        CANDIDATES.inc();
        let now = Utc::now();
        let mut ledger = self.ledger.write().await;

        let pf = ledger.portfolio(now);
        let decision = self
            .engine
            .evaluate(candidate, ledger.config(), &pf, ledger.stamp(now))
            .inspect_err(|_| ADMISSION_ERRORS.inc())?;

        match &decision {
            Decision::Admitted(adm) => {
                ledger.append(adm);
                metrics::observe_portfolio(&ledger.portfolio(now));
                drop(ledger);

                ADMISSIONS.inc();
                info!(
                    id = adm.trade.id,
                    symbol = %adm.trade.token_symbol,
                    confidence = adm.trade.confidence,
                    pnl = adm.trade.pnl,
                    status = ?adm.trade.status,
                    "trade admitted"
                );
                self.record(Event::Trade(adm.trade.clone()));
                self.record(Event::Alert(adm.alert.clone()));
                self.notify(adm.alert.clone());
            }
            Decision::Rejected(reason) => {
                drop(ledger);
                REJECTIONS.with_label_values(&[reason.code()]).inc();
                debug!(symbol = %candidate.token_symbol, %reason, "candidate rejected");
                self.record(Event::Rejection {
                    ts: now,
                    token_symbol: candidate.token_symbol.clone(),
                    reason: reason.code().to_string(),
                });
            }
        }
        Ok(decision)
    }

    pub async fn config(&self) -> BotConfig {
        self.ledger.read().await.config().clone()
    }

    pub async fn update_config(&self, patch: &ConfigPatch) -> Result<BotConfig, BotError> {
        let mut ledger = self.ledger.write().await;
        let (cfg, changed) = patch.apply(ledger.config())?;
        ledger.replace_config(cfg.clone());
        metrics::observe_portfolio(&ledger.portfolio(Utc::now()));
        drop(ledger);

        CONFIG_UPDATES.inc();
        let fingerprints: Vec<String> = changed
            .iter()
            .filter(|f| CREDENTIAL_FIELDS.contains(*f))
            .map(|f| {
                let secret = match *f {
                    "binance_api_key" => &cfg.binance_api_key,
                    "binance_api_secret" => &cfg.binance_api_secret,
                    "telegram_bot_token" => &cfg.telegram_bot_token,
                    _ => &cfg.telegram_chat_id,
                };
                format!("{}={}", f, secret.fingerprint())
            })
            .collect();
        info!(fields = ?changed, credentials = ?fingerprints, "config updated");
        if !cfg.take_profits_ascending() {
            warn!("take-profit tiers are not ascending");
        }
        self.record(Event::ConfigChanged {
            ts: Utc::now(),
            fields: changed.iter().map(|s| s.to_string()).collect(),
        });
        Ok(cfg)
    }

    pub async fn snapshot(&self) -> (BotConfig, PortfolioState) {
        let ledger = self.ledger.read().await;
        (ledger.config().clone(), ledger.portfolio(Utc::now()))
    }

    pub async fn trades(&self, limit: usize) -> Vec<Trade> {
        self.ledger.read().await.recent_trades(limit)
    }

    pub async fn alerts(&self, limit: usize) -> Vec<Alert> {
        self.ledger.read().await.recent_alerts(limit)
    }

    pub async fn mark_alert_read(&self, id: u64) -> Result<Alert, BotError> {
        self.ledger
            .write()
            .await
            .mark_alert_read(id)
            .ok_or_else(|| BotError::NotFound(format!("alert {id}")))
    }

    /// (trades, alerts)
    pub async fn counts(&self) -> (usize, usize) {
        let ledger = self.ledger.read().await;
        (ledger.trade_count(), ledger.alert_count())
    }

    pub fn note(&self, msg: impl Into<String>) {
        self.record(Event::Note(msg.into()));
    }
}
