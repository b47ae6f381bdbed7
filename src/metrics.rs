// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::domain::PortfolioState;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Admission pipeline --------
pub static CANDIDATES: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("candidates_total", "candidates evaluated").unwrap());

pub static ADMISSIONS: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("admissions_total", "candidates admitted as trades").unwrap());

pub static REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rejections_total", "candidates rejected (label: reason)"),
        &["reason"],
    )
    .unwrap()
});

pub static ADMISSION_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("admission_errors_total", "admissions failed with an error").unwrap()
});

// -------- Bot loop --------
pub static CYCLES: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("bot_cycles_total", "bot loop cycles").unwrap());

pub static BOT_RUNNING: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("bot_running", "1 if the bot loop is running").unwrap());

pub static CONFIG_UPDATES: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("config_updates_total", "accepted config updates").unwrap());

// -------- Portfolio --------
pub static ACTIVE_POSITIONS: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("active_positions", "trades with ACTIVE status").unwrap());

pub static AVAILABLE_CAPITAL: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("available_capital", "capital not tied in positions").unwrap());

pub static DAILY_PNL: Lazy<Gauge> =
    Lazy::new(|| Gauge::new("daily_pnl", "sum of pnl of today's trades").unwrap());

// -------- HTTP --------
pub static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "API requests (labels: method, status)"),
        &["method", "status"],
    )
    .unwrap()
});

pub fn init() {
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(CANDIDATES.clone())),
        REGISTRY.register(Box::new(ADMISSIONS.clone())),
        REGISTRY.register(Box::new(REJECTIONS.clone())),
        REGISTRY.register(Box::new(ADMISSION_ERRORS.clone())),
        REGISTRY.register(Box::new(CYCLES.clone())),
        REGISTRY.register(Box::new(BOT_RUNNING.clone())),
        REGISTRY.register(Box::new(CONFIG_UPDATES.clone())),
        REGISTRY.register(Box::new(ACTIVE_POSITIONS.clone())),
        REGISTRY.register(Box::new(AVAILABLE_CAPITAL.clone())),
        REGISTRY.register(Box::new(DAILY_PNL.clone())),
        REGISTRY.register(Box::new(HTTP_REQUESTS.clone())),
    ] {
        if let Err(e) = m {
            warn!(?e, "metric registration failed");
        }
    }
}

pub fn observe_portfolio(pf: &PortfolioState) {
    ACTIVE_POSITIONS.set(pf.active_positions as i64);
    AVAILABLE_CAPITAL.set(pf.available_capital);
    DAILY_PNL.set(pf.daily_pnl);
}

// Encode all metrics in Prometheus text format
pub fn encode() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}
