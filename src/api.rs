// ===============================
// src/api.rs (HTTP API + dashboard)
// ===============================
//
// Routes:
//   GET  /                          dashboard (embedded HTML)
//   GET  /health
//   GET  /metrics                   Prometheus text format
//   GET  /api/config                POST|PUT|PATCH /api/config (partial update)
//   POST /api/start | /api/stop | /api/emergency-stop
//   GET  /api/status | /api/statistics
//   GET  /api/trades?limit=N        newest first (alias: per_page)
//   GET  /api/alerts?limit=N        newest first (alias: per_page)
//   POST /api/alerts/{id}/read
//   POST /api/test-connections
//
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use hyper::{
    header,
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server, StatusCode,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ConfigPatch;
use crate::connections;
use crate::controller::{BotController, BotState};
use crate::desk::Desk;
use crate::error::BotError;
use crate::metrics::{self, HTTP_REQUESTS};

const DASHBOARD_HTML: &str = include_str!("../static/dashboard.html");
const MAX_LIST_LIMIT: usize = 500;
const DEFAULT_TRADES_LIMIT: usize = 20;
const DEFAULT_ALERTS_LIMIT: usize = 10;

pub struct AppState {
    pub desk: Arc<Desk>,
    pub controller: Arc<BotController>,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Bot(#[from] BotError),
    #[error("{0}")]
    BadRequest(String),
    #[error("route not found")]
    NoRoute,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Bot(BotError::Validation(_))
            | ApiError::Bot(BotError::InvalidPrice(_))
            | ApiError::Bot(BotError::NoCapital)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Bot(BotError::NotFound(_)) | ApiError::NoRoute => StatusCode::NOT_FOUND,
            ApiError::Bot(BotError::DependencyUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize)]
struct StatusView {
    running: bool,
    state: BotState,
    bot_enabled: bool,
    daily_trades: u32,
    max_daily_trades: u32,
    active_positions: u32,
    daily_pnl: f64,
    total_capital: f64,
    available_capital: f64,
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .unwrap_or_else(|_| Response::new(Body::empty())),
        Err(e) => {
            warn!(?e, "response serialize failed");
            let mut resp = Response::new(Body::from(r#"{"error":"serialization failed"}"#));
            *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            resp
        }
    }
}

fn text_response(content_type: &'static str, body: impl Into<Body>) -> Response<Body> {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

fn message(msg: &str) -> Response<Body> {
    json_response(StatusCode::OK, &json!({ "message": msg }))
}

/// `limit` (or `per_page`) from the query string, capped at MAX_LIST_LIMIT.
fn list_limit(query: Option<&str>, default: usize) -> Result<usize, ApiError> {
    let Some(q) = query else { return Ok(default) };
    for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
        if k == "limit" || k == "per_page" {
            let n: usize = v
                .trim()
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("{k} must be a non-negative integer")))?;
            return Ok(n.min(MAX_LIST_LIMIT));
        }
    }
    Ok(default)
}

async fn read_patch(body: Body) -> Result<ConfigPatch, ApiError> {
    let bytes = hyper::body::to_bytes(body)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("No data provided".into()));
    }
    let patch: ConfigPatch = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("invalid config payload: {e}")))?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No data provided".into()));
    }
    Ok(patch)
}

async fn route(req: Request<Body>, st: &AppState) -> Result<Response<Body>, ApiError> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_owned);
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (&method, segs.as_slice()) {
        (&Method::GET, []) => Ok(text_response("text/html; charset=utf-8", DASHBOARD_HTML)),

        (&Method::GET, ["health"]) => {
            let (trades, alerts) = st.desk.counts().await;
            Ok(json_response(
                StatusCode::OK,
                &json!({
                    "status": "healthy",
                    "timestamp": Utc::now(),
                    "bot_running": st.controller.is_running().await,
                    "version": env!("CARGO_PKG_VERSION"),
                    "trades_count": trades,
                    "alerts_count": alerts,
                }),
            ))
        }

        (&Method::GET, ["metrics"]) => Ok(text_response(
            "text/plain; version=0.0.4; charset=utf-8",
            metrics::encode(),
        )),

        (&Method::GET, ["api", "config"]) => {
            Ok(json_response(StatusCode::OK, &st.desk.config().await))
        }

        (&Method::POST | &Method::PUT | &Method::PATCH, ["api", "config"]) => {
            let patch = read_patch(req.into_body()).await?;
            let cfg = st.desk.update_config(&patch).await?;
            Ok(json_response(StatusCode::OK, &cfg))
        }

        (&Method::POST, ["api", "start"]) => {
            let t = st.controller.start().await?;
            Ok(message(t.message()))
        }

        (&Method::POST, ["api", "stop"]) => Ok(message(st.controller.stop().await.message())),

        (&Method::POST, ["api", "emergency-stop"]) => {
            st.controller.emergency_stop().await;
            Ok(message("Emergency stop activated"))
        }

        (&Method::GET, ["api", "status"]) => {
            let (cfg, pf) = st.desk.snapshot().await;
            metrics::observe_portfolio(&pf);
            let state = st.controller.state().await;
            let stats = pf.statistics();
            Ok(json_response(
                StatusCode::OK,
                &StatusView {
                    running: state == BotState::Running,
                    state,
                    bot_enabled: cfg.bot_enabled,
                    daily_trades: stats.daily_trades,
                    max_daily_trades: cfg.max_daily_trades,
                    active_positions: stats.active_positions,
                    daily_pnl: stats.daily_pnl,
                    total_capital: cfg.total_capital,
                    available_capital: pf.available_capital,
                },
            ))
        }

        (&Method::GET, ["api", "statistics"]) => {
            let (_, pf) = st.desk.snapshot().await;
            Ok(json_response(StatusCode::OK, &pf.statistics()))
        }

        (&Method::GET, ["api", "trades"]) => {
            let limit = list_limit(query.as_deref(), DEFAULT_TRADES_LIMIT)?;
            Ok(json_response(StatusCode::OK, &st.desk.trades(limit).await))
        }

        (&Method::GET, ["api", "alerts"]) => {
            let limit = list_limit(query.as_deref(), DEFAULT_ALERTS_LIMIT)?;
            Ok(json_response(StatusCode::OK, &st.desk.alerts(limit).await))
        }

        (&Method::POST, ["api", "alerts", id, "read"]) => {
            let id: u64 = id
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid alert id {id}")))?;
            Ok(json_response(StatusCode::OK, &st.desk.mark_alert_read(id).await?))
        }

        (&Method::GET | &Method::POST, ["api", "test-connections"]) => {
            let cfg = st.desk.config().await;
            Ok(json_response(StatusCode::OK, &connections::check(&cfg)))
        }

        _ => Err(ApiError::NoRoute),
    }
}

pub async fn handle(req: Request<Body>, st: Arc<AppState>) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let resp = match route(req, &st).await {
        Ok(r) => r,
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                warn!(error = %e, %method, %path, "request failed");
            } else {
                debug!(error = %e, %method, %path, "request rejected");
            }
            json_response(status, &json!({ "error": e.to_string() }))
        }
    };
    HTTP_REQUESTS
        .with_label_values(&[method.as_str(), resp.status().as_str()])
        .inc();
    resp
}

pub async fn serve(
    addr: SocketAddr,
    st: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), hyper::Error> {
    let make_svc = make_service_fn(move |_conn| {
        let st = st.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let st = st.clone();
                async move { Ok::<_, Infallible>(handle(req, st).await) }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    info!(%addr, "api listening");
    server.with_graceful_shutdown(shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::time::Duration;

    use crate::admission::{AdmissionEngine, FixedOutcome, Outcome};
    use crate::config::FeedMode;
    use crate::controller::LoopCfg;
    use crate::domain::{BotConfig, Candidate, TradeStatus};

    fn state() -> Arc<AppState> {
        let desk = Arc::new(Desk::new(
            BotConfig::default(),
            AdmissionEngine::new(Arc::new(FixedOutcome(Outcome { pnl: 10.0, status: TradeStatus::Active }))),
        ));
        let controller = Arc::new(BotController::new(
            desk.clone(),
            LoopCfg {
                tick: Duration::from_secs(3600),
                feed_mode: FeedMode::Fixed,
                feed_batch: 1,
                rng_seed: Some(1),
                admissions_per_cycle: 1,
                start_burst: 0,
            },
        ));
        Arc::new(AppState { desk, controller })
    }

    async fn call(st: &Arc<AppState>, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = handle(req, st.clone()).await;
        let status = resp.status();
        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        let v = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, v)
    }

    async fn seed(st: &Arc<AppState>, symbols: &[&str]) {
        for s in symbols {
            st.desk
                .admit(&Candidate {
                    token_symbol: s.to_string(),
                    network: "BSC".into(),
                    confidence: 91.0,
                    market_cap: 60_000.0,
                    liquidity: 80_000.0,
                    proposed_entry_price: 0.002,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn config_get_and_partial_update() {
        let st = state();
        let (code, cfg) = call(&st, Method::GET, "/api/config", "").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(cfg["min_confidence"], 85.0);

        let (code, cfg) = call(&st, Method::POST, "/api/config", r#"{"min_confidence": 88.5}"#).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(cfg["min_confidence"], 88.5);
        assert_eq!(cfg["max_daily_trades"], 4);

        let (code, err) = call(&st, Method::POST, "/api/config", r#"{"max_market_cap": 1}"#).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(err["error"].as_str().unwrap().contains("min_market_cap"));

        let (code, _) = call(&st, Method::POST, "/api/config", "").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        let (code, _) = call(&st, Method::POST, "/api/config", "not json").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn start_stop_are_idempotent_over_http() {
        let st = state();
        let (code, _) = call(&st, Method::POST, "/api/stop", "").await;
        assert_eq!(code, StatusCode::OK);

        let (code, v) = call(&st, Method::POST, "/api/start", "").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(v["message"], "Bot started");
        let (_, v) = call(&st, Method::POST, "/api/start", "").await;
        assert_eq!(v["message"], "Bot is already running");

        let (_, status) = call(&st, Method::GET, "/api/status", "").await;
        assert_eq!(status["running"], true);

        let (code, _) = call(&st, Method::POST, "/api/emergency-stop", "").await;
        assert_eq!(code, StatusCode::OK);
        let (code, _) = call(&st, Method::POST, "/api/emergency-stop", "").await;
        assert_eq!(code, StatusCode::OK);
        let (_, status) = call(&st, Method::GET, "/api/status", "").await;
        assert_eq!(status["running"], false);
        assert_eq!(status["state"], "STOPPED");
    }

    #[tokio::test]
    async fn status_and_statistics_reflect_trades() {
        let st = state();
        seed(&st, &["PEPE", "BONK"]).await;

        let (_, s) = call(&st, Method::GET, "/api/status", "").await;
        assert_eq!(s["daily_trades"], 2);
        assert_eq!(s["active_positions"], 2);
        assert_eq!(s["available_capital"], 1400.0);
        assert_eq!(s["total_capital"], 2000.0);
        assert_eq!(s["max_daily_trades"], 4);

        let (_, stats) = call(&st, Method::GET, "/api/statistics", "").await;
        assert_eq!(stats["daily_pnl"], 20.0);
        assert_eq!(stats["win_rate"], 100.0);
    }

    #[tokio::test]
    async fn trades_and_alerts_are_newest_first() {
        let st = state();
        seed(&st, &["PEPE", "BONK", "SHIB"]).await;

        let (_, trades) = call(&st, Method::GET, "/api/trades?limit=2", "").await;
        let trades = trades.as_array().unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0]["token_symbol"], "SHIB");
        assert_eq!(trades[0]["status"], "ACTIVE");
        assert_eq!(trades[0]["trade_type"], "BUY");

        let (_, alerts) = call(&st, Method::GET, "/api/alerts?per_page=1", "").await;
        assert_eq!(alerts.as_array().unwrap().len(), 1);
        assert_eq!(alerts[0]["alert_type"], "GEM_DETECTED");
        assert_eq!(alerts[0]["priority"], "HIGH");

        let (code, _) = call(&st, Method::GET, "/api/trades?limit=abc", "").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mark_alert_read_over_http() {
        let st = state();
        seed(&st, &["PEPE"]).await;
        let (code, a) = call(&st, Method::POST, "/api/alerts/1/read", "").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(a["is_read"], true);

        let (code, _) = call(&st, Method::POST, "/api/alerts/42/read", "").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn start_without_capital_is_bad_request() {
        let st = state();
        // validation forbids zero capital, so build the desk directly
        let mut cfg = BotConfig::default();
        cfg.total_capital = 0.0;
        let desk = Arc::new(Desk::new(
            cfg,
            AdmissionEngine::new(Arc::new(FixedOutcome(Outcome { pnl: 0.0, status: TradeStatus::Active }))),
        ));
        let controller = Arc::new(BotController::new(desk.clone(), LoopCfg {
            tick: Duration::from_secs(3600),
            feed_mode: FeedMode::Fixed,
            feed_batch: 1,
            rng_seed: None,
            admissions_per_cycle: 1,
            start_burst: 0,
        }));
        let broke = Arc::new(AppState { desk, controller });
        let (code, v) = call(&broke, Method::POST, "/api/start", "").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"], "total capital must be greater than 0");

        let (code, _) = call(&st, Method::GET, "/nope", "").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_connections_and_dashboard() {
        let st = state();
        let (code, h) = call(&st, Method::GET, "/health", "").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(h["status"], "healthy");
        assert_eq!(h["trades_count"], 0);

        let (_, c) = call(&st, Method::POST, "/api/test-connections", "").await;
        assert_eq!(c["dex"], true);
        assert_eq!(c["binance"], false);

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = handle(req, st.clone()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("<html"));
    }
}
