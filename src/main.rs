// ===============================
// src/main.rs
// ===============================
/*
 cd gem_bot_rust && cargo run -- --feed-mode fixed --tick-secs 10

 # status & statistics
 curl -s localhost:5000/api/status
 curl -s localhost:5000/api/statistics

 # start / stop loop
 curl -s -X POST localhost:5000/api/start
 curl -s -X POST localhost:5000/api/stop

 # admission counters
 curl -s localhost:5000/metrics | egrep '^(admissions_total|rejections_total)'
*/
/*
=============================================================================
Project : gem_bot_rust — demo dashboard for a simulated crypto gem bot
Module  : main.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Screens token candidates against configurable thresholds, admits
          simulated trades with correlated alerts, tracks capital/PnL,
          exposes an HTTP API + dashboard, Prometheus metrics, and records
          JSONL events.
=============================================================================
*/
mod admission;
mod api;
mod config;
mod connections;
mod controller;
mod desk;
mod domain;
mod error;
mod feed;
mod ledger;
mod metrics;
mod notifier;
mod portfolio;
mod recorder;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::{sync::mpsc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::admission::{AdmissionEngine, RandomOutcome};
use crate::api::AppState;
use crate::controller::{BotController, LoopCfg};
use crate::desk::Desk;
use crate::domain::{Alert, Event};
use crate::feed::RandomFeed;

#[tokio::main]
async fn main() {
    // ---- Logging ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ---- Load config ----
    let (args, bot_cfg) = config::load();

    // ---- Metrics ----
    metrics::init();

    info!(
        bind = %args.bind,
        port = args.port,
        tick_secs = args.tick_secs,
        feed_mode = ?args.feed_mode,
        feed_batch = args.feed_batch,
        admissions_per_cycle = args.admissions_per_cycle,
        seed_trades = args.seed_trades,
        start_burst = args.start_burst,
        autostart = args.autostart,
        record_file = ?args.record_file,
        bot_enabled = bot_cfg.bot_enabled,
        max_daily_trades = bot_cfg.max_daily_trades,
        total_capital = bot_cfg.total_capital,
        "startup config"
    );

    // ---- Notifier (messaging stub) ----
    let (alert_tx, alert_rx) = mpsc::channel::<Alert>(1024);
    tokio::spawn(notifier::run(alert_rx));

    // ---- Desk + recorder (optional) ----
    let engine = AdmissionEngine::new(Arc::new(RandomOutcome::new(args.rng_seed)));
    let mut desk = Desk::new(bot_cfg, engine).with_notifier(alert_tx);
    let mut rec_task = None;
    if let Some(path) = args.record_file.clone() {
        let (rec_tx, rec_rx) = mpsc::channel::<Event>(8192);
        rec_task = Some(tokio::spawn(recorder::run(rec_rx, path)));
        desk = desk.with_recorder(rec_tx);
    }
    let desk = Arc::new(desk);

    // ---- Demo data: seed candidates go through the same gates ----
    let mut seed_feed = RandomFeed::new(1, args.rng_seed.map(|s| s.wrapping_add(1)));
    let seeded = controller::seed_demo(&desk, &mut seed_feed, args.seed_trades).await;
    info!(seeded, requested = args.seed_trades, "demo trades seeded");

    // ---- Bot controller ----
    let controller = Arc::new(BotController::new(
        desk.clone(),
        LoopCfg {
            tick: Duration::from_secs(args.tick_secs.max(1)),
            feed_mode: args.feed_mode,
            feed_batch: args.feed_batch,
            rng_seed: args.rng_seed,
            admissions_per_cycle: args.admissions_per_cycle,
            start_burst: args.start_burst,
        },
    ));
    if args.autostart {
        if let Err(e) = controller.start().await {
            error!(error = %e, "autostart failed");
        }
    }

    // ---- API ----
    let addr: SocketAddr = match format!("{}:{}", args.bind, args.port).parse() {
        Ok(a) => a,
        Err(e) => {
            error!(?e, bind = %args.bind, port = args.port, "bad listen address");
            return;
        }
    };
    let state = Arc::new(AppState { desk: desk.clone(), controller: controller.clone() });
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "ctrl-c handler failed");
        }
        info!("shutdown signal received");
    };
    if let Err(e) = api::serve(addr, state, shutdown).await {
        error!(?e, "api server failed");
    }

    // ---- Shutdown: let an in-flight cycle finish, then flush the recorder ----
    controller.stop().await;
    drop(controller);
    drop(desk);
    if let Some(task) = rec_task {
        if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
            warn!("recorder did not finish in time");
        }
    }
    info!("bye");
}
