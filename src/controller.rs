// ===============================
// src/controller.rs
// ===============================
//
// Bot controller: owns the STOPPED -> RUNNING -> STOPPED state and the single
// periodic loop that pulls candidates and admits them through the desk.
//
// - start/stop/emergency_stop are idempotent.
// - stop waits for the loop task, so a cycle already in progress finishes
//   its admissions before the controller reports STOPPED.
// - errors inside a cycle are logged and the loop moves on to the next tick.
// - demo seeding (startup and start burst) never fills the last daily slot.
//
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::admission::Decision;
use crate::config::FeedMode;
use crate::desk::Desk;
use crate::error::BotError;
use crate::feed::{self, CandidateSource, RandomFeed};
use crate::metrics::{BOT_RUNNING, CYCLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotState { Stopped, Running }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition { Started, AlreadyRunning, Stopped, AlreadyStopped }

impl Transition {
    pub fn message(&self) -> &'static str {
        match self {
            Transition::Started => "Bot started",
            Transition::AlreadyRunning => "Bot is already running",
            Transition::Stopped => "Bot stopped",
            Transition::AlreadyStopped => "Bot is already stopped",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoopCfg {
    pub tick: Duration,
    pub feed_mode: FeedMode,
    pub feed_batch: usize,
    pub rng_seed: Option<u64>,
    pub admissions_per_cycle: usize,
    /// upper bound of demo trades admitted on each start (0 = none)
    pub start_burst: u32,
}

struct RunningLoop {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct BotController {
    desk: Arc<Desk>,
    cfg: LoopCfg,
    running: Mutex<Option<RunningLoop>>,
}

/// One bot cycle: admit candidates until the per-cycle cap is hit.
/// Returns how many trades were admitted.
pub async fn run_cycle(desk: &Desk, source: &mut dyn CandidateSource, cap: usize) -> usize {
    CYCLES.inc();
    let mut admitted = 0;
    for candidate in source.next_batch() {
        if admitted >= cap {
            break;
        }
        match desk.admit(&candidate).await {
            Ok(Decision::Admitted(_)) => admitted += 1,
            Ok(Decision::Rejected(reason)) => {
                debug!(symbol = %candidate.token_symbol, %reason, "skip candidate");
            }
            Err(e) => error!(error = %e, symbol = %candidate.token_symbol, "admission failed"),
        }
    }
    admitted
}

/// Push up to `requested` demo candidates through admission. Always leaves at
/// least one of today's trade slots free for the bot loop.
pub async fn seed_demo(desk: &Desk, source: &mut dyn CandidateSource, requested: u32) -> u32 {
    let (cfg, pf) = desk.snapshot().await;
    let budget = cfg
        .max_daily_trades
        .saturating_sub(pf.daily_trades_count)
        .saturating_sub(1)
        .min(requested);

    let mut seeded = 0;
    'draws: for _ in 0..requested {
        for candidate in source.next_batch() {
            if seeded >= budget {
                break 'draws;
            }
            match desk.admit(&candidate).await {
                Ok(Decision::Admitted(_)) => seeded += 1,
                Ok(Decision::Rejected(reason)) => {
                    debug!(symbol = %candidate.token_symbol, %reason, "demo candidate rejected");
                }
                Err(e) => warn!(error = %e, symbol = %candidate.token_symbol, "demo candidate failed"),
            }
        }
    }
    seeded
}

fn burst_size(max: u32, seed: Option<u64>) -> u32 {
    if max == 0 {
        return 0;
    }
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    rng.gen_range(1..=max)
}

async fn run_loop(
    desk: Arc<Desk>,
    mut source: Box<dyn CandidateSource>,
    cfg: LoopCfg,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!(tick_ms = cfg.tick.as_millis() as u64, feed = ?cfg.feed_mode, "bot loop started");
    let mut tick = interval(cfg.tick);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            // sender dropped counts as stop too
            _ = stop_rx.changed() => break,
            _ = tick.tick() => {
                let n = run_cycle(&desk, source.as_mut(), cfg.admissions_per_cycle).await;
                debug!(admitted = n, "cycle done");
            }
        }
    }
    info!("bot loop stopped");
}

impl BotController {
    pub fn new(desk: Arc<Desk>, cfg: LoopCfg) -> Self {
        Self { desk, cfg, running: Mutex::new(None) }
    }

    pub async fn start(&self) -> Result<Transition, BotError> {
        let mut running = self.running.lock().await;
        if let Some(r) = running.as_ref() {
            if !r.handle.is_finished() {
                return Ok(Transition::AlreadyRunning);
            }
            warn!("previous bot loop exited on its own, restarting");
        }

        let cfg = self.desk.config().await;
        if cfg.total_capital <= 0.0 {
            return Err(BotError::NoCapital);
        }

        // demo burst runs before the loop exists, so it cannot race a cycle
        let burst = burst_size(self.cfg.start_burst, self.cfg.rng_seed);
        if burst > 0 {
            let mut demo = RandomFeed::new(1, self.cfg.rng_seed.map(|s| s.wrapping_add(2)));
            let seeded = seed_demo(&self.desk, &mut demo, burst).await;
            info!(seeded, requested = burst, "start burst seeded");
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let source = feed::build(self.cfg.feed_mode, self.cfg.feed_batch, self.cfg.rng_seed);
        let handle = tokio::spawn(run_loop(self.desk.clone(), source, self.cfg.clone(), stop_rx));
        *running = Some(RunningLoop { stop_tx, handle });

        BOT_RUNNING.set(1);
        self.desk.note("bot started");
        info!("bot started");
        Ok(Transition::Started)
    }

    async fn halt(&self) -> Transition {
        let mut running = self.running.lock().await;
        let Some(r) = running.take() else {
            return Transition::AlreadyStopped;
        };
        let _ = r.stop_tx.send(true);
        if let Err(e) = r.handle.await {
            error!(error = %e, "bot loop task ended abnormally");
        }
        BOT_RUNNING.set(0);
        Transition::Stopped
    }

    pub async fn stop(&self) -> Transition {
        let t = self.halt().await;
        if t == Transition::Stopped {
            self.desk.note("bot stopped");
            info!("bot stopped");
        }
        t
    }

    /// Same transition as `stop`, logged loudly.
    pub async fn emergency_stop(&self) -> Transition {
        let t = self.halt().await;
        if t == Transition::Stopped {
            self.desk.note("emergency stop");
            warn!("emergency stop: bot loop halted");
        } else {
            info!("emergency stop requested, bot already stopped");
        }
        t
    }

    pub async fn state(&self) -> BotState {
        match self.running.lock().await.as_ref() {
            Some(r) if !r.handle.is_finished() => BotState::Running,
            _ => BotState::Stopped,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == BotState::Running
    }
}
