// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : gem_bot_rust — demo dashboard for a simulated crypto gem bot
Module  : config.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Screens token candidates against configurable thresholds, admits
          simulated trades with correlated alerts, tracks capital/PnL,
          exposes an HTTP API + dashboard, Prometheus metrics, and records
          JSONL events.
=============================================================================
*/
use std::env;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use serde::Deserialize;
use tracing::warn;

use crate::domain::{BotConfig, Secret};
use crate::error::{BotError, ValidationError};

// Demo placeholders; the connection check treats these as "not configured".
pub const DEMO_BINANCE_KEY: &str = "demo_key_12345";
pub const DEMO_BINANCE_SECRET: &str = "demo_secret_67890";
pub const DEMO_TELEGRAM_TOKEN: &str = "1234567890:ABCDEFghijklmnopqrstuvwxyz123456789";
pub const DEMO_TELEGRAM_CHAT: &str = "622075030";

/// Candidate source
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FeedMode {
    /// random demo generator
    Random,
    /// fixed watch-list
    Fixed,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "gem_bot_rust", version, about = "Simulated crypto gem bot dashboard")]
pub struct Args {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// seconds between bot cycles
    #[arg(long, env = "TICK_SECS", default_value_t = 30)]
    pub tick_secs: u64,

    #[arg(long, env = "FEED_MODE", value_enum, default_value_t = FeedMode::Random)]
    pub feed_mode: FeedMode,

    /// candidates drawn per cycle by the random feed
    #[arg(long, env = "FEED_BATCH", default_value_t = 3)]
    pub feed_batch: usize,

    #[arg(long, env = "ADMISSIONS_PER_CYCLE", default_value_t = 1)]
    pub admissions_per_cycle: usize,

    /// demo candidates pushed through admission at startup
    /// (never more than max_daily_trades - 1)
    #[arg(long, env = "SEED_TRADES", default_value_t = 2)]
    pub seed_trades: u32,

    /// each start admits 1..=N demo trades under the same cap (0 = off)
    #[arg(long, env = "START_BURST", default_value_t = 3)]
    pub start_burst: u32,

    /// fixed seed for the feed and outcome RNGs
    #[arg(long, env = "RNG_SEED")]
    pub rng_seed: Option<u64>,

    #[arg(long, env = "RECORD_FILE")]
    pub record_file: Option<String>,

    #[arg(skip)]
    pub autostart: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_enabled: true,
            max_daily_trades: 4,
            max_position_size: 300.0,
            total_capital: 2000.0,
            stop_loss_pct: 18.0,
            take_profit_1_pct: 100.0,
            take_profit_2_pct: 200.0,
            take_profit_3_pct: 400.0,
            min_confidence: 85.0,
            min_market_cap: 25_000.0,
            max_market_cap: 300_000.0,
            min_liquidity: 75_000.0,
            binance_api_key: Secret::new(DEMO_BINANCE_KEY),
            binance_api_secret: Secret::new(DEMO_BINANCE_SECRET),
            telegram_bot_token: Secret::new(DEMO_TELEGRAM_TOKEN),
            telegram_chat_id: Secret::new(DEMO_TELEGRAM_CHAT),
        }
    }
}

fn check_finite(field: &'static str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() { Ok(()) } else { Err(ValidationError::new(field, "must be a finite number")) }
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, v) in [
            ("max_position_size", self.max_position_size),
            ("total_capital", self.total_capital),
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_1_pct", self.take_profit_1_pct),
            ("take_profit_2_pct", self.take_profit_2_pct),
            ("take_profit_3_pct", self.take_profit_3_pct),
            ("min_confidence", self.min_confidence),
            ("min_market_cap", self.min_market_cap),
            ("max_market_cap", self.max_market_cap),
            ("min_liquidity", self.min_liquidity),
        ] {
            check_finite(field, v)?;
        }

        if self.max_position_size <= 0.0 {
            return Err(ValidationError::new("max_position_size", "must be greater than 0"));
        }
        if self.total_capital <= 0.0 {
            return Err(ValidationError::new("total_capital", "must be greater than 0"));
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(ValidationError::new("min_confidence", "must be within [0, 100]"));
        }
        if self.min_market_cap < 0.0 {
            return Err(ValidationError::new("min_market_cap", "must not be negative"));
        }
        if self.min_market_cap > self.max_market_cap {
            return Err(ValidationError::new("min_market_cap", "must not exceed max_market_cap"));
        }
        if self.min_liquidity < 0.0 {
            return Err(ValidationError::new("min_liquidity", "must not be negative"));
        }
        for (field, v) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_1_pct", self.take_profit_1_pct),
            ("take_profit_2_pct", self.take_profit_2_pct),
            ("take_profit_3_pct", self.take_profit_3_pct),
        ] {
            if v < 0.0 {
                return Err(ValidationError::new(field, "must not be negative"));
            }
        }
        Ok(())
    }

    /// Take-profit tiers are not enforced by admission, only expected ascending.
    pub fn take_profits_ascending(&self) -> bool {
        self.take_profit_1_pct <= self.take_profit_2_pct
            && self.take_profit_2_pct <= self.take_profit_3_pct
    }
}

/// Partial configuration update; absent fields keep their current value.
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigPatch {
    pub bot_enabled: Option<bool>,
    pub max_daily_trades: Option<u32>,
    pub max_position_size: Option<f64>,
    pub total_capital: Option<f64>,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_1_pct: Option<f64>,
    pub take_profit_2_pct: Option<f64>,
    pub take_profit_3_pct: Option<f64>,
    pub min_confidence: Option<f64>,
    pub min_market_cap: Option<f64>,
    pub max_market_cap: Option<f64>,
    pub min_liquidity: Option<f64>,
    pub binance_api_key: Option<Secret>,
    pub binance_api_secret: Option<Secret>,
    pub telegram_bot_token: Option<Secret>,
    pub telegram_chat_id: Option<Secret>,
}

macro_rules! patch_fields {
    ($patch:expr, $cfg:expr, $changed:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(v) = $patch.$field.clone() {
                if $cfg.$field != v {
                    $changed.push(stringify!($field));
                }
                $cfg.$field = v;
            }
        )*
    };
}

impl ConfigPatch {
    /// Applies the patch to a copy of `base` and validates the result.
    /// Returns the new config and the names of the fields that changed.
    pub fn apply(&self, base: &BotConfig) -> Result<(BotConfig, Vec<&'static str>), BotError> {
        let mut cfg = base.clone();
        let mut changed = Vec::new();
        patch_fields!(self, cfg, changed, [
            bot_enabled,
            max_daily_trades,
            max_position_size,
            total_capital,
            stop_loss_pct,
            take_profit_1_pct,
            take_profit_2_pct,
            take_profit_3_pct,
            min_confidence,
            min_market_cap,
            max_market_cap,
            min_liquidity,
            binance_api_key,
            binance_api_secret,
            telegram_bot_token,
            telegram_chat_id,
        ]);
        cfg.validate()?;
        Ok((cfg, changed))
    }

    pub fn is_empty(&self) -> bool {
        self.bot_enabled.is_none()
            && self.max_daily_trades.is_none()
            && self.max_position_size.is_none()
            && self.total_capital.is_none()
            && self.stop_loss_pct.is_none()
            && self.take_profit_1_pct.is_none()
            && self.take_profit_2_pct.is_none()
            && self.take_profit_3_pct.is_none()
            && self.min_confidence.is_none()
            && self.min_market_cap.is_none()
            && self.max_market_cap.is_none()
            && self.min_liquidity.is_none()
            && self.binance_api_key.is_none()
            && self.binance_api_secret.is_none()
            && self.telegram_bot_token.is_none()
            && self.telegram_chat_id.is_none()
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).unwrap_or_default().trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_secret(key: &str, default: &str) -> Secret {
    Secret::new(env::var(key).unwrap_or_else(|_| default.to_string()))
}

/// Bot thresholds from ENV, falling back to built-in defaults per field.
pub fn bot_config_from_env() -> BotConfig {
    let d = BotConfig::default();
    BotConfig {
        bot_enabled: env::var("BOT_ENABLED").map(|_| env_flag("BOT_ENABLED")).unwrap_or(d.bot_enabled),
        max_daily_trades: env_parse("MAX_DAILY_TRADES", d.max_daily_trades),
        max_position_size: env_parse("MAX_POSITION_SIZE", d.max_position_size),
        total_capital: env_parse("TOTAL_CAPITAL", d.total_capital),
        stop_loss_pct: env_parse("STOP_LOSS_PCT", d.stop_loss_pct),
        take_profit_1_pct: env_parse("TAKE_PROFIT_1_PCT", d.take_profit_1_pct),
        take_profit_2_pct: env_parse("TAKE_PROFIT_2_PCT", d.take_profit_2_pct),
        take_profit_3_pct: env_parse("TAKE_PROFIT_3_PCT", d.take_profit_3_pct),
        min_confidence: env_parse("MIN_CONFIDENCE", d.min_confidence),
        min_market_cap: env_parse("MIN_MARKET_CAP", d.min_market_cap),
        max_market_cap: env_parse("MAX_MARKET_CAP", d.max_market_cap),
        min_liquidity: env_parse("MIN_LIQUIDITY", d.min_liquidity),
        binance_api_key: env_secret("BINANCE_API_KEY", DEMO_BINANCE_KEY),
        binance_api_secret: env_secret("BINANCE_API_SECRET", DEMO_BINANCE_SECRET),
        telegram_bot_token: env_secret("TELEGRAM_BOT_TOKEN", DEMO_TELEGRAM_TOKEN),
        telegram_chat_id: env_secret("TELEGRAM_CHAT_ID", DEMO_TELEGRAM_CHAT),
    }
}

pub fn load() -> (Args, BotConfig) {
    // .env must be loaded before clap reads ENV
    let _ = dotenv();

    let mut args = Args::parse();
    args.autostart = env_flag("AUTOSTART");

    let bot = bot_config_from_env();
    let bot = match bot.validate() {
        Ok(()) => bot,
        Err(e) => {
            warn!(error = %e, "invalid bot config from env, using defaults");
            BotConfig::default()
        }
    };
    if !bot.take_profits_ascending() {
        warn!("take-profit tiers are not ascending");
    }
    (args, bot)
}
