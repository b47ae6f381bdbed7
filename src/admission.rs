// ===============================
// src/admission.rs
// ===============================
//
// Admission engine: ordered gates over (candidate, config, portfolio), then
// trade + alert derivation. Pure: it never touches the ledger, the caller
// persists the result and recomputes the portfolio before the next call.
//
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::domain::{
    Alert, AlertType, BotConfig, Candidate, PortfolioState, Priority, Trade, TradeStatus,
    TradeType,
};
use crate::error::BotError;

/// Alerts above this confidence (strictly greater) are HIGH priority.
pub const HIGH_PRIORITY_CONFIDENCE: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    BotDisabled,
    DailyLimitReached,
    LowConfidence,
    MarketCapOutOfRange,
    InsufficientLiquidity,
    InsufficientCapital,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::BotDisabled => "BOT_DISABLED",
            RejectionReason::DailyLimitReached => "DAILY_LIMIT_REACHED",
            RejectionReason::LowConfidence => "LOW_CONFIDENCE",
            RejectionReason::MarketCapOutOfRange => "MARKET_CAP_OUT_OF_RANGE",
            RejectionReason::InsufficientLiquidity => "INSUFFICIENT_LIQUIDITY",
            RejectionReason::InsufficientCapital => "INSUFFICIENT_CAPITAL",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What the outcome model decided for a freshly admitted trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub pnl: f64,
    pub status: TradeStatus,
}

/// Stand-in for execution/settlement. Injected so tests can be deterministic.
pub trait OutcomeModel: Send + Sync {
    fn settle(&self, confidence: f64, entry_price: f64, quantity: f64) -> Outcome;
}

/// Demo outcome: pnl ~ U(-100, 500) scaled by (confidence - 80) / 20,
/// status drawn uniformly.
pub struct RandomOutcome {
    rng: Mutex<StdRng>,
}

impl RandomOutcome {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }
}

impl OutcomeModel for RandomOutcome {
    fn settle(&self, confidence: f64, _entry_price: f64, _quantity: f64) -> Outcome {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        let multiplier = (confidence - 80.0) / 20.0;
        let base: f64 = rng.gen_range(-100.0..500.0);
        let pnl = (base * multiplier * 100.0).round() / 100.0;
        let status = match rng.gen_range(0..3) {
            0 => TradeStatus::Active,
            1 => TradeStatus::Completed,
            _ => TradeStatus::Stopped,
        };
        Outcome { pnl, status }
    }
}

/// Always returns the same outcome.
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcome(pub Outcome);

impl OutcomeModel for FixedOutcome {
    fn settle(&self, _confidence: f64, _entry_price: f64, _quantity: f64) -> Outcome {
        self.0
    }
}

/// Ids and clock for one admission, allocated by the ledger.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    pub trade_id: u64,
    pub alert_id: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub trade: Trade,
    pub alert: Alert,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Admitted(Admission),
    Rejected(RejectionReason),
}

/// Pre-trade gates, first failure wins.
fn check(c: &Candidate, cfg: &BotConfig, pf: &PortfolioState) -> Result<(), RejectionReason> {
    // 1) master switch
    if !cfg.bot_enabled {
        return Err(RejectionReason::BotDisabled);
    }
    // 2) daily trade count
    if pf.daily_trades_count >= cfg.max_daily_trades {
        return Err(RejectionReason::DailyLimitReached);
    }
    // 3) confidence
    if c.confidence < cfg.min_confidence {
        return Err(RejectionReason::LowConfidence);
    }
    // 4) market cap band (inclusive)
    if c.market_cap < cfg.min_market_cap || c.market_cap > cfg.max_market_cap {
        return Err(RejectionReason::MarketCapOutOfRange);
    }
    // 5) liquidity
    if c.liquidity < cfg.min_liquidity {
        return Err(RejectionReason::InsufficientLiquidity);
    }
    // 6) capital for one more position
    if pf.available_capital < cfg.max_position_size {
        return Err(RejectionReason::InsufficientCapital);
    }
    Ok(())
}

pub fn priority_for(confidence: f64) -> Priority {
    if confidence > HIGH_PRIORITY_CONFIDENCE { Priority::High } else { Priority::Medium }
}

/// 1234567.8 -> "1,234,568"
fn group_thousands(v: f64) -> String {
    let rounded = v.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 { format!("-{out}") } else { out }
}

pub fn alert_message(alert_type: AlertType, trade: &Trade) -> String {
    let icon = match alert_type {
        AlertType::GemDetected => "🚀",
        AlertType::RiskWarning => "⚠️",
        AlertType::Error => "❌",
    };
    format!(
        "{icon} {label}: {sym}\n💎 Confidence: {conf}%\n💰 Market Cap: ${mc}\n💧 Liquidity: ${liq}\n📊 PnL: ${pnl:.2}",
        label = alert_type.label(),
        sym = trade.token_symbol,
        conf = trade.confidence,
        mc = group_thousands(trade.market_cap),
        liq = group_thousands(trade.liquidity),
        pnl = trade.pnl,
    )
}

pub struct AdmissionEngine {
    outcome: Arc<dyn OutcomeModel>,
}

impl AdmissionEngine {
    pub fn new(outcome: Arc<dyn OutcomeModel>) -> Self {
        Self { outcome }
    }

    pub fn evaluate(
        &self,
        candidate: &Candidate,
        cfg: &BotConfig,
        pf: &PortfolioState,
        stamp: Stamp,
    ) -> Result<Decision, BotError> {
        if let Err(reason) = check(candidate, cfg, pf) {
            return Ok(Decision::Rejected(reason));
        }

        let price = candidate.proposed_entry_price;
        if !(price.is_finite() && price > 0.0) {
            return Err(BotError::InvalidPrice(price));
        }
        let quantity = cfg.max_position_size / price;

        let Outcome { pnl, status } = self.outcome.settle(candidate.confidence, price, quantity);

        let trade = Trade {
            id: stamp.trade_id,
            token_symbol: candidate.token_symbol.clone(),
            network: candidate.network.clone(),
            trade_type: TradeType::Buy,
            entry_price: price,
            quantity,
            pnl,
            status,
            confidence: candidate.confidence,
            market_cap: candidate.market_cap,
            liquidity: candidate.liquidity,
            created_at: stamp.at,
            updated_at: stamp.at,
        };

        let alert_type = if pnl >= 0.0 { AlertType::GemDetected } else { AlertType::RiskWarning };
        let alert = Alert {
            id: stamp.alert_id,
            alert_type,
            message: alert_message(alert_type, &trade),
            token_symbol: trade.token_symbol.clone(),
            priority: priority_for(candidate.confidence),
            is_read: false,
            created_at: stamp.at,
        };

        Ok(Decision::Admitted(Admission { trade, alert }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BotConfig {
        BotConfig {
            bot_enabled: true,
            max_daily_trades: 4,
            max_position_size: 300.0,
            total_capital: 2000.0,
            min_confidence: 85.0,
            min_market_cap: 25_000.0,
            max_market_cap: 300_000.0,
            min_liquidity: 75_000.0,
            ..BotConfig::default()
        }
    }

    fn pepe() -> Candidate {
        Candidate {
            token_symbol: "PEPE".into(),
            network: "BSC".into(),
            confidence: 90.0,
            market_cap: 50_000.0,
            liquidity: 100_000.0,
            proposed_entry_price: 0.000002,
        }
    }

    fn fresh_portfolio() -> PortfolioState {
        PortfolioState { available_capital: 2000.0, ..Default::default() }
    }

    fn stamp() -> Stamp {
        Stamp { trade_id: 1, alert_id: 1, at: Utc::now() }
    }

    fn engine(pnl: f64, status: TradeStatus) -> AdmissionEngine {
        AdmissionEngine::new(Arc::new(FixedOutcome(Outcome { pnl, status })))
    }

    fn rejection(d: Decision) -> RejectionReason {
        match d {
            Decision::Rejected(r) => r,
            Decision::Admitted(a) => panic!("unexpected admission: {:?}", a.trade),
        }
    }

    fn admission(d: Decision) -> Admission {
        match d {
            Decision::Admitted(a) => a,
            Decision::Rejected(r) => panic!("unexpected rejection: {r}"),
        }
    }

    #[test]
    fn end_to_end_pepe_is_admitted() {
        let eng = engine(12.5, TradeStatus::Active);
        let a = admission(eng.evaluate(&pepe(), &cfg(), &fresh_portfolio(), stamp()).unwrap());

        assert!((a.trade.quantity - 150_000_000.0).abs() < 1e-3);
        assert_eq!(a.trade.trade_type, TradeType::Buy);
        assert_eq!(a.trade.status, TradeStatus::Active);
        assert_eq!(a.trade.created_at, a.trade.updated_at);
        assert_eq!(a.alert.priority, Priority::Medium);
        assert_eq!(a.alert.alert_type, AlertType::GemDetected);
        assert_eq!(a.alert.token_symbol, "PEPE");
        assert!(!a.alert.is_read);
    }

    #[test]
    fn disabled_bot_wins_over_every_other_gate() {
        let mut c = cfg();
        c.bot_enabled = false;
        let mut weak = pepe();
        weak.confidence = 10.0;
        weak.market_cap = 1.0;
        weak.liquidity = 0.0;
        let pf = PortfolioState { daily_trades_count: 99, ..Default::default() };
        let r = rejection(engine(0.0, TradeStatus::Active).evaluate(&weak, &c, &pf, stamp()).unwrap());
        assert_eq!(r, RejectionReason::BotDisabled);
    }

    #[test]
    fn gates_fire_in_documented_order() {
        let eng = engine(0.0, TradeStatus::Active);
        let c = cfg();

        let full = PortfolioState { daily_trades_count: 4, ..fresh_portfolio() };
        let mut low = pepe();
        low.confidence = 50.0;
        assert_eq!(rejection(eng.evaluate(&low, &c, &full, stamp()).unwrap()), RejectionReason::DailyLimitReached);
        assert_eq!(rejection(eng.evaluate(&low, &c, &fresh_portfolio(), stamp()).unwrap()), RejectionReason::LowConfidence);

        let mut cap = pepe();
        cap.market_cap = 300_001.0;
        cap.liquidity = 0.0;
        assert_eq!(rejection(eng.evaluate(&cap, &c, &fresh_portfolio(), stamp()).unwrap()), RejectionReason::MarketCapOutOfRange);

        let mut liq = pepe();
        liq.liquidity = 74_999.0;
        let broke = PortfolioState { available_capital: 0.0, ..Default::default() };
        assert_eq!(rejection(eng.evaluate(&liq, &c, &broke, stamp()).unwrap()), RejectionReason::InsufficientLiquidity);
        assert_eq!(rejection(eng.evaluate(&pepe(), &c, &broke, stamp()).unwrap()), RejectionReason::InsufficientCapital);
    }

    #[test]
    fn market_cap_bounds_are_inclusive() {
        let eng = engine(0.0, TradeStatus::Active);
        let mut c = pepe();
        c.market_cap = 25_000.0;
        assert!(matches!(eng.evaluate(&c, &cfg(), &fresh_portfolio(), stamp()).unwrap(), Decision::Admitted(_)));
        c.market_cap = 300_000.0;
        assert!(matches!(eng.evaluate(&c, &cfg(), &fresh_portfolio(), stamp()).unwrap(), Decision::Admitted(_)));
    }

    #[test]
    fn capital_guard_with_one_active_position() {
        let mut c = cfg();
        c.total_capital = 300.0;
        c.max_position_size = 300.0;
        let pf = PortfolioState {
            daily_trades_count: 1,
            active_positions: 1,
            used_capital: 300.0,
            available_capital: 0.0,
            ..Default::default()
        };
        let r = rejection(engine(0.0, TradeStatus::Active).evaluate(&pepe(), &c, &pf, stamp()).unwrap());
        assert_eq!(r, RejectionReason::InsufficientCapital);
    }

    #[test]
    fn zero_daily_limit_always_rejects() {
        let mut c = cfg();
        c.max_daily_trades = 0;
        let r = rejection(engine(0.0, TradeStatus::Active).evaluate(&pepe(), &c, &fresh_portfolio(), stamp()).unwrap());
        assert_eq!(r, RejectionReason::DailyLimitReached);
    }

    #[test]
    fn non_positive_price_is_an_error_after_gates() {
        let eng = engine(0.0, TradeStatus::Active);
        let mut c = pepe();
        c.proposed_entry_price = 0.0;
        assert!(matches!(eng.evaluate(&c, &cfg(), &fresh_portfolio(), stamp()), Err(BotError::InvalidPrice(_))));

        // a failing gate still reports the rejection, not the price error
        let mut disabled = cfg();
        disabled.bot_enabled = false;
        assert!(matches!(
            eng.evaluate(&c, &disabled, &fresh_portfolio(), stamp()),
            Ok(Decision::Rejected(RejectionReason::BotDisabled))
        ));
    }

    #[test]
    fn priority_threshold_is_strict() {
        assert_eq!(priority_for(90.0), Priority::Medium);
        assert_eq!(priority_for(90.0000001), Priority::High);
    }

    #[test]
    fn negative_pnl_raises_risk_warning() {
        let a = admission(engine(-3.2, TradeStatus::Stopped).evaluate(&pepe(), &cfg(), &fresh_portfolio(), stamp()).unwrap());
        assert_eq!(a.alert.alert_type, AlertType::RiskWarning);
        assert_eq!(a.trade.status, TradeStatus::Stopped);
        assert_eq!(a.trade.pnl, -3.2);
    }

    #[test]
    fn zero_pnl_counts_as_gem() {
        let a = admission(engine(0.0, TradeStatus::Completed).evaluate(&pepe(), &cfg(), &fresh_portfolio(), stamp()).unwrap());
        assert_eq!(a.alert.alert_type, AlertType::GemDetected);
    }

    #[test]
    fn same_inputs_give_same_fields_except_ids() {
        let eng = engine(42.0, TradeStatus::Completed);
        let s1 = stamp();
        let s2 = Stamp { trade_id: 7, alert_id: 9, at: s1.at };
        let a = admission(eng.evaluate(&pepe(), &cfg(), &fresh_portfolio(), s1).unwrap());
        let mut b = admission(eng.evaluate(&pepe(), &cfg(), &fresh_portfolio(), s2).unwrap());
        assert_eq!(b.trade.id, 7);
        assert_eq!(b.alert.id, 9);
        b.trade.id = a.trade.id;
        b.alert.id = a.alert.id;
        assert_eq!(a, b);
    }

    #[test]
    fn alert_message_golden() {
        let a = admission(engine(123.456, TradeStatus::Active).evaluate(&pepe(), &cfg(), &fresh_portfolio(), stamp()).unwrap());
        assert_eq!(
            a.alert.message,
            "🚀 GEM DETECTED: PEPE\n💎 Confidence: 90%\n💰 Market Cap: $50,000\n💧 Liquidity: $100,000\n📊 PnL: $123.46"
        );
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(1_234_567.6), "1,234,568");
        assert_eq!(group_thousands(-25_000.0), "-25,000");
    }

    #[test]
    fn seeded_random_outcome_is_reproducible() {
        let a = RandomOutcome::new(Some(7));
        let b = RandomOutcome::new(Some(7));
        for _ in 0..10 {
            assert_eq!(a.settle(90.0, 0.001, 300_000.0), b.settle(90.0, 0.001, 300_000.0));
        }
    }

    #[test]
    fn random_outcome_pnl_stays_in_scaled_band() {
        let m = RandomOutcome::new(Some(1));
        for _ in 0..200 {
            // multiplier at confidence 90 is 0.5 -> pnl in [-50, 250]
            let o = m.settle(90.0, 0.001, 1.0);
            assert!(o.pnl >= -50.0 && o.pnl <= 250.0, "pnl {}", o.pnl);
        }
    }
}
