// ===============================
// src/portfolio.rs (capital & PnL aggregate)
// ===============================

use chrono::NaiveDate;

use crate::domain::{BotConfig, PortfolioState, Statistics, Trade, TradeStatus};

/// Rebuild the portfolio aggregate from the full trade log.
///
/// - `active_positions` counts every ACTIVE trade, whatever its day.
/// - daily counters (trades, pnl, wins) only look at trades created on `today` (UTC).
/// - `win_rate` is 0 when there are no trades today.
pub fn recompute(trades: &[Trade], cfg: &BotConfig, today: NaiveDate) -> PortfolioState {
    let mut st = PortfolioState::default();

    for t in trades {
        if t.status == TradeStatus::Active {
            st.active_positions += 1;
        }
        if t.created_at.date_naive() == today {
            st.daily_trades_count += 1;
            st.daily_pnl += t.pnl;
            if t.pnl > 0.0 {
                st.winning_trades += 1;
            }
        }
    }

    st.used_capital = st.active_positions as f64 * cfg.max_position_size;
    st.available_capital = (cfg.total_capital - st.used_capital).max(0.0);
    st.win_rate = if st.daily_trades_count > 0 {
        st.winning_trades as f64 / st.daily_trades_count as f64 * 100.0
    } else {
        0.0
    };
    st
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

impl PortfolioState {
    /// Dashboard view, pnl to cents and win rate to one decimal.
    pub fn statistics(&self) -> Statistics {
        Statistics {
            daily_trades: self.daily_trades_count,
            daily_pnl: round_to(self.daily_pnl, 2),
            win_rate: round_to(self.win_rate, 1),
            active_positions: self.active_positions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::domain::TradeType;

    fn trade(id: u64, pnl: f64, status: TradeStatus, days_ago: i64) -> Trade {
        let at = Utc::now() - Duration::days(days_ago);
        Trade {
            id,
            token_symbol: "BONK".into(),
            network: "BSC".into(),
            trade_type: TradeType::Buy,
            entry_price: 0.001,
            quantity: 300_000.0,
            pnl,
            status,
            confidence: 90.0,
            market_cap: 50_000.0,
            liquidity: 100_000.0,
            created_at: at,
            updated_at: at,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn empty_log_is_all_zero() {
        let st = recompute(&[], &BotConfig::default(), today());
        assert_eq!(st.win_rate, 0.0);
        assert_eq!(st.daily_pnl, 0.0);
        assert_eq!(st.active_positions, 0);
        assert_eq!(st.daily_trades_count, 0);
        assert_eq!(st.available_capital, 2000.0);
    }

    #[test]
    fn capital_and_win_rate() {
        let trades = vec![
            trade(1, 100.0, TradeStatus::Active, 0),
            trade(2, -40.0, TradeStatus::Stopped, 0),
            trade(3, 0.0, TradeStatus::Completed, 0),
            trade(4, 10.0, TradeStatus::Active, 0),
        ];
        let st = recompute(&trades, &BotConfig::default(), today());
        assert_eq!(st.active_positions, 2);
        assert_eq!(st.used_capital, 600.0);
        assert_eq!(st.available_capital, 1400.0);
        assert_eq!(st.daily_trades_count, 4);
        assert_eq!(st.daily_pnl, 70.0);
        // zero pnl is not a win
        assert_eq!(st.winning_trades, 2);
        assert_eq!(st.win_rate, 50.0);
    }

    #[test]
    fn available_capital_never_negative() {
        let mut cfg = BotConfig::default();
        cfg.total_capital = 300.0;
        cfg.max_position_size = 300.0;
        let trades = vec![
            trade(1, 1.0, TradeStatus::Active, 0),
            trade(2, 1.0, TradeStatus::Active, 0),
        ];
        let st = recompute(&trades, &cfg, today());
        assert_eq!(st.available_capital, 0.0);
    }

    #[test]
    fn older_trades_only_count_as_positions() {
        let trades = vec![
            trade(1, 500.0, TradeStatus::Active, 2),
            trade(2, -5.0, TradeStatus::Completed, 0),
        ];
        let st = recompute(&trades, &BotConfig::default(), today());
        assert_eq!(st.active_positions, 1);
        assert_eq!(st.daily_trades_count, 1);
        assert_eq!(st.daily_pnl, -5.0);
        assert_eq!(st.win_rate, 0.0);
    }

    #[test]
    fn statistics_are_rounded() {
        let trades = vec![
            trade(1, 1.005, TradeStatus::Completed, 0),
            trade(2, 2.0, TradeStatus::Completed, 0),
            trade(3, -1.0, TradeStatus::Completed, 0),
        ];
        let s = recompute(&trades, &BotConfig::default(), today()).statistics();
        assert_eq!(s.daily_trades, 3);
        assert_eq!(s.win_rate, 66.7);
        assert!((s.daily_pnl - 2.0).abs() < 0.011);
    }
}
