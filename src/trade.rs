//! Virtual transactions replayed over matched outcome windows.
//!
//! Given an entry price with take-profit and stop-loss distances, each
//! outcome window is walked candle by candle until one of the levels is hit
//! or the time horizon runs out. Aggregating over the top matches gives a
//! rough idea of how the reference setup has historically played out.

use crate::{search::SearchResult, MatchError, OHLCVExt, Result, OHLCV};

/// Number of top results the application evaluates by default
pub const DEFAULT_STATS_LIMIT: usize = 10;

/// Trade direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Long,
    Short,
}

/// Parameters of a hypothetical trade
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VirtualTrade {
    pub entry: f64,
    /// Distance to the take-profit level, in percent of `entry`
    pub take_profit_pct: f64,
    /// Distance to the stop-loss level, in percent of `entry`
    pub stop_loss_pct: f64,
    /// Maximum number of candles to hold
    pub time_horizon: usize,
    pub position: Position,
}

impl VirtualTrade {
    pub fn long(entry: f64, take_profit_pct: f64, stop_loss_pct: f64, time_horizon: usize) -> Self {
        Self {
            entry,
            take_profit_pct,
            stop_loss_pct,
            time_horizon,
            position: Position::Long,
        }
    }

    pub fn short(entry: f64, take_profit_pct: f64, stop_loss_pct: f64, time_horizon: usize) -> Self {
        Self {
            position: Position::Short,
            ..Self::long(entry, take_profit_pct, stop_loss_pct, time_horizon)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.entry.is_finite() || self.entry <= 0.0 {
            return Err(MatchError::InvalidValue("entry must be a positive finite price"));
        }
        for (field, value) in [
            ("take_profit_pct", self.take_profit_pct),
            ("stop_loss_pct", self.stop_loss_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MatchError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
        }
        if self.time_horizon == 0 {
            return Err(MatchError::InvalidValue("time_horizon must be > 0"));
        }
        Ok(())
    }

    /// Price at which the trade is closed in profit
    pub fn take_profit_price(&self) -> f64 {
        self.entry * (1.0 + self.take_profit_pct / 100.0 * self.sign())
    }

    /// Price at which the trade is closed at a loss
    pub fn stop_loss_price(&self) -> f64 {
        self.entry * (1.0 - self.stop_loss_pct / 100.0 * self.sign())
    }

    fn sign(&self) -> f64 {
        match self.position {
            Position::Long => 1.0,
            Position::Short => -1.0,
        }
    }
}

/// How a virtual trade ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Win,
    Loss,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradeOutcome {
    pub result: TradeResult,
    /// Profit in percent of entry (negative for losses)
    pub profit_pct: f64,
    /// Candles held; the full horizon on timeout
    pub duration: usize,
}

/// Aggregate over several simulated trades
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradeStats {
    /// Percentage of trades that hit take-profit
    pub win_rate: f64,
    pub avg_profit: f64,
    pub total_trades: usize,
    pub avg_duration: f64,
}

/// Replay `trade` over `candles`.
///
/// Within one candle the take-profit check runs before the stop-loss check.
/// Returns `None` for an empty window. Candles inside the horizon must pass
/// [`OHLCVExt::validate`].
pub fn simulate<T: OHLCV>(candles: &[T], trade: &VirtualTrade) -> Result<Option<TradeOutcome>> {
    trade.validate()?;
    if candles.is_empty() {
        return Ok(None);
    }

    let take_profit = trade.take_profit_price();
    let stop_loss = trade.stop_loss_price();

    for (i, candle) in candles.iter().take(trade.time_horizon).enumerate() {
        candle.validate().map_err(|e| match e {
            MatchError::InvalidOHLCV { reason, .. } => MatchError::InvalidOHLCV { index: i, reason },
            other => other,
        })?;
        let (hit_profit, hit_loss) = match trade.position {
            Position::Long => (candle.high() >= take_profit, candle.low() <= stop_loss),
            Position::Short => (candle.low() <= take_profit, candle.high() >= stop_loss),
        };
        if hit_profit {
            return Ok(Some(TradeOutcome {
                result: TradeResult::Win,
                profit_pct: trade.take_profit_pct,
                duration: i + 1,
            }));
        }
        if hit_loss {
            return Ok(Some(TradeOutcome {
                result: TradeResult::Loss,
                profit_pct: -trade.stop_loss_pct,
                duration: i + 1,
            }));
        }
    }

    let last = &candles[candles.len().min(trade.time_horizon) - 1];
    let profit_pct = match trade.position {
        Position::Long => (last.close() - trade.entry) / trade.entry * 100.0,
        Position::Short => (trade.entry - last.close()) / trade.entry * 100.0,
    };

    Ok(Some(TradeOutcome {
        result: TradeResult::Timeout,
        profit_pct,
        duration: trade.time_horizon,
    }))
}

/// Simulate `trade` over the outcome windows of the first `limit` results.
///
/// Returns `None` when no result has a non-empty outcome window.
pub fn trade_statistics<T: OHLCV>(
    results: &[SearchResult<T>],
    trade: &VirtualTrade,
    limit: usize,
) -> Result<Option<TradeStats>> {
    trade.validate()?;

    let mut wins = 0usize;
    let mut total = 0usize;
    let mut profit_sum = 0.0;
    let mut duration_sum = 0usize;

    for result in results.iter().take(limit) {
        let Some(outcome) = simulate(&result.outcome_candles, trade)? else {
            continue;
        };
        if outcome.result == TradeResult::Win {
            wins += 1;
        }
        total += 1;
        profit_sum += outcome.profit_pct;
        duration_sum += outcome.duration;
    }

    if total == 0 {
        return Ok(None);
    }

    let n = total as f64;
    Ok(Some(TradeStats {
        win_rate: wins as f64 / n * 100.0,
        avg_profit: profit_sum / n,
        total_trades: total,
        avg_duration: duration_sum as f64 / n,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn bar(high: f64, low: f64, close: f64) -> Candle {
        Candle::new(close, high, low, close)
    }

    #[test]
    fn test_levels() {
        let long = VirtualTrade::long(100.0, 5.0, 2.0, 10);
        assert!((long.take_profit_price() - 105.0).abs() < 1e-9);
        assert!((long.stop_loss_price() - 98.0).abs() < 1e-9);

        let short = VirtualTrade::short(100.0, 5.0, 2.0, 10);
        assert!((short.take_profit_price() - 95.0).abs() < 1e-9);
        assert!((short.stop_loss_price() - 102.0).abs() < 1e-9);
    }

    #[test]
    fn test_validation() {
        assert!(VirtualTrade::long(100.0, 5.0, 2.0, 10).validate().is_ok());
        assert!(VirtualTrade::long(0.0, 5.0, 2.0, 10).validate().is_err());
        assert!(VirtualTrade::long(100.0, -1.0, 2.0, 10).validate().is_err());
        assert!(VirtualTrade::long(100.0, 5.0, f64::NAN, 10).validate().is_err());
        assert!(VirtualTrade::long(100.0, 5.0, 2.0, 0).validate().is_err());
    }

    #[test]
    fn test_long_win() {
        let candles = [bar(101.0, 99.0, 100.5), bar(106.0, 100.0, 105.5)];
        let outcome = simulate(&candles, &VirtualTrade::long(100.0, 5.0, 2.0, 10)).unwrap().unwrap();
        assert_eq!(outcome.result, TradeResult::Win);
        assert_eq!(outcome.profit_pct, 5.0);
        assert_eq!(outcome.duration, 2);
    }

    #[test]
    fn test_long_loss() {
        let candles = [bar(101.0, 97.5, 98.0)];
        let outcome = simulate(&candles, &VirtualTrade::long(100.0, 5.0, 2.0, 10)).unwrap().unwrap();
        assert_eq!(outcome.result, TradeResult::Loss);
        assert_eq!(outcome.profit_pct, -2.0);
        assert_eq!(outcome.duration, 1);
    }

    #[test]
    fn test_profit_checked_before_loss() {
        // One wide candle touches both levels
        let candles = [bar(110.0, 90.0, 100.0)];
        let outcome = simulate(&candles, &VirtualTrade::long(100.0, 5.0, 2.0, 10)).unwrap().unwrap();
        assert_eq!(outcome.result, TradeResult::Win);
    }

    #[test]
    fn test_short_win_and_loss() {
        let trade = VirtualTrade::short(100.0, 3.0, 1.0, 5);
        let down = [bar(100.5, 96.5, 97.0)];
        assert_eq!(simulate(&down, &trade).unwrap().unwrap().result, TradeResult::Win);

        let up = [bar(101.5, 99.5, 101.0)];
        let outcome = simulate(&up, &trade).unwrap().unwrap();
        assert_eq!(outcome.result, TradeResult::Loss);
        assert_eq!(outcome.profit_pct, -1.0);
    }

    #[test]
    fn test_timeout_uses_close_within_horizon() {
        let candles = [
            bar(101.0, 99.0, 100.5),
            bar(101.5, 99.5, 101.0),
            bar(104.9, 99.0, 104.0), // beyond the horizon
        ];
        let outcome = simulate(&candles, &VirtualTrade::long(100.0, 5.0, 2.0, 2)).unwrap().unwrap();
        assert_eq!(outcome.result, TradeResult::Timeout);
        assert_eq!(outcome.duration, 2);
        assert!((outcome.profit_pct - 1.0).abs() < 1e-9);

        let short = simulate(&candles[..1], &VirtualTrade::short(100.0, 5.0, 2.0, 4)).unwrap().unwrap();
        assert_eq!(short.result, TradeResult::Timeout);
        assert_eq!(short.duration, 4);
        assert!((short.profit_pct + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window() {
        let candles: [Candle; 0] = [];
        assert_eq!(simulate(&candles, &VirtualTrade::long(100.0, 5.0, 2.0, 3)).unwrap(), None);
    }

    #[test]
    fn test_invalid_bar_in_horizon() {
        let trade = VirtualTrade::long(100.0, 5.0, 2.0, 2);
        let mut candles = [bar(101.0, 99.0, 100.5), bar(101.0, 99.0, 100.5), bar(99.0, 101.0, 100.0)];
        // Third bar is beyond the horizon
        assert!(simulate(&candles, &trade).is_ok());

        candles[1].high = f64::NAN;
        assert_eq!(
            simulate(&candles, &trade).unwrap_err(),
            MatchError::InvalidOHLCV { index: 1, reason: "NaN in OHLCV" }
        );
    }

    #[test]
    fn test_invalid_trade_propagates() {
        let candles = [bar(101.0, 99.0, 100.0)];
        assert!(simulate(&candles, &VirtualTrade::long(-1.0, 5.0, 2.0, 3)).is_err());
        assert!(trade_statistics::<Candle>(&[], &VirtualTrade::long(100.0, 5.0, 2.0, 0), 10).is_err());
    }
}
