//! # candlematch
//!
//! Ordinal shape-similarity scoring and sliding-window pattern search for
//! candlestick series.
//!
//! Two layers:
//!
//! - [`scorer`]: compares the up/down/flat ordering of two numeric series at
//!   every sampling resolution and keeps the one that agrees best.
//! - [`search`]: slides a reference-length window across keyed historical
//!   series, scores each window against the reference and returns the best
//!   matches together with what happened next.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlematch::prelude::*;
//!
//! // Scale does not matter, only the ordering of points does
//! let (similarity, report) = score(&[1.0, 3.0, 2.0, 5.0, 4.0], &[10.0, 30.0, 20.0, 50.0, 40.0]).unwrap();
//! assert_eq!(similarity, 1.0);
//! assert_eq!(report.k, 5);
//!
//! let history: Vec<Candle> = (0..300)
//!     .map(|i| Candle::from_close(100.0 + (i as f64 * 0.3).sin()))
//!     .collect();
//! let reference = history[40..50].to_vec();
//!
//! let mut series = SeriesMap::new();
//! series.insert(SeriesKey::new("GOLD", "1h"), history);
//!
//! let config = SearchConfig::new().asset("GOLD").timeframe("1h").outcome_length(20);
//! let results = search(&reference, &series, &config).unwrap();
//! assert_eq!(results[0].similarity, 100);
//! ```

pub mod params;
pub mod scorer;
pub mod search;
pub mod trade;

pub mod prelude {
    pub use crate::{
        // Configuration
        params::{get_count, get_percent, ParamMeta, ParamType},
        // Scoring
        scorer::{
            approximate_series_even_indices, count_broken_rules_against, find_optimal_k,
            generate_pairwise_rules, pairwise_rules, resolution_profile, score, BrokenRules,
            OrdinalRule, Relation, ResolutionScore, SampledApproximation, ScoreScratch,
            SimilarityReport,
        },
        // Search
        search::{
            available_assets, available_timeframes, candles_in_range, filter_by_threshold,
            score_batch, search, search_parallel, SearchConfig, SearchError, SearchResult,
            SeriesKey, SeriesMap,
        },
        // Virtual transactions
        trade::{simulate, trade_statistics, Position, TradeOutcome, TradeResult, TradeStats, VirtualTrade},
        // Types
        Candle,
        // Errors
        MatchError,
        Outcome,
        Percent,
        Result,
        OHLCVExt,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, MatchError>;

/// Errors that can occur while scoring or searching
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} points, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Non-finite value at index {index}")]
    NonFinite { index: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Invalid candle in series {key} at index {index}: {reason}")]
    InvalidSeries {
        key: String,
        index: usize,
        reason: &'static str,
    },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Whole percentage in range 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(u32);

impl Percent {
    /// Create a new Percent, validating the value is at most 100
    pub fn new(value: u32) -> Result<Self> {
        if value > 100 {
            return Err(MatchError::OutOfRange {
                field: "Percent",
                value: value as f64,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl serde::Serialize for Percent {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = u32::deserialize(d)?;
        Percent::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
///
/// Scoring reads only `close`; virtual trades also read `high` and `low`.
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Unix timestamp in milliseconds
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> f64 {
        (**self).volume()
    }

    fn timestamp(&self) -> Option<i64> {
        (**self).timestamp()
    }
}

/// Extension trait for OHLCV integrity checks
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Validate OHLCV data consistency
    ///
    /// Errors carry index 0; callers that know the bar's position rewrite it.
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(MatchError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(MatchError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.range() < 0.0 {
            return Err(MatchError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// Plain candle for callers without their own bar type
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    /// Unix milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume: 0.0,
            timestamp: None,
        }
    }

    /// Flat candle where every price equals `close`
    pub fn from_close(close: f64) -> Self {
        Self::new(close, close, close, close)
    }

    pub fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

// ============================================================
// OUTCOME
// ============================================================

/// Coarse label for what price did after a matched window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Bullish,
    Neutral,
    Bearish,
}

impl Outcome {
    /// Move (in percent) that must be exceeded before a label leaves Neutral
    pub const THRESHOLD_PCT: f64 = 2.0;

    /// Label the move from the last setup close to the last outcome close.
    ///
    /// A zero `setup_close` yields a non-finite change; NaN falls through to
    /// Neutral.
    pub fn classify(setup_close: f64, outcome_close: f64) -> Self {
        match price_change_pct(setup_close, outcome_close) {
            c if c > Self::THRESHOLD_PCT => Outcome::Bullish,
            c if c < -Self::THRESHOLD_PCT => Outcome::Bearish,
            _ => Outcome::Neutral,
        }
    }

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Outcome::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Outcome::Bearish)
    }
}

/// Percentage change from `from` to `to`
#[inline]
pub fn price_change_pct(from: f64, to: f64) -> f64 {
    (to - from) / from * 100.0
}

// ============================================================
// TESTS
// ============================================================
