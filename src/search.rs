//! Sliding-window pattern search over keyed historical series.
//!
//! # Example
//!
//! ```rust
//! use candlematch::prelude::*;
//!
//! let history: Vec<Candle> = (0..120).map(|i| Candle::from_close(50.0 + (i % 7) as f64)).collect();
//! let reference = history[3..10].to_vec();
//!
//! let mut series = SeriesMap::new();
//! series.insert(SeriesKey::new("SPX", "1d"), history);
//!
//! let config = SearchConfig::new()
//!     .asset("SPX")
//!     .timeframe("1d")
//!     .similarity_threshold(Percent::new(95).unwrap())
//!     .outcome_length(10)
//!     .max_results(5);
//!
//! let results = search(&reference, &series, &config).unwrap();
//! assert_eq!(results.len(), 5);
//! assert!(results.iter().all(|r| r.similarity >= 95));
//! ```

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    str::FromStr,
};

use chrono::{DateTime, Timelike, Utc};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    scorer::{ensure_finite, ScoreScratch, MIN_SERIES_LEN},
    MatchError, OHLCVExt, Outcome, Percent, Result, OHLCV,
};

/// Default minimum similarity (percent) for a window to qualify
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 70;
/// Default number of candles captured after a match
pub const DEFAULT_OUTCOME_LENGTH: usize = 80;
/// Default cap on returned results
pub const DEFAULT_MAX_RESULTS: usize = 50;

// ============================================================
// SERIES KEYS
// ============================================================

/// Asset × timeframe identifier, rendered as `ASSET_TIMEFRAME`
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct SeriesKey {
    pub asset: String,
    pub timeframe: String,
}

impl SeriesKey {
    pub fn new(asset: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            timeframe: timeframe.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.asset, self.timeframe)
    }
}

impl FromStr for SeriesKey {
    type Err = MatchError;

    /// Splits on the last underscore, so assets may contain underscores.
    fn from_str(s: &str) -> Result<Self> {
        match s.rsplit_once('_') {
            Some((asset, timeframe)) if !asset.is_empty() && !timeframe.is_empty() => {
                Ok(Self::new(asset, timeframe))
            }
            _ => Err(MatchError::InvalidValue(
                "series key must look like ASSET_TIMEFRAME",
            )),
        }
    }
}

/// Read-only table of full historical series
pub type SeriesMap<T> = HashMap<SeriesKey, Vec<T>>;

// ============================================================
// CONFIGURATION
// ============================================================

/// Search configuration
///
/// Deserializes with defaults for every missing field.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Asset identifiers to scan, in order
    pub assets: Vec<String>,
    /// Timeframe identifiers to scan for each asset, in order
    pub timeframes: Vec<String>,
    /// Inclusive lower bound on candle timestamps
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on candle timestamps
    pub date_to: Option<DateTime<Utc>>,
    /// Hour-of-day filter. Carried for the caller, never evaluated here.
    pub time_of_day: Option<String>,
    pub similarity_threshold: Percent,
    /// Candles captured after each match
    pub outcome_length: usize,
    pub max_results: usize,
    /// Skip windows whose span crosses candles removed by the date filter
    pub reject_gapped_windows: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            timeframes: Vec::new(),
            date_from: None,
            date_to: None,
            time_of_day: None,
            similarity_threshold: Percent::new_const(DEFAULT_SIMILARITY_THRESHOLD),
            outcome_length: DEFAULT_OUTCOME_LENGTH,
            max_results: DEFAULT_MAX_RESULTS,
            reject_gapped_windows: false,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset to the selection
    pub fn asset(mut self, asset: impl Into<String>) -> Self {
        self.assets.push(asset.into());
        self
    }

    /// Add a timeframe to the selection
    pub fn timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframes.push(timeframe.into());
        self
    }

    pub fn date_from(mut self, from: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self
    }

    pub fn date_to(mut self, to: DateTime<Utc>) -> Self {
        self.date_to = Some(to);
        self
    }

    pub fn time_of_day(mut self, time_of_day: impl Into<String>) -> Self {
        self.time_of_day = Some(time_of_day.into());
        self
    }

    pub fn similarity_threshold(mut self, threshold: Percent) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn outcome_length(mut self, length: usize) -> Self {
        self.outcome_length = length;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn reject_gapped_windows(mut self, enable: bool) -> Self {
        self.reject_gapped_windows = enable;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.outcome_length == 0 {
            return Err(MatchError::InvalidConfig(
                "outcome_length must be > 0".to_string(),
            ));
        }
        if self.max_results == 0 {
            return Err(MatchError::InvalidConfig(
                "max_results must be > 0".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(MatchError::InvalidConfig(format!(
                    "date_from {from} is after date_to {to}"
                )));
            }
        }
        Ok(())
    }

    /// Every selected asset × timeframe pair, assets outermost.
    pub fn series_keys(&self) -> impl Iterator<Item = SeriesKey> + '_ {
        self.assets.iter().flat_map(move |asset| {
            self.timeframes
                .iter()
                .map(move |timeframe| SeriesKey::new(asset.as_str(), timeframe.as_str()))
        })
    }

    fn has_date_bounds(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }
}

// ============================================================
// RESULTS
// ============================================================

/// One qualifying window
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchResult<T> {
    /// `ASSET_TIMEFRAME_OFFSET`
    pub id: String,
    /// Whole percent, 0..=100
    pub similarity: u32,
    pub asset: String,
    pub timeframe: String,
    /// Timestamp of the first setup candle, when it has one
    pub date: Option<DateTime<Utc>>,
    pub outcome: Outcome,
    pub setup_candles: Vec<T>,
    pub outcome_candles: Vec<T>,
    /// First setup candle, as an offset into the date-filtered series
    pub start_index: usize,
    /// Last setup candle (inclusive), same coordinates as `start_index`
    pub end_index: usize,
    /// First setup candle, as an offset into the unfiltered series
    pub source_index: usize,
}

impl<T> SearchResult<T> {
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(self.asset.as_str(), self.timeframe.as_str())
    }

    /// UTC hour of the first setup candle, for callers applying a
    /// time-of-day filter.
    pub fn hour(&self) -> Option<u32> {
        self.date.map(|d| d.hour())
    }
}

/// Per-series failure from [`search_parallel`]
#[derive(Debug, Clone)]
pub struct SearchError {
    pub key: SeriesKey,
    pub error: MatchError,
}

// ============================================================
// SEARCH
// ============================================================

/// Scan every selected series for windows shaped like `reference`.
///
/// Missing or too-short series are skipped. Results are sorted by
/// similarity (descending, stable) and capped at `config.max_results`.
pub fn search<T: OHLCV + Clone>(
    reference: &[T],
    series_map: &SeriesMap<T>,
    config: &SearchConfig,
) -> Result<Vec<SearchResult<T>>> {
    config.validate()?;
    let reference = reference_closes(reference)?;

    let mut scratch = ScoreScratch::new();
    let mut results = Vec::new();

    for key in config.series_keys() {
        let Some(candles) = series_map.get(&key) else {
            debug!(series = %key, "no data for selection, skipping");
            continue;
        };
        scan_series(&reference, &key, candles, config, &mut scratch, &mut results)?;
    }

    Ok(rank(results, config.max_results))
}

/// [`search`] with one rayon task per series.
///
/// A series with invalid data is reported in the error list instead of
/// failing the whole call. Successful results are ordered exactly as
/// [`search`] orders them.
pub fn search_parallel<T>(
    reference: &[T],
    series_map: &SeriesMap<T>,
    config: &SearchConfig,
) -> Result<(Vec<SearchResult<T>>, Vec<SearchError>)>
where
    T: OHLCV + Clone + Send + Sync,
{
    config.validate()?;
    let reference = reference_closes(reference)?;

    let keys: Vec<SeriesKey> = config.series_keys().collect();
    let scanned: Vec<_> = keys
        .into_par_iter()
        .filter_map(|key| {
            let candles = series_map.get(&key)?;
            let mut scratch = ScoreScratch::new();
            let mut found = Vec::new();
            Some(
                scan_series(&reference, &key, candles, config, &mut scratch, &mut found)
                    .map(|()| found)
                    .map_err(|error| SearchError { key, error }),
            )
        })
        .collect();

    let mut results = Vec::new();
    let mut errors = Vec::new();

    for outcome in scanned {
        match outcome {
            Ok(found) => results.extend(found),
            Err(e) => errors.push(e),
        }
    }

    Ok((rank(results, config.max_results), errors))
}

/// Similarity percentages of each candidate against `reference`.
pub fn score_batch<T: OHLCV>(reference: &[T], candidates: &[&[T]]) -> Result<Vec<u32>> {
    let reference: Vec<f64> = reference.iter().map(|c| c.close()).collect();
    let mut scratch = ScoreScratch::new();
    let mut closes = Vec::new();

    candidates
        .iter()
        .map(|candidate| {
            closes.clear();
            closes.extend(candidate.iter().map(|c| c.close()));
            scratch.score(&reference, &closes).map(|(_, report)| report.percentage())
        })
        .collect()
}

/// Keep results at or above `threshold`, preserving order.
pub fn filter_by_threshold<T>(
    results: Vec<SearchResult<T>>,
    threshold: Percent,
) -> Vec<SearchResult<T>> {
    results
        .into_iter()
        .filter(|r| r.similarity >= threshold.get())
        .collect()
}

// ============================================================
// CATALOGUE
// ============================================================

/// Distinct assets present in the map, sorted
pub fn available_assets<T>(series_map: &SeriesMap<T>) -> Vec<String> {
    series_map
        .keys()
        .map(|k| k.asset.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct timeframes present for `asset`, sorted
pub fn available_timeframes<T>(series_map: &SeriesMap<T>, asset: &str) -> Vec<String> {
    series_map
        .keys()
        .filter(|k| k.asset == asset)
        .map(|k| k.timeframe.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Candles of one series within inclusive date bounds.
///
/// Candles without a timestamp are always kept. An absent series yields an
/// empty list.
pub fn candles_in_range<'a, T: OHLCV>(
    series_map: &'a SeriesMap<T>,
    key: &SeriesKey,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<&'a T> {
    let bounds = DateBounds::new(from, to);
    series_map
        .get(key)
        .map(|candles| candles.iter().filter(|c| bounds.contains(c.timestamp())).collect())
        .unwrap_or_default()
}

// ============================================================
// INTERNALS
// ============================================================

#[derive(Debug, Clone, Copy)]
struct DateBounds {
    from: Option<i64>,
    to: Option<i64>,
}

impl DateBounds {
    fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self {
            from: from.map(|d| d.timestamp_millis()),
            to: to.map(|d| d.timestamp_millis()),
        }
    }

    fn contains(&self, timestamp: Option<i64>) -> bool {
        let Some(ts) = timestamp else {
            return true;
        };
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

fn reference_closes<T: OHLCV>(reference: &[T]) -> Result<Vec<f64>> {
    if reference.len() < MIN_SERIES_LEN {
        return Err(MatchError::InsufficientData {
            need: MIN_SERIES_LEN,
            got: reference.len(),
        });
    }
    let closes: Vec<f64> = reference.iter().map(|c| c.close()).collect();
    ensure_finite(&closes)?;
    Ok(closes)
}

/// Scan one series, appending qualifying windows to `out`.
fn scan_series<T: OHLCV + Clone>(
    reference: &[f64],
    key: &SeriesKey,
    candles: &[T],
    config: &SearchConfig,
    scratch: &mut ScoreScratch,
    out: &mut Vec<SearchResult<T>>,
) -> Result<()> {
    let pattern_len = reference.len();
    let span = pattern_len + config.outcome_length;

    if candles.len() < span {
        debug!(series = %key, candles = candles.len(), need = span, "series too short, skipping");
        return Ok(());
    }

    // Positions into `candles` that survive the date filter
    let kept: Vec<usize> = if config.has_date_bounds() {
        let bounds = DateBounds::new(config.date_from, config.date_to);
        (0..candles.len())
            .filter(|&i| bounds.contains(candles[i].timestamp()))
            .collect()
    } else {
        (0..candles.len()).collect()
    };

    let closes: Vec<f64> = kept.iter().map(|&i| candles[i].close()).collect();
    ensure_finite(&closes).map_err(|e| match e {
        MatchError::NonFinite { index } => MatchError::InvalidSeries {
            key: key.to_string(),
            index: kept[index],
            reason: "non-finite close",
        },
        other => other,
    })?;
    for &i in &kept {
        candles[i].validate().map_err(|e| match e {
            MatchError::InvalidOHLCV { reason, .. } => MatchError::InvalidSeries {
                key: key.to_string(),
                index: i,
                reason,
            },
            other => other,
        })?;
    }

    if closes.len() < span {
        debug!(
            series = %key,
            kept = closes.len(),
            need = span,
            "too few candles in date range, skipping"
        );
        return Ok(());
    }

    let threshold = config.similarity_threshold.get();
    let windows = closes.len() - span + 1;
    let mut matches = 0usize;

    for offset in 0..windows {
        let last = offset + span - 1;
        if config.reject_gapped_windows && kept[last] - kept[offset] != span - 1 {
            continue;
        }

        let setup_end = offset + pattern_len;
        let report = scratch.score_prevalidated(reference, &closes[offset..setup_end]);
        let similarity = report.percentage();
        if similarity < threshold {
            continue;
        }

        let pick = |positions: &[usize]| -> Vec<T> {
            positions.iter().map(|&i| candles[i].clone()).collect()
        };

        out.push(SearchResult {
            id: format!("{key}_{offset}"),
            similarity,
            asset: key.asset.clone(),
            timeframe: key.timeframe.clone(),
            date: candles[kept[offset]]
                .timestamp()
                .and_then(DateTime::from_timestamp_millis),
            outcome: Outcome::classify(closes[setup_end - 1], closes[last]),
            setup_candles: pick(&kept[offset..setup_end]),
            outcome_candles: pick(&kept[setup_end..=last]),
            start_index: offset,
            end_index: setup_end - 1,
            source_index: kept[offset],
        });
        matches += 1;
    }

    debug!(series = %key, windows, matches, "scanned series");
    Ok(())
}

/// Stable sort by similarity (descending), then cap.
fn rank<T>(mut results: Vec<SearchResult<T>>, max_results: usize) -> Vec<SearchResult<T>> {
    let found = results.len();
    results.sort_by(|a, b| b.similarity.cmp(&a.similarity));
    results.truncate(max_results);
    info!(found, returned = results.len(), "similarity search finished");
    results
}
