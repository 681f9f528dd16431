//! Parameter metadata for the search configuration
//!
//! This module describes the numeric search knobs, enabling:
//! - Threshold sweeps (grid generation)
//! - Parameter documentation
//! - Building a configuration from a flat name → value map
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use candlematch::prelude::*;
//!
//! for param in SearchConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let params = HashMap::from([("similarity_threshold", 85.0), ("outcome_length", 20.0)]);
//! let config = SearchConfig::new().with_params(&params).unwrap();
//! assert_eq!(config.similarity_threshold.get(), 85);
//! assert_eq!(config.outcome_length, 20);
//! ```

use std::collections::HashMap;

use crate::{
  search::{SearchConfig, DEFAULT_MAX_RESULTS, DEFAULT_OUTCOME_LENGTH, DEFAULT_SIMILARITY_THRESHOLD},
  MatchError, Percent, Result,
};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Whole percentage, 0..=100
  Percent,
  /// Positive integer count
  Count,
}

/// Metadata for a single search parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "similarity_threshold")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for sweeps: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn percent(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Percent, default, range, description }
  }

  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  /// Generate all values for a sweep
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(MatchError::OutOfRange { field: self.name, value, min, max });
    }
    if value.fract() != 0.0 {
      return Err(MatchError::InvalidValue("parameter must be a whole number"));
    }
    Ok(())
  }
}

const SEARCH_PARAMS: &[ParamMeta] = &[
  ParamMeta::percent(
    "similarity_threshold",
    DEFAULT_SIMILARITY_THRESHOLD as f64,
    (0.0, 100.0, 5.0),
    "Minimum similarity (percent) for a window to be reported",
  ),
  ParamMeta::count(
    "outcome_length",
    DEFAULT_OUTCOME_LENGTH as f64,
    (1.0, 1000.0, 10.0),
    "Candles captured after each match",
  ),
  ParamMeta::count(
    "max_results",
    DEFAULT_MAX_RESULTS as f64,
    (1.0, 10_000.0, 10.0),
    "Maximum number of results returned",
  ),
];

impl SearchConfig {
  /// Metadata for every numeric parameter
  pub fn param_meta() -> &'static [ParamMeta] {
    SEARCH_PARAMS
  }

  /// Override numeric parameters from a map.
  ///
  /// Missing parameters keep their current values; unknown names are ignored.
  pub fn with_params(mut self, params: &HashMap<&str, f64>) -> Result<Self> {
    for meta in SEARCH_PARAMS {
      if let Some(&value) = params.get(meta.name) {
        meta.validate(value)?;
      }
    }
    self.similarity_threshold =
      get_percent(params, "similarity_threshold", self.similarity_threshold.get())?;
    self.outcome_length = get_count(params, "outcome_length", self.outcome_length)?;
    self.max_results = get_count(params, "max_results", self.max_results)?;
    Ok(self)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Percent from params with default fallback
pub fn get_percent(params: &HashMap<&str, f64>, key: &str, default: u32) -> Result<Percent> {
  match params.get(key) {
    Some(&value) if value < 0.0 || value.fract() != 0.0 => {
      Err(MatchError::InvalidValue("Percent must be a whole number in 0..=100"))
    },
    Some(&value) => Percent::new(value as u32),
    None => Percent::new(default),
  }
}

/// Helper to get a positive count from params with default fallback
pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<usize> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 1.0 || value.fract() != 0.0 {
    return Err(MatchError::InvalidValue("count must be a positive integer"));
  }
  Ok(value as usize)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_defaults_match_config() {
    let config = SearchConfig::default();
    let meta = SearchConfig::param_meta();

    assert_eq!(meta.len(), 3);
    assert_eq!(meta[0].default, config.similarity_threshold.get() as f64);
    assert_eq!(meta[1].default, config.outcome_length as f64);
    assert_eq!(meta[2].default, config.max_results as f64);
    assert_eq!(meta[0].param_type, ParamType::Percent);
    assert_eq!(meta[1].param_type, ParamType::Count);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::percent("test", 80.0, (80.0, 100.0, 10.0), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid, vec![80.0, 90.0, 100.0]);
  }

  #[test]
  fn test_threshold_grid_covers_range() {
    let grid = SearchConfig::param_meta()[0].generate_grid();
    assert_eq!(grid.len(), 21);
    assert_eq!(grid[0], 0.0);
    assert_eq!(grid[20], 100.0);
  }

  #[test]
  fn test_validate() {
    let meta = ParamMeta::count("test", 20.0, (1.0, 50.0, 1.0), "Test");

    assert!(meta.validate(1.0).is_ok());
    assert!(meta.validate(50.0).is_ok());
    assert!(meta.validate(0.0).is_err());
    assert!(meta.validate(51.0).is_err());
    assert!(meta.validate(2.5).is_err());
    assert!(meta.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_with_params() {
    let params = HashMap::from([("similarity_threshold", 90.0), ("max_results", 5.0), ("unknown", 1.0)]);
    let config = SearchConfig::new().asset("GOLD").with_params(&params).unwrap();

    assert_eq!(config.similarity_threshold.get(), 90);
    assert_eq!(config.max_results, 5);
    assert_eq!(config.outcome_length, DEFAULT_OUTCOME_LENGTH);
    assert_eq!(config.assets, vec!["GOLD".to_string()]);
  }

  #[test]
  fn test_with_params_rejects_out_of_range() {
    let params = HashMap::from([("similarity_threshold", 120.0)]);
    assert!(SearchConfig::new().with_params(&params).is_err());

    let params = HashMap::from([("outcome_length", 0.0)]);
    assert!(SearchConfig::new().with_params(&params).is_err());
  }

  #[test]
  fn test_get_percent_helper() {
    let params = HashMap::from([("key1", 85.0), ("bad", 85.5)]);

    assert_eq!(get_percent(&params, "key1", 70).unwrap().get(), 85);
    assert_eq!(get_percent(&params, "key2", 70).unwrap().get(), 70);
    assert!(get_percent(&params, "bad", 70).is_err());
  }

  #[test]
  fn test_get_count_helper() {
    let params = HashMap::from([("key1", 20.0), ("zero", 0.0)]);

    assert_eq!(get_count(&params, "key1", 80).unwrap(), 20);
    assert_eq!(get_count(&params, "key2", 80).unwrap(), 80);
    assert!(get_count(&params, "zero", 80).is_err());
  }
}
