//! Ordinal shape similarity between two numeric series.
//!
//! For every resolution `k` in `2..=n` both series are sampled down to `k`
//! evenly spaced points (endpoints included). Every pairwise up/equal/down
//! relation of the first sample becomes a rule; the rules the second sample
//! breaks are summed with a weight that shrinks for later positions. The
//! ratio for a resolution is that weighted sum over the rule count, plus a
//! penalty for how many full-length rules the resolution leaves unchecked:
//!
//! ```text
//! ratio(k) = weighted_broken(k) / rules(k) + (rules(n) - rules(k)) / rules(n)
//! ```
//!
//! The lowest ratio wins (ties within [`TIE_TOLERANCE`] go to the larger k)
//! and `similarity = 1 - ratio`.
//!
//! The first argument supplies the rules and the second is tested against
//! them. Because a rule is broken exactly when the two relations differ, the
//! resulting score does not change when the arguments are swapped.

mod approximation;
mod rules;

pub use approximation::{approximate_series_even_indices, SampledApproximation};
pub use rules::{
    count_broken_rules_against, generate_pairwise_rules, pairwise_rules, rule_count, BrokenRules,
    OrdinalRule, Relation,
};

use approximation::even_indices_into;
use tracing::warn;

use crate::{MatchError, Result};

/// Ratios closer than this are treated as equal during resolution selection
pub const TIE_TOLERANCE: f64 = 1e-9;

/// Minimum number of points a comparison needs
pub const MIN_SERIES_LEN: usize = 2;

// ============================================================
// REPORTS
// ============================================================

/// Outcome of one scorer invocation
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimilarityReport {
    /// Compared length after truncation to the common prefix
    pub n: usize,
    /// Chosen resolution
    pub k: usize,
    /// Weighted broken-rule sum at `k`
    pub weighted_broken: f64,
    /// Unweighted broken-rule count at `k`
    pub broken_rules: usize,
    /// Rules checked at `k`
    pub total_rules: usize,
    pub ratio: f64,
    /// `1 - ratio`, not clamped
    pub similarity: f64,
}

impl SimilarityReport {
    /// Similarity as a whole percentage clamped to `0..=100`
    #[inline]
    pub fn percentage(&self) -> u32 {
        (self.similarity * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

/// Diagnostics for a single resolution
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ResolutionScore {
    pub k: usize,
    pub weighted_broken: f64,
    pub broken_rules: usize,
    pub total_rules: usize,
    pub ratio: f64,
}

// ============================================================
// PUBLIC OPERATIONS
// ============================================================

/// Score how well `b` preserves the ordinal shape of `a`.
///
/// Series of different length are both truncated to the shorter length,
/// keeping the prefix. Fails on empty input, fewer than two common points
/// or non-finite values.
pub fn score(a: &[f64], b: &[f64]) -> Result<(f64, SimilarityReport)> {
    ScoreScratch::new().score(a, b)
}

/// Same selection as [`score`], returning only the report.
pub fn find_optimal_k(a: &[f64], b: &[f64]) -> Result<SimilarityReport> {
    score(a, b).map(|(_, report)| report)
}

/// Ratio diagnostics for every resolution `2..=n`.
pub fn resolution_profile(a: &[f64], b: &[f64]) -> Result<Vec<ResolutionScore>> {
    let (a, b) = common_prefix(a, b)?;
    let mut scratch = ScoreScratch::new();
    let full_rules = rule_count(a.len()) as f64;
    Ok((MIN_SERIES_LEN..=a.len())
        .map(|k| scratch.resolve(a, b, k, full_rules))
        .collect())
}

// ============================================================
// SCRATCH
// ============================================================

/// Reusable buffers for repeated scoring.
///
/// Holding one across many calls (as the window scan does) keeps scoring
/// free of per-call allocation once the buffers have grown.
#[derive(Debug, Clone, Default)]
pub struct ScoreScratch {
    indices: Vec<usize>,
    values_a: Vec<f64>,
    values_b: Vec<f64>,
}

impl ScoreScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`score`], reusing this scratch's buffers.
    pub fn score(&mut self, a: &[f64], b: &[f64]) -> Result<(f64, SimilarityReport)> {
        let (a, b) = common_prefix(a, b)?;
        let report = self.score_prevalidated(a, b);
        Ok((report.similarity, report))
    }

    /// Caller guarantees equal lengths of at least two and finite values.
    pub(crate) fn score_prevalidated(&mut self, a: &[f64], b: &[f64]) -> SimilarityReport {
        debug_assert_eq!(a.len(), b.len());
        debug_assert!(a.len() >= MIN_SERIES_LEN);

        let n = a.len();
        let full_rules = rule_count(n) as f64;

        let mut best = self.resolve(a, b, MIN_SERIES_LEN, full_rules);
        for k in (MIN_SERIES_LEN + 1)..=n {
            let candidate = self.resolve(a, b, k, full_rules);
            let tied = (candidate.ratio - best.ratio).abs() < TIE_TOLERANCE;
            if candidate.ratio < best.ratio || (tied && candidate.k > best.k) {
                best = candidate;
            }
        }

        SimilarityReport {
            n,
            k: best.k,
            weighted_broken: best.weighted_broken,
            broken_rules: best.broken_rules,
            total_rules: best.total_rules,
            ratio: best.ratio,
            similarity: 1.0 - best.ratio,
        }
    }

    fn resolve(&mut self, a: &[f64], b: &[f64], k: usize, full_rules: f64) -> ResolutionScore {
        // Equal lengths give both series the same sampled positions
        even_indices_into(a.len(), k, &mut self.indices);

        self.values_a.clear();
        self.values_a.extend(self.indices.iter().map(|&i| a[i]));
        self.values_b.clear();
        self.values_b.extend(self.indices.iter().map(|&i| b[i]));

        let total = rule_count(self.values_a.len());
        let broken = rules::tally(&self.values_b, pairwise_rules(&self.values_a), total);
        let ratio = broken.weighted / total as f64 + (full_rules - total as f64) / full_rules;

        ResolutionScore {
            k,
            weighted_broken: broken.weighted,
            broken_rules: broken.count,
            total_rules: total,
            ratio,
        }
    }
}

// ============================================================
// VALIDATION
// ============================================================

/// Truncate both series to their common prefix and validate it.
fn common_prefix<'a>(a: &'a [f64], b: &'a [f64]) -> Result<(&'a [f64], &'a [f64])> {
    if a.is_empty() || b.is_empty() {
        return Err(MatchError::InsufficientData {
            need: MIN_SERIES_LEN,
            got: 0,
        });
    }

    let n = a.len().min(b.len());
    if a.len() != b.len() {
        warn!(
            len_a = a.len(),
            len_b = b.len(),
            "series lengths differ, truncating to common prefix"
        );
    }
    if n < MIN_SERIES_LEN {
        return Err(MatchError::InsufficientData {
            need: MIN_SERIES_LEN,
            got: n,
        });
    }

    let (a, b) = (&a[..n], &b[..n]);
    ensure_finite(a)?;
    ensure_finite(b)?;
    Ok((a, b))
}

/// Fail on the first NaN or infinite value.
pub(crate) fn ensure_finite(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(MatchError::NonFinite { index }),
        None => Ok(()),
    }
}

// ============================================================
// TESTS
// ============================================================
