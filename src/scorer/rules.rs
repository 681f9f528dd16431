//! Pairwise ordinal rules and broken-rule counting.

use std::cmp::Ordering;

/// How a later point compares to an earlier one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Relation {
    Less,
    Equal,
    Greater,
}

impl Relation {
    /// Relation of `later` to `earlier`. Unordered values (NaN) count as Equal.
    #[inline]
    pub fn between(earlier: f64, later: f64) -> Self {
        match later.partial_cmp(&earlier) {
            Some(Ordering::Greater) => Relation::Greater,
            Some(Ordering::Less) => Relation::Less,
            _ => Relation::Equal,
        }
    }

    /// `+1`, `0` or `-1`
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Relation::Greater => 1,
            Relation::Equal => 0,
            Relation::Less => -1,
        }
    }
}

/// "value at `j` compares to value at `i` as `rel`", with `i < j`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct OrdinalRule {
    pub i: usize,
    pub j: usize,
    pub rel: Relation,
}

impl OrdinalRule {
    /// Whether `values` satisfy this rule
    #[inline]
    pub fn holds_for(&self, values: &[f64]) -> bool {
        Relation::between(values[self.i], values[self.j]) == self.rel
    }
}

/// Number of rules for `k` points: `k * (k - 1) / 2`
#[inline]
pub fn rule_count(k: usize) -> usize {
    k * k.saturating_sub(1) / 2
}

/// Lazily yield every rule of `values`, ordered by `i` then `j`.
pub fn pairwise_rules(values: &[f64]) -> impl Iterator<Item = OrdinalRule> + '_ {
    (0..values.len()).flat_map(move |i| {
        ((i + 1)..values.len()).map(move |j| OrdinalRule {
            i,
            j,
            rel: Relation::between(values[i], values[j]),
        })
    })
}

/// Collect every rule of `values`.
pub fn generate_pairwise_rules(values: &[f64]) -> Vec<OrdinalRule> {
    let mut rules = Vec::with_capacity(rule_count(values.len()));
    rules.extend(pairwise_rules(values));
    rules
}

/// Tally of rules that a target sample violates
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct BrokenRules {
    /// Sum of `(total - j + 1) / total` over broken rules
    pub weighted: f64,
    /// Plain number of broken rules
    pub count: usize,
}

/// Check `rules` against `target` (a sample with the same point count the
/// rules were built from).
///
/// Each broken rule weighs `(total - j + 1) / total` where `total` is
/// `rules.len()`.
pub fn count_broken_rules_against(target: &[f64], rules: &[OrdinalRule]) -> BrokenRules {
    tally(target, rules.iter().copied(), rules.len())
}

pub(crate) fn tally<I>(target: &[f64], rules: I, total: usize) -> BrokenRules
where
    I: IntoIterator<Item = OrdinalRule>,
{
    let mut broken = BrokenRules::default();
    if total == 0 {
        return broken;
    }
    let total_f = total as f64;

    for rule in rules {
        if !rule.holds_for(target) {
            broken.weighted += (total_f - rule.j as f64 + 1.0) / total_f;
            broken.count += 1;
        }
    }

    broken
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_between() {
        assert_eq!(Relation::between(1.0, 2.0), Relation::Greater);
        assert_eq!(Relation::between(2.0, 1.0), Relation::Less);
        assert_eq!(Relation::between(1.0, 1.0), Relation::Equal);
        assert_eq!(Relation::between(1.0, f64::NAN), Relation::Equal);
        assert_eq!(Relation::Greater.sign(), 1);
        assert_eq!(Relation::Less.sign(), -1);
    }

    #[test]
    fn test_rule_count() {
        assert_eq!(rule_count(0), 0);
        assert_eq!(rule_count(1), 0);
        assert_eq!(rule_count(2), 1);
        assert_eq!(rule_count(5), 10);
    }

    #[test]
    fn test_generate_rules() {
        let rules = generate_pairwise_rules(&[1.0, 3.0, 3.0]);
        assert_eq!(
            rules,
            vec![
                OrdinalRule { i: 0, j: 1, rel: Relation::Greater },
                OrdinalRule { i: 0, j: 2, rel: Relation::Greater },
                OrdinalRule { i: 1, j: 2, rel: Relation::Equal },
            ]
        );
    }

    #[test]
    fn test_iterator_matches_vec() {
        let values = [5.0, 1.0, 4.0, 4.0, 9.0, 2.0];
        let collected: Vec<_> = pairwise_rules(&values).collect();
        assert_eq!(collected, generate_pairwise_rules(&values));
        assert_eq!(collected.len(), rule_count(values.len()));
        assert!(collected.iter().all(|r| r.i < r.j));
    }

    #[test]
    fn test_no_broken_rules_on_self() {
        let values = [2.0, 7.0, 1.0, 8.0];
        let rules = generate_pairwise_rules(&values);
        assert_eq!(count_broken_rules_against(&values, &rules), BrokenRules::default());
    }

    #[test]
    fn test_weight_shrinks_with_later_index() {
        // total = 3; rules (0,1) w=1, (0,2) w=2/3, (1,2) w=2/3
        let rules = generate_pairwise_rules(&[1.0, 2.0, 3.0]);
        let broken = count_broken_rules_against(&[3.0, 2.0, 1.0], &rules);
        assert_eq!(broken.count, 3);
        assert!((broken.weighted - (1.0 + 2.0 / 3.0 + 2.0 / 3.0)).abs() < 1e-12);

        // Only the late pair flips
        let broken = count_broken_rules_against(&[1.0, 3.0, 2.0], &rules);
        assert_eq!(broken.count, 1);
        assert!((broken.weighted - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rules() {
        assert_eq!(count_broken_rules_against(&[1.0], &[]), BrokenRules::default());
    }
}
