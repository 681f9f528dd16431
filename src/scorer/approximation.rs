//! Evenly spaced sampling of a series at a target point count.

/// A `k`-point sample of a series that always keeps both endpoints
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SampledApproximation {
    /// Strictly increasing positions into the source series
    pub indices: Vec<usize>,
    /// Source values at `indices`
    pub values: Vec<f64>,
}

impl SampledApproximation {
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Sample `k` points of `series`, including the first and last.
///
/// With `k >= series.len()` every position is kept.
pub fn approximate_series_even_indices(series: &[f64], k: usize) -> SampledApproximation {
    let mut indices = Vec::with_capacity(k.min(series.len()));
    even_indices_into(series.len(), k, &mut indices);
    let values = indices.iter().map(|&i| series[i]).collect();
    SampledApproximation { indices, values }
}

/// Write the sampled positions for a series of length `n` into `out`.
pub(crate) fn even_indices_into(n: usize, k: usize, out: &mut Vec<usize>) {
    out.clear();
    if k >= n {
        out.extend(0..n);
        return;
    }
    match k {
        0 => return,
        1 => {
            out.push(0);
            return;
        }
        _ => {}
    }

    out.extend((0..k).map(|i| even_position(i, n, k)));
    out.sort_unstable();
    out.dedup();

    // Rounding collisions: top up with the lowest unused positions
    if out.len() < k {
        let mut fill = 0;
        while out.len() < k {
            if out.binary_search(&fill).is_err() {
                out.push(fill);
                out.sort_unstable();
            }
            fill += 1;
        }
    }
}

/// `round(i * (n - 1) / (k - 1))`, exact at both endpoints
#[inline]
fn even_position(i: usize, n: usize, k: usize) -> usize {
    ((i * (n - 1)) as f64 / (k - 1) as f64).round() as usize
}
