//! Benchmarks for similarity scoring and window search.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use candlematch::prelude::*;

/// Generate deterministic hourly candles
fn generate_candles(n: usize, seed: usize) -> Vec<Candle> {
  let mut candles = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = (((i + seed) * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let open = price;
    let close = price + change;
    let high = open.max(close) + volatility * 0.5;
    let low = open.min(close) - volatility * 0.5;

    candles.push(Candle::new(open, high, low, close).with_timestamp(i as i64 * 3_600_000));
    price = close;
  }

  candles
}

fn closes(candles: &[Candle]) -> Vec<f64> {
  candles.iter().map(|c| c.close).collect()
}

fn bench_score(c: &mut Criterion) {
  let a = closes(&generate_candles(10, 0));
  let b = closes(&generate_candles(10, 17));

  c.bench_function("score_10_points", |bench| {
    bench.iter(|| {
      let _ = black_box(score(black_box(&a), black_box(&b)));
    })
  });

  let mut scratch = ScoreScratch::new();
  c.bench_function("score_10_points_scratch", |bench| {
    bench.iter(|| {
      let _ = black_box(scratch.score(black_box(&a), black_box(&b)));
    })
  });
}

fn bench_pattern_length(c: &mut Criterion) {
  let mut group = c.benchmark_group("pattern_length");

  for len in [5, 10, 20, 40].iter() {
    let a = closes(&generate_candles(*len, 0));
    let b = closes(&generate_candles(*len, 31));

    group.bench_with_input(BenchmarkId::new("score", len), len, |bench, _| {
      bench.iter(|| {
        let _ = black_box(score(black_box(&a), black_box(&b)));
      })
    });
  }

  group.finish();
}

fn bench_scaling(c: &mut Criterion) {
  let reference = generate_candles(10, 5);
  let config = SearchConfig::new().asset("SYM").timeframe("1h").outcome_length(20);

  let mut group = c.benchmark_group("scaling");

  for size in [500, 1000, 5000, 10000].iter() {
    let mut series = SeriesMap::new();
    series.insert(SeriesKey::new("SYM", "1h"), generate_candles(*size, 0));

    group.bench_with_input(BenchmarkId::new("search", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(search(black_box(&reference), black_box(&series), &config));
      })
    });
  }

  group.finish();
}

fn bench_parallel_search(c: &mut Criterion) {
  let reference = generate_candles(10, 5);

  let mut series = SeriesMap::new();
  for (i, asset) in ["SYM1", "SYM2", "SYM3", "SYM4"].iter().enumerate() {
    series.insert(SeriesKey::new(*asset, "1h"), generate_candles(2000, i * 11));
  }

  let config = SearchConfig::new()
    .asset("SYM1")
    .asset("SYM2")
    .asset("SYM3")
    .asset("SYM4")
    .timeframe("1h")
    .outcome_length(20);

  c.bench_function("search_sequential_4_series", |b| {
    b.iter(|| {
      let _ = black_box(search(black_box(&reference), black_box(&series), &config));
    })
  });

  c.bench_function("search_parallel_4_series", |b| {
    b.iter(|| {
      let _ = black_box(search_parallel(black_box(&reference), black_box(&series), &config));
    })
  });
}

criterion_group!(benches, bench_score, bench_pattern_length, bench_scaling, bench_parallel_search,);

criterion_main!(benches);
