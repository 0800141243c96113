//! Benchmarks for candlestick pattern matching.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use candlewiz::condition::eval;
use candlewiz::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
  o: f64,
  h: f64,
  l: f64,
  c: f64,
}

impl OHLCV for TestBar {
  fn open(&self) -> f64 {
    self.o
  }

  fn high(&self) -> f64 {
    self.h
  }

  fn low(&self) -> f64 {
    self.l
  }

  fn close(&self) -> f64 {
    self.c
  }

  fn volume(&self) -> f64 {
    1000.0
  }
}

/// Generate realistic random bars
fn generate_bars(n: usize) -> Vec<TestBar> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let o = price;
    let c = price + change;
    let h = o.max(c) + volatility * 0.5;
    let l = o.min(c) - volatility * 0.5;

    bars.push(TestBar { o, h, l, c });
    price = c;
  }

  bars
}

fn default_matcher(history: &[TestBar]) -> PatternMatcher {
  MatcherBuilder::new().with_default_catalog().build(history).unwrap()
}

fn bench_compile(c: &mut Criterion) {
  c.bench_function("compile_default_catalog", |b| {
    b.iter(|| {
      let _ = black_box(Catalog::builtin());
    })
  });
}

fn bench_evaluate_expression(c: &mut Criterion) {
  c.bench_function("evaluate_expression", |b| {
    b.iter(|| {
      let _ = black_box(eval::evaluate(black_box("102.5-(abs(102.5-97.25)/2)")));
    })
  });
}

fn bench_probe(c: &mut Criterion) {
  let bars = generate_bars(6);
  let mut matcher = default_matcher(&bars[..5]);

  c.bench_function("probe_default_catalog", |b| {
    b.iter(|| {
      let _ = black_box(matcher.probe(black_box(&bars[5])));
    })
  });
}

fn bench_feed(c: &mut Criterion) {
  let mut group = c.benchmark_group("feed");

  for size in [100, 1000, 5000].iter() {
    let bars = generate_bars(*size + 5);

    group.bench_with_input(BenchmarkId::new("default_catalog", size), size, |b, _| {
      b.iter(|| {
        let mut matcher = default_matcher(&bars[..5]);
        let _ = black_box(matcher.feed(black_box(&bars[5..])));
      })
    });
  }

  group.finish();
}

fn bench_parallel_scan(c: &mut Criterion) {
  let bars1 = generate_bars(1000);
  let bars2 = generate_bars(1000);
  let bars3 = generate_bars(1000);
  let bars4 = generate_bars(1000);

  let catalog = Arc::new(Catalog::builtin().unwrap());
  let config = MatcherConfig::default();

  let instruments: Vec<(&str, &[TestBar])> =
    vec![("SYM1", &bars1), ("SYM2", &bars2), ("SYM3", &bars3), ("SYM4", &bars4)];

  c.bench_function("parallel_scan_4_instruments", |b| {
    b.iter(|| {
      let _ = black_box(scan_parallel(&catalog, &config, black_box(instruments.clone())));
    })
  });
}

criterion_group!(
  benches,
  bench_compile,
  bench_evaluate_expression,
  bench_probe,
  bench_feed,
  bench_parallel_scan,
);

criterion_main!(benches);
