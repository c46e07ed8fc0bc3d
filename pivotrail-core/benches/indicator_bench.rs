//! Criterion benchmarks for pivotrail hot paths.
//!
//! Benchmarks:
//! 1. Pivot detector (bar-by-bar push over a synthetic series)
//! 2. Reversal indicator (incremental sync as the series grows)
//! 3. Trailing stop (cached evaluation over an open position)

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pivotrail_core::domain::{Bar, BarSeries, MarketEnterType};
use pivotrail_core::indicators::{
    Cached, Fees, Indicator, IndicatorContext, Ledgers, TradeBasedIndicator, TrailingStop,
    TrailingStopSettings,
};
use pivotrail_core::reversal::{PivotDetector, PivotKind, ReversalIndicator};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + (i as f64 * 0.37).cos() * 2.0;
            let start = base + Duration::minutes(i as i64);
            Bar {
                start,
                end: start + Duration::seconds(59),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
            }
        })
        .collect()
}

fn make_series(n: usize) -> BarSeries {
    let mut series = BarSeries::new();
    for bar in make_bars(n) {
        series.push(bar).unwrap();
    }
    series
}

// ── 1. Pivot Detector ────────────────────────────────────────────────

fn bench_detector(c: &mut Criterion) {
    let mut group = c.benchmark_group("pivot_detector");
    for n in [1_000usize, 10_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| {
                let mut detector = PivotDetector::new();
                for (i, bar) in bars.iter().enumerate() {
                    if detector.push(i, bar.high, bar.low).is_err() {
                        break;
                    }
                }
                black_box(detector.pivots().len())
            });
        });
    }
    group.finish();
}

// ── 2. Reversal Indicator ────────────────────────────────────────────

fn bench_reversal_incremental(c: &mut Criterion) {
    let bars = make_bars(2_000);
    let ledgers = Ledgers::new();

    c.bench_function("reversal_incremental_2000", |b| {
        b.iter(|| {
            let mut series = BarSeries::new();
            let mut low = ReversalIndicator::new(PivotKind::Low);
            let mut last = f64::NAN;
            for bar in &bars {
                let index = series.push(bar.clone()).unwrap();
                let ctx = IndicatorContext::new(&series, &ledgers);
                last = low.value(&ctx, index);
            }
            black_box(last)
        });
    });
}

// ── 3. Trailing Stop ─────────────────────────────────────────────────

fn bench_trailing_stop(c: &mut Criterion) {
    let series = make_series(5_000);
    let mut ledgers = Ledgers::new();
    let ledger = ledgers.create();
    ledgers
        .get_mut(ledger)
        .unwrap()
        .record_entry(0, MarketEnterType::LongPosition)
        .unwrap();
    let settings = TrailingStopSettings {
        below_break_even: 0.05,
        above_break_even: 0.02,
        minimum_above_break_even: 0.01,
    };

    c.bench_function("trailing_stop_5000", |b| {
        b.iter(|| {
            let ctx = IndicatorContext::new(&series, &ledgers);
            let mut stop = Cached::new(TradeBasedIndicator::shared(
                TrailingStop::new(Fees::new(0.001, 0.001), settings),
                ledger,
            ));
            let mut sum = 0.0;
            for index in 0..series.len() {
                sum += stop.value(&ctx, index);
            }
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_detector,
    bench_reversal_incremental,
    bench_trailing_stop
);
criterion_main!(benches);
