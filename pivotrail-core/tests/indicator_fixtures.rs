//! Fixture tests for the trade-aware indicators and the reversal indicator,
//! driven through the public API only.

use chrono::{Duration, TimeZone, Utc};
use pivotrail_core::domain::{Bar, BarSeries, MarketEnterType};
use pivotrail_core::indicators::{
    BreakEven, Cached, Fees, InMarket, Indicator, IndicatorContext, Ledgers, TradeBasedIndicator,
    TrailingStop, TrailingStopSettings,
};
use pivotrail_core::reversal::{PivotKind, ReversalIndicator};
use pivotrail_core::tracker::StopRatchet;

// ── Helpers ──────────────────────────────────────────────────────────

fn series(points: &[(f64, f64, f64)]) -> BarSeries {
    let base = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let mut bars = BarSeries::new();
    for (i, &(high, low, close)) in points.iter().enumerate() {
        let start = base + Duration::minutes(i as i64);
        bars.push(Bar {
            start,
            end: start + Duration::seconds(59),
            open: close,
            high,
            low,
            close,
        })
        .unwrap();
    }
    bars
}

fn closes(values: &[f64]) -> BarSeries {
    let points: Vec<_> = values.iter().map(|&c| (c + 0.5, c - 0.5, c)).collect();
    series(&points)
}

fn settings() -> TrailingStopSettings {
    TrailingStopSettings {
        below_break_even: 0.05,
        above_break_even: 0.02,
        minimum_above_break_even: 0.01,
    }
}

// ── Reversal ─────────────────────────────────────────────────────────

#[test]
fn falling_highs_confirm_high_everywhere() {
    let bars = series(&[(3.0, 1.0, 2.0), (2.9, 0.9, 2.0), (2.8, 0.8, 2.0)]);
    let ledgers = Ledgers::new();
    let ctx = IndicatorContext::new(&bars, &ledgers);

    let mut high = ReversalIndicator::new(PivotKind::High);
    for index in 0..3 {
        assert_eq!(high.value(&ctx, index), 3.0);
    }
    assert!(high.value(&ctx, 3).is_nan());
}

#[test]
fn two_bars_are_not_enough() {
    let bars = series(&[(3.0, 1.0, 2.0), (2.9, 0.9, 2.0)]);
    let ledgers = Ledgers::new();
    let ctx = IndicatorContext::new(&bars, &ledgers);

    let mut high = ReversalIndicator::new(PivotKind::High);
    assert!(high.value(&ctx, 1).is_nan());
}

#[test]
fn rising_lows_confirm_low_but_no_high() {
    let bars = series(&[(5.0, 1.0, 3.0), (10.0, 2.0, 6.0), (12.0, 6.0, 9.0)]);
    let ledgers = Ledgers::new();
    let ctx = IndicatorContext::new(&bars, &ledgers);

    let mut low = ReversalIndicator::new(PivotKind::Low);
    let mut high = ReversalIndicator::new(PivotKind::High);
    for index in 0..3 {
        assert_eq!(low.value(&ctx, index), 1.0);
        assert!(high.value(&ctx, index).is_nan());
    }
}

#[test]
fn reversal_follows_a_growing_series() {
    let full = [
        (3.0, 1.0, 2.0),
        (2.9, 0.9, 2.0),
        (2.8, 0.8, 2.0),
        (2.9, 0.9, 2.0),
        (3.1, 1.1, 2.0),
    ];
    let ledgers = Ledgers::new();
    let mut low = ReversalIndicator::new(PivotKind::Low);

    let partial = series(&full[..3]);
    let ctx = IndicatorContext::new(&partial, &ledgers);
    assert!(low.value(&ctx, 2).is_nan());

    // Lows rise twice after 0.8 at index 2.
    let grown = series(&full);
    let ctx = IndicatorContext::new(&grown, &ledgers);
    assert_eq!(low.value(&ctx, 4), 0.8);
    assert!(low.value(&ctx, 1).is_nan());
    assert_eq!(low.detector().processed(), 5);
}

// ── Trade-based ──────────────────────────────────────────────────────

#[test]
fn break_even_only_inside_a_position() {
    let bars = closes(&[100.0, 101.0, 102.0, 103.0]);
    let ledgers = Ledgers::new();
    let ctx = IndicatorContext::new(&bars, &ledgers);

    let mut break_even = TradeBasedIndicator::owned(BreakEven::new(Fees::new(0.001, 0.002)));
    break_even
        .record_entry(1, MarketEnterType::LongPosition)
        .unwrap();
    break_even.record_exit(3).unwrap();

    let expected = 101.0 * 1.001 / 0.998;
    assert!(break_even.value(&ctx, 0).is_nan());
    assert!((break_even.value(&ctx, 1) - expected).abs() < 1e-9);
    assert!((break_even.value(&ctx, 2) - expected).abs() < 1e-9);
    assert!(break_even.value(&ctx, 3).is_nan());
}

#[test]
fn short_break_even_sits_below_entry() {
    let bars = closes(&[100.0, 99.0]);
    let ledgers = Ledgers::new();
    let ctx = IndicatorContext::new(&bars, &ledgers);

    let mut break_even = TradeBasedIndicator::owned(BreakEven::new(Fees::new(0.001, 0.002)));
    break_even
        .record_entry(0, MarketEnterType::ShortPosition)
        .unwrap();
    // Short enters on the sell fee and exits on the buy fee.
    let expected = 100.0 / 1.002 * 0.999;
    assert!((break_even.value(&ctx, 1) - expected).abs() < 1e-9);
}

#[test]
fn ratcheted_trailing_stop_never_loosens() {
    let path = [100.0, 98.0, 104.0, 108.0, 103.0, 110.0, 101.0, 115.0, 95.0];
    let bars = closes(&path);
    let mut ledgers = Ledgers::new();
    let ledger = ledgers.create();
    ledgers
        .get_mut(ledger)
        .unwrap()
        .record_entry(0, MarketEnterType::LongPosition)
        .unwrap();
    let ctx = IndicatorContext::new(&bars, &ledgers);

    let mut stop = Cached::new(TradeBasedIndicator::shared(
        TrailingStop::new(Fees::new(0.001, 0.001), settings()),
        ledger,
    ));
    let mut ratchet = StopRatchet::new(MarketEnterType::LongPosition);
    let mut previous = f64::NEG_INFINITY;
    let mut raw_decreased = false;
    for index in 0..path.len() {
        let raw = stop.value(&ctx, index);
        assert!(raw.is_finite());
        if raw < previous {
            raw_decreased = true;
        }
        let level = ratchet.apply(raw);
        assert!(level >= previous);
        previous = level;
    }
    // Below break-even the raw stop follows the last close down; the ratchet holds.
    assert!(raw_decreased);
    assert!((previous - 115.0 * 0.98).abs() < 1e-9);
}

#[test]
fn in_market_tracks_shared_ledger() {
    let bars = closes(&[100.0, 101.0, 102.0, 103.0, 104.0]);
    let mut ledgers = Ledgers::new();
    let ledger = ledgers.create();
    {
        let trades = ledgers.get_mut(ledger).unwrap();
        trades
            .record_entry(1, MarketEnterType::ShortPosition)
            .unwrap();
        trades.record_exit(3).unwrap();
    }
    let ctx = IndicatorContext::new(&bars, &ledgers);

    let mut in_market = TradeBasedIndicator::shared(InMarket, ledger);
    let flags: Vec<bool> = (0..5).map(|i| in_market.value(&ctx, i)).collect();
    assert_eq!(flags, vec![false, true, true, false, false]);
}
