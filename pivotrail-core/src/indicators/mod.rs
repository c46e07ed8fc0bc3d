//! Indicator framework.
//!
//! An indicator is a named function `index -> value` over a [`BarSeries`].
//! Plain indicators read bars only; trade-aware indicators additionally read a
//! [`TradeLedger`] of entry/exit events and dispatch through
//! [`TradeBasedIndicator`].
//!
//! Indicators are composed, not inherited: a trailing stop owns its break-even
//! and since-entry parts, and any indicator can be wrapped in [`Cached`] for
//! compute-once semantics.

pub mod break_even;
pub mod cache;
pub mod in_market;
pub mod ledger;
pub mod lowest;
pub mod price;
pub mod since_entry;
pub mod trade_based;
pub mod trailing_stop;

pub use break_even::{break_even_price, BreakEven, Fees};
pub use cache::Cached;
pub use in_market::InMarket;
pub use ledger::{LedgerError, LedgerId, LedgerSource, Ledgers, TradeEvent, TradeLedger};
pub use lowest::LowestValue;
pub use price::{ClosePrice, HighPrice, LowPrice};
pub use since_entry::{Extreme, ExtremeSinceEntry};
pub use trade_based::{TradeBased, TradeBasedIndicator};
pub use trailing_stop::{trailing_stop_price, TrailingStop, TrailingStopSettings};

use crate::domain::BarSeries;

/// Value type an indicator produces, with a distinguished "not applicable" value.
pub trait IndicatorValue: Copy + std::fmt::Debug {
    fn not_applicable() -> Self;
}

impl IndicatorValue for f64 {
    fn not_applicable() -> Self {
        f64::NAN
    }
}

impl IndicatorValue for bool {
    fn not_applicable() -> Self {
        false
    }
}

/// Read-only inputs every indicator evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorContext<'a> {
    pub bars: &'a BarSeries,
    pub ledgers: &'a Ledgers,
}

impl<'a> IndicatorContext<'a> {
    pub fn new(bars: &'a BarSeries, ledgers: &'a Ledgers) -> Self {
        Self { bars, ledgers }
    }

    /// Index of the newest bar, `None` while the series is empty.
    pub fn last_index(&self) -> Option<usize> {
        self.bars.last_index()
    }
}

/// Trait for indicators.
///
/// `value` takes `&mut self` so implementations can memoize. Indices past the
/// end of the series yield `Output::not_applicable()`.
pub trait Indicator {
    type Output: IndicatorValue;

    /// Human-readable name (e.g., "close", "break_even").
    fn name(&self) -> &str;

    fn value(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> Self::Output;
}

impl<I: Indicator + ?Sized> Indicator for Box<I> {
    type Output = I::Output;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> Self::Output {
        (**self).value(ctx, index)
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
