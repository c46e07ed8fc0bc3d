//! Price calculators: where the tracker gets entry and exit prices from.

use crate::domain::MarketEnterType;
use crate::indicators::IndicatorContext;

pub trait PriceCalculator {
    /// Price for an order of a position of `enter_type`.
    fn calculate(&mut self, ctx: &IndicatorContext<'_>, enter_type: MarketEnterType) -> f64;

    fn log_calculation(&self, price: f64, enter_type: MarketEnterType) {
        tracing::debug!(price, %enter_type, "price calculated");
    }
}

/// Calculator backed by a closure.
pub struct FnPriceCalculator<F> {
    f: F,
    label: &'static str,
}

/// Wrap a closure as a [`PriceCalculator`].
pub fn from_fn<F>(label: &'static str, f: F) -> FnPriceCalculator<F>
where
    F: FnMut(&IndicatorContext<'_>, MarketEnterType) -> f64,
{
    FnPriceCalculator { f, label }
}

impl<F> PriceCalculator for FnPriceCalculator<F>
where
    F: FnMut(&IndicatorContext<'_>, MarketEnterType) -> f64,
{
    fn calculate(&mut self, ctx: &IndicatorContext<'_>, enter_type: MarketEnterType) -> f64 {
        (self.f)(ctx, enter_type)
    }

    fn log_calculation(&self, price: f64, enter_type: MarketEnterType) {
        tracing::debug!(calculator = self.label, price, %enter_type, "price calculated");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Enter,
    Exit,
}

/// Crosses the spread: long enters at the ask and exits at the bid, short
/// the other way round.
///
/// Reads the newest bar, whose high is the ask and low the bid when built by
/// [`PriceTracker`](crate::market::PriceTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketPrice {
    phase: Phase,
}

impl MarketPrice {
    pub fn enter() -> Self {
        Self {
            phase: Phase::Enter,
        }
    }

    pub fn exit() -> Self {
        Self { phase: Phase::Exit }
    }
}

impl PriceCalculator for MarketPrice {
    fn calculate(&mut self, ctx: &IndicatorContext<'_>, enter_type: MarketEnterType) -> f64 {
        let Some(bar) = ctx.bars.last() else {
            return f64::NAN;
        };
        match (self.phase, enter_type) {
            (Phase::Enter, MarketEnterType::LongPosition)
            | (Phase::Exit, MarketEnterType::ShortPosition) => bar.high,
            (Phase::Enter, MarketEnterType::ShortPosition)
            | (Phase::Exit, MarketEnterType::LongPosition) => bar.low,
        }
    }
}
