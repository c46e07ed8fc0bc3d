//! Fee-aware break-even price.
//!
//! Long:  `entry * (1 + enter_fee) / (1 - exit_fee)`
//! Short: `entry / (1 + enter_fee) * (1 - exit_fee)`
//!
//! Evaluated at the entry index, so the value is constant for the life of a
//! position. NaN before the first entry and after an exit.

use super::price::ClosePrice;
use super::trade_based::TradeBased;
use super::{Indicator, IndicatorContext};
use crate::domain::MarketEnterType;
use serde::{Deserialize, Serialize};

/// Exchange fees as fractions (0.001 = 0.1 %).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Fees {
    pub buy: f64,
    pub sell: f64,
}

impl Fees {
    pub fn new(buy: f64, sell: f64) -> Self {
        Self { buy, sell }
    }

    /// Fee paid when opening a position (long buys, short sells).
    pub fn enter(&self, enter_type: MarketEnterType) -> f64 {
        match enter_type {
            MarketEnterType::LongPosition => self.buy,
            MarketEnterType::ShortPosition => self.sell,
        }
    }

    /// Fee paid when closing a position (long sells, short buys back).
    pub fn exit(&self, enter_type: MarketEnterType) -> f64 {
        match enter_type {
            MarketEnterType::LongPosition => self.sell,
            MarketEnterType::ShortPosition => self.buy,
        }
    }
}

pub fn break_even_price(
    entry_price: f64,
    enter_type: MarketEnterType,
    enter_fee: f64,
    exit_fee: f64,
) -> f64 {
    match enter_type {
        MarketEnterType::LongPosition => entry_price * (1.0 + enter_fee) / (1.0 - exit_fee),
        MarketEnterType::ShortPosition => entry_price / (1.0 + enter_fee) * (1.0 - exit_fee),
    }
}

/// Break-even of the open position, priced from `source` at the entry bar.
#[derive(Debug, Clone)]
pub struct BreakEven<P = ClosePrice> {
    source: P,
    fees: Fees,
}

impl BreakEven<ClosePrice> {
    pub fn new(fees: Fees) -> Self {
        Self::with_source(ClosePrice, fees)
    }
}

impl<P> BreakEven<P> {
    pub fn with_source(source: P, fees: Fees) -> Self {
        Self { source, fees }
    }

    pub fn fees(&self) -> Fees {
        self.fees
    }
}

impl<P: Indicator<Output = f64>> TradeBased for BreakEven<P> {
    type Output = f64;

    fn name(&self) -> &str {
        "break_even"
    }

    fn on_entry(
        &mut self,
        ctx: &IndicatorContext<'_>,
        entry_index: usize,
        enter_type: MarketEnterType,
        _index: usize,
    ) -> f64 {
        let entry_price = self.source.value(ctx, entry_index);
        break_even_price(
            entry_price,
            enter_type,
            self.fees.enter(enter_type),
            self.fees.exit(enter_type),
        )
    }

    fn on_exit(&mut self, _ctx: &IndicatorContext<'_>, _exit_index: usize, _index: usize) -> f64 {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::make_close_series;
    use crate::indicators::{assert_approx, Ledgers, TradeBasedIndicator, DEFAULT_EPSILON};

    #[test]
    fn long_formula() {
        let be = break_even_price(100.0, MarketEnterType::LongPosition, 0.001, 0.002);
        assert_approx(be, 100.0 * 1.001 / 0.998, DEFAULT_EPSILON);
        assert!(be > 100.0);
    }

    #[test]
    fn short_formula() {
        let be = break_even_price(100.0, MarketEnterType::ShortPosition, 0.001, 0.002);
        assert_approx(be, 100.0 / 1.001 * 0.998, DEFAULT_EPSILON);
        assert!(be < 100.0);
    }

    #[test]
    fn fees_pick_side() {
        let fees = Fees::new(0.001, 0.002);
        assert_eq!(fees.enter(MarketEnterType::LongPosition), 0.001);
        assert_eq!(fees.exit(MarketEnterType::LongPosition), 0.002);
        assert_eq!(fees.enter(MarketEnterType::ShortPosition), 0.002);
        assert_eq!(fees.exit(MarketEnterType::ShortPosition), 0.001);
    }

    #[test]
    fn constant_for_the_life_of_a_position() {
        let bars = make_close_series(&[90.0, 100.0, 120.0, 80.0, 95.0]);
        let ledgers = Ledgers::new();
        let ctx = IndicatorContext::new(&bars, &ledgers);
        let fees = Fees::new(0.001, 0.001);
        let mut ind = TradeBasedIndicator::owned(BreakEven::new(fees));
        ind.record_entry(1, MarketEnterType::LongPosition).unwrap();
        ind.record_exit(4).unwrap();

        assert!(ind.value(&ctx, 0).is_nan(), "undefined before the first entry");
        let expected = 100.0 * 1.001 / 0.999;
        for i in 1..4 {
            assert_approx(ind.value(&ctx, i), expected, DEFAULT_EPSILON);
        }
        assert!(ind.value(&ctx, 4).is_nan(), "undefined after exit");
    }
}
