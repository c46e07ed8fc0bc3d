//! Long-only rebound strategy.
//!
//! Enters when the most recent confirmed pivot is a low and the last
//! `times-above-lowest-price-needed` closes all sit strictly above the lowest
//! close of the last `lowest-price-lookback-count` bars. Entry crosses the
//! spread; the exit is a trailing stop that is re-evaluated on every tick.

use super::Strategy;
use crate::config::StrategyConfig;
use crate::domain::{ClosedTrade, MarketEnterType};
use crate::error::StrategyError;
use crate::indicators::{
    BreakEven, Cached, Fees, InMarket, Indicator, IndicatorContext, LedgerId, LowestValue,
    TradeBasedIndicator, TrailingStop, TrailingStopSettings,
};
use crate::reversal::{PivotKind, ReversalIndicator};
use crate::tracker::{from_fn, MarketPrice, PriceCalculator};

#[derive(Debug)]
pub struct LowestPriceRebound {
    reversal: ReversalIndicator,
    lowest: LowestValue,
    times_above: usize,
    break_even: Cached<TradeBasedIndicator<BreakEven>>,
    trailing_stop: Cached<TradeBasedIndicator<TrailingStop>>,
    in_market: TradeBasedIndicator<InMarket>,
}

impl LowestPriceRebound {
    /// `fees` are the exchange fractions; every trade-aware indicator reads
    /// the tracker's `ledger`.
    pub fn new(config: &StrategyConfig, ledger: LedgerId, fees: Fees) -> Self {
        let settings = TrailingStopSettings::from_config(config);
        Self {
            reversal: ReversalIndicator::new(PivotKind::Low),
            lowest: LowestValue::close(config.lowest_price_lookback_count),
            times_above: config.times_above_lowest_price_needed,
            break_even: Cached::new(TradeBasedIndicator::shared(BreakEven::new(fees), ledger)),
            trailing_stop: Cached::new(TradeBasedIndicator::shared(
                TrailingStop::new(fees, settings),
                ledger,
            )),
            in_market: TradeBasedIndicator::shared(InMarket, ledger),
        }
    }

    pub fn break_even(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> f64 {
        self.break_even.value(ctx, index)
    }

    pub fn trailing_stop(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> f64 {
        self.trailing_stop.value(ctx, index)
    }

    pub fn is_in_market(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> bool {
        self.in_market.value(ctx, index)
    }

    /// Whether the last `times_above` closes up to `index` all exceed the
    /// lowest close of the lookback window ending at `index`.
    fn rebounded(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> bool {
        let lowest = self.lowest.value(ctx, index);
        if lowest.is_nan() || self.times_above > index + 1 {
            return false;
        }
        (index + 1 - self.times_above..=index).all(|i| ctx.bars.close(i) > lowest)
    }
}

impl Strategy for LowestPriceRebound {
    fn name(&self) -> &str {
        "lowest_price_rebound"
    }

    fn enter_type(&self) -> MarketEnterType {
        MarketEnterType::LongPosition
    }

    fn should_enter(&mut self, ctx: &IndicatorContext<'_>) -> Result<bool, StrategyError> {
        let Some(index) = ctx.last_index() else {
            return Ok(false);
        };
        self.reversal.sync(ctx.bars)?;
        let last_is_low = self
            .reversal
            .detector()
            .last_pivot()
            .is_some_and(|p| p.kind == PivotKind::Low);
        if !last_is_low {
            return Ok(false);
        }
        let enter = self.rebounded(ctx, index);
        if enter {
            tracing::debug!(
                index,
                low = self.reversal.value(ctx, index),
                "rebound above lowest close"
            );
        }
        Ok(enter)
    }

    /// Always trail: the exit is placed as soon as the entry fills.
    fn should_exit(&mut self, _ctx: &IndicatorContext<'_>) -> Result<bool, StrategyError> {
        Ok(true)
    }

    fn enter_price_calculator(&mut self) -> Box<dyn PriceCalculator + '_> {
        Box::new(MarketPrice::enter())
    }

    fn exit_price_calculator(&mut self) -> Box<dyn PriceCalculator + '_> {
        let stop = &mut self.trailing_stop;
        Box::new(from_fn("trailing_stop", move |ctx, _| {
            ctx.last_index().map_or(f64::NAN, |index| stop.value(ctx, index))
        }))
    }

    fn on_trade_closed(&mut self, trade: &ClosedTrade) {
        tracing::info!(
            strategy = "lowest_price_rebound",
            entry = trade.entry_price,
            exit = trade.exit_price,
            gain = trade.gain,
            "trade recorded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::make_series;
    use crate::indicators::Ledgers;

    fn config(lookback: usize, times_above: usize) -> StrategyConfig {
        StrategyConfig {
            lowest_price_lookback_count: lookback,
            times_above_lowest_price_needed: times_above,
            ..StrategyConfig::example()
        }
    }

    #[test]
    fn enters_after_confirmed_low_and_rebound() {
        // Low pivot at index 1 (low 8), confirmed by rising lows at 2 and 3.
        let bars = make_series(&[
            (11.0, 9.0, 10.0),
            (10.0, 8.0, 9.0),
            (12.0, 9.0, 11.0),
            (13.0, 10.0, 12.0),
        ]);
        let mut ledgers = Ledgers::new();
        let ledger = ledgers.create();
        let ctx = IndicatorContext::new(&bars, &ledgers);
        let mut strategy = LowestPriceRebound::new(&config(4, 2), ledger, Fees::new(0.001, 0.001));
        assert!(strategy.should_enter(&ctx).unwrap());
    }

    #[test]
    fn waits_for_enough_closes_above_lowest() {
        let bars = make_series(&[
            (11.0, 9.0, 10.0),
            (10.0, 8.0, 9.0),
            (12.0, 9.0, 11.0),
            (13.0, 10.0, 12.0),
        ]);
        let mut ledgers = Ledgers::new();
        let ledger = ledgers.create();
        let ctx = IndicatorContext::new(&bars, &ledgers);
        // Three closes above the lowest would include the lowest close itself.
        let mut strategy = LowestPriceRebound::new(&config(4, 3), ledger, Fees::new(0.001, 0.001));
        assert!(!strategy.should_enter(&ctx).unwrap());
    }

    #[test]
    fn no_entry_without_low_pivot() {
        let bars = make_series(&[(10.0, 9.0, 9.5), (11.0, 10.0, 10.5)]);
        let mut ledgers = Ledgers::new();
        let ledger = ledgers.create();
        let ctx = IndicatorContext::new(&bars, &ledgers);
        let mut strategy = LowestPriceRebound::new(&config(2, 1), ledger, Fees::new(0.0, 0.0));
        assert!(!strategy.should_enter(&ctx).unwrap());
        assert!(strategy.should_exit(&ctx).unwrap());
    }

    #[test]
    fn exit_calculator_reads_trailing_stop() {
        let bars = make_series(&[(101.0, 99.0, 100.0), (121.0, 119.0, 120.0)]);
        let mut ledgers = Ledgers::new();
        let ledger = ledgers.create();
        ledgers
            .get_mut(ledger)
            .unwrap()
            .record_entry(0, MarketEnterType::LongPosition)
            .unwrap();
        let ctx = IndicatorContext::new(&bars, &ledgers);
        let mut strategy = LowestPriceRebound::new(&config(2, 1), ledger, Fees::new(0.0, 0.0));

        assert!(strategy.is_in_market(&ctx, 1));
        assert_eq!(strategy.break_even(&ctx, 1), 100.0);
        let expected = strategy.trailing_stop(&ctx, 1);
        let mut calc = strategy.exit_price_calculator();
        let stop = calc.calculate(&ctx, MarketEnterType::LongPosition);
        assert_eq!(stop, expected);
        // floor = min(100/0.99, 120*0.99) = 101.01; trail = 120*0.98 = 117.6
        assert!((stop - 117.6).abs() < 1e-9);
    }
}
