//! Adaptive trailing-stop price.
//!
//! Long position, with `be` the break-even, `hc` the highest close since entry
//! and `m`, `a`, `b` the minimum-above / above / below break-even fractions:
//!
//! ```text
//! floor = min(be / (1 - m), hc * (1 - m))
//! stop  = max(floor, hc * (1 - a))      if floor >= be
//!       = last_close * (1 - b)          otherwise
//! ```
//!
//! Short mirrors it with the lowest close since entry, min/max swapped and the
//! signs flipped. The raw value is not monotonic; the order tracker only ever
//! accepts a strictly better stop.

use super::break_even::{BreakEven, Fees};
use super::since_entry::ExtremeSinceEntry;
use super::trade_based::TradeBased;
use super::IndicatorContext;
use crate::config::StrategyConfig;
use crate::domain::MarketEnterType;
use serde::{Deserialize, Serialize};

/// Stop distances as fractions (0.02 = 2 %).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopSettings {
    pub below_break_even: f64,
    pub above_break_even: f64,
    pub minimum_above_break_even: f64,
}

impl TrailingStopSettings {
    /// Convert the percentage keys of a strategy config into fractions.
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            below_break_even: config.sell_stop_limit_percentage_below_break_even / 100.0,
            above_break_even: config.sell_stop_limit_percentage_above_break_even / 100.0,
            minimum_above_break_even: config.sell_stop_limit_percentage_minimum_above_break_even
                / 100.0,
        }
    }
}

/// Stop price for one position state.
///
/// `extreme` is the highest close since entry for longs, the lowest for shorts.
pub fn trailing_stop_price(
    enter_type: MarketEnterType,
    break_even: f64,
    extreme: f64,
    last_close: f64,
    settings: &TrailingStopSettings,
) -> f64 {
    let m = settings.minimum_above_break_even;
    let a = settings.above_break_even;
    let b = settings.below_break_even;
    match enter_type {
        MarketEnterType::LongPosition => {
            let floor = (break_even / (1.0 - m)).min(extreme * (1.0 - m));
            if floor >= break_even {
                floor.max(extreme * (1.0 - a))
            } else {
                last_close * (1.0 - b)
            }
        }
        MarketEnterType::ShortPosition => {
            let ceiling = (break_even / (1.0 + m)).max(extreme * (1.0 + m));
            if ceiling <= break_even {
                ceiling.min(extreme * (1.0 + a))
            } else {
                last_close * (1.0 + b)
            }
        }
    }
}

/// Trailing stop of the open position; NaN outside a position.
#[derive(Debug, Clone)]
pub struct TrailingStop {
    break_even: BreakEven,
    highest: ExtremeSinceEntry,
    lowest: ExtremeSinceEntry,
    settings: TrailingStopSettings,
}

impl TrailingStop {
    pub fn new(fees: Fees, settings: TrailingStopSettings) -> Self {
        Self {
            break_even: BreakEven::new(fees),
            highest: ExtremeSinceEntry::highest_close(),
            lowest: ExtremeSinceEntry::lowest_close(),
            settings,
        }
    }

    pub fn settings(&self) -> &TrailingStopSettings {
        &self.settings
    }
}

impl TradeBased for TrailingStop {
    type Output = f64;

    fn name(&self) -> &str {
        "trailing_stop"
    }

    fn on_entry(
        &mut self,
        ctx: &IndicatorContext<'_>,
        entry_index: usize,
        enter_type: MarketEnterType,
        index: usize,
    ) -> f64 {
        let break_even = self
            .break_even
            .on_entry(ctx, entry_index, enter_type, index);
        let extreme = match enter_type {
            MarketEnterType::LongPosition => {
                self.highest.on_entry(ctx, entry_index, enter_type, index)
            }
            MarketEnterType::ShortPosition => {
                self.lowest.on_entry(ctx, entry_index, enter_type, index)
            }
        };
        trailing_stop_price(
            enter_type,
            break_even,
            extreme,
            ctx.bars.close(index),
            &self.settings,
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
    use crate::indicators::{
        assert_approx, break_even_price, Indicator, Ledgers, TradeBasedIndicator, DEFAULT_EPSILON,
    };

    fn settings() -> TrailingStopSettings {
        TrailingStopSettings {
            below_break_even: 0.05,
            above_break_even: 0.02,
            minimum_above_break_even: 0.01,
        }
    }

    #[test]
    fn long_below_break_even_trails_last_close() {
        // hc * 0.99 = 99.99 < be = 100.2 → below-break-even branch
        let stop = trailing_stop_price(
            MarketEnterType::LongPosition,
            100.2,
            101.0,
            100.5,
            &settings(),
        );
        assert_approx(stop, 100.5 * 0.95, DEFAULT_EPSILON);
    }

    #[test]
    fn long_above_break_even_uses_floor_or_trail() {
        // floor = min(100/0.99, 120*0.99) = 101.0101..; trail = 120*0.98 = 117.6
        let stop = trailing_stop_price(
            MarketEnterType::LongPosition,
            100.0,
            120.0,
            119.0,
            &settings(),
        );
        assert_approx(stop, 117.6, DEFAULT_EPSILON);

        // floor = min(101.0101, 102*0.99 = 100.98) = 100.98; trail = 99.96
        let stop = trailing_stop_price(
            MarketEnterType::LongPosition,
            100.0,
            102.0,
            101.0,
            &settings(),
        );
        assert_approx(stop, 102.0 * 0.99, DEFAULT_EPSILON);
    }

    #[test]
    fn short_mirrors_long() {
        // ceiling = max(100/1.01, 80*1.01) = 99.0099; trail = 80*1.02 = 81.6
        let stop = trailing_stop_price(
            MarketEnterType::ShortPosition,
            100.0,
            80.0,
            81.0,
            &settings(),
        );
        assert_approx(stop, 81.6, DEFAULT_EPSILON);

        // ceiling = max(99.0099, 99.99*1.01 = 100.99) > be → below-break-even fallback lc*1.05
        let stop = trailing_stop_price(
            MarketEnterType::ShortPosition,
            100.0,
            99.99,
            99.5,
            &settings(),
        );
        assert_approx(stop, 99.5 * 1.05, DEFAULT_EPSILON);
    }

    #[test]
    fn from_config_converts_percentages() {
        let config = StrategyConfig::example();
        let s = TrailingStopSettings::from_config(&config);
        assert_approx(
            s.below_break_even,
            config.sell_stop_limit_percentage_below_break_even / 100.0,
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn indicator_follows_open_position() {
        let bars = make_close_series(&[100.0, 100.0, 110.0, 130.0, 125.0]);
        let ledgers = Ledgers::new();
        let ctx = IndicatorContext::new(&bars, &ledgers);
        let fees = Fees::new(0.001, 0.001);
        let mut stop = TradeBasedIndicator::owned(TrailingStop::new(fees, settings()));
        stop.record_entry(1, MarketEnterType::LongPosition).unwrap();

        assert!(stop.value(&ctx, 0).is_nan());

        let be = break_even_price(100.0, MarketEnterType::LongPosition, 0.001, 0.001);
        // index 1: hc = 100 → below break-even branch
        assert_approx(stop.value(&ctx, 1), 100.0 * 0.95, DEFAULT_EPSILON);
        // index 4: hc = 130, floor = min(be/0.99, 128.7) = be/0.99, trail = 127.4
        let expected = (be / 0.99).max(130.0 * 0.98);
        assert_approx(stop.value(&ctx, 4), expected, DEFAULT_EPSILON);
    }
}
