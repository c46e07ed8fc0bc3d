//! Highest / lowest value of a source since the open position's entry bar.

use super::price::ClosePrice;
use super::trade_based::TradeBased;
use super::{Indicator, IndicatorContext};
use crate::domain::MarketEnterType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Highest,
    Lowest,
}

/// Running extreme of `source` over `[entry, index]`; NaN outside a position.
#[derive(Debug, Clone)]
pub struct ExtremeSinceEntry<P = ClosePrice> {
    source: P,
    extreme: Extreme,
    name: String,
}

impl ExtremeSinceEntry<ClosePrice> {
    pub fn highest_close() -> Self {
        Self::new(ClosePrice, Extreme::Highest)
    }

    pub fn lowest_close() -> Self {
        Self::new(ClosePrice, Extreme::Lowest)
    }
}

impl<P: Indicator<Output = f64>> ExtremeSinceEntry<P> {
    pub fn new(source: P, extreme: Extreme) -> Self {
        let prefix = match extreme {
            Extreme::Highest => "highest",
            Extreme::Lowest => "lowest",
        };
        let name = format!("{prefix}_{}_since_entry", source.name());
        Self {
            source,
            extreme,
            name,
        }
    }

    /// Extreme over `[from, to]`, skipping NaN values.
    pub fn extreme_between(&mut self, ctx: &IndicatorContext<'_>, from: usize, to: usize) -> f64 {
        let mut result = f64::NAN;
        for i in from..=to {
            let v = self.source.value(ctx, i);
            if v.is_nan() {
                continue;
            }
            result = match self.extreme {
                _ if result.is_nan() => v,
                Extreme::Highest => result.max(v),
                Extreme::Lowest => result.min(v),
            };
        }
        result
    }
}

impl<P: Indicator<Output = f64>> TradeBased for ExtremeSinceEntry<P> {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn on_entry(
        &mut self,
        ctx: &IndicatorContext<'_>,
        entry_index: usize,
        _enter_type: MarketEnterType,
        index: usize,
    ) -> f64 {
        self.extreme_between(ctx, entry_index, index)
    }

    fn on_exit(&mut self, _ctx: &IndicatorContext<'_>, _exit_index: usize, _index: usize) -> f64 {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::make_close_series;
    use crate::indicators::{Ledgers, TradeBasedIndicator};

    #[test]
    fn tracks_extremes_from_entry_bar() {
        let bars = make_close_series(&[50.0, 10.0, 14.0, 12.0, 9.0]);
        let ledgers = Ledgers::new();
        let ctx = IndicatorContext::new(&bars, &ledgers);

        let mut highest = TradeBasedIndicator::owned(ExtremeSinceEntry::highest_close());
        let mut lowest = TradeBasedIndicator::owned(ExtremeSinceEntry::lowest_close());
        highest.record_entry(1, MarketEnterType::LongPosition).unwrap();
        lowest.record_entry(1, MarketEnterType::ShortPosition).unwrap();

        assert!(highest.value(&ctx, 0).is_nan());
        assert_eq!(highest.value(&ctx, 1), 10.0);
        assert_eq!(highest.value(&ctx, 3), 14.0);
        assert_eq!(lowest.value(&ctx, 3), 10.0);
        assert_eq!(lowest.value(&ctx, 4), 9.0);
    }

    #[test]
    fn name_reflects_source() {
        assert_eq!(
            ExtremeSinceEntry::highest_close().name(),
            "highest_close_since_entry"
        );
    }
}
