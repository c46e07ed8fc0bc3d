//! True while a position is open.

use super::trade_based::TradeBased;
use super::IndicatorContext;
use crate::domain::MarketEnterType;

#[derive(Debug, Clone, Copy, Default)]
pub struct InMarket;

impl TradeBased for InMarket {
    type Output = bool;

    fn name(&self) -> &str {
        "in_market"
    }

    fn on_entry(
        &mut self,
        _ctx: &IndicatorContext<'_>,
        _entry_index: usize,
        _enter_type: MarketEnterType,
        _index: usize,
    ) -> bool {
        true
    }

    fn on_exit(&mut self, _ctx: &IndicatorContext<'_>, _exit_index: usize, _index: usize) -> bool {
        false
    }
}
