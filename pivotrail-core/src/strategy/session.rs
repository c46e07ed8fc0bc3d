//! One market, one strategy, one tracker: everything a tick needs.

use super::{execute, Strategy};
use crate::config::StrategyConfig;
use crate::domain::{ClosedTrade, Market};
use crate::error::TradingError;
use crate::exchange::Exchange;
use crate::indicators::{IndicatorContext, LedgerId, Ledgers};
use crate::market::PriceTracker;
use crate::tracker::{OpenOrdersCache, OrderStateTracker, StrategyState, TickContext};

/// Owns the bar series, the trade ledger, the open-order cache, the tracker
/// and the strategy of one market.
#[derive(Debug)]
pub struct TradingSession<S> {
    prices: PriceTracker,
    ledgers: Ledgers,
    open_orders: OpenOrdersCache,
    tracker: OrderStateTracker,
    strategy: S,
    tick: u64,
    closed_trades: Vec<ClosedTrade>,
}

impl<S: Strategy> TradingSession<S> {
    /// `build` receives the ledger the tracker writes to, for the strategy's
    /// trade-aware indicators.
    pub fn new(
        market: Market,
        config: &StrategyConfig,
        build: impl FnOnce(LedgerId) -> S,
    ) -> Self {
        let mut ledgers = Ledgers::new();
        let ledger = ledgers.create();
        let tracker = OrderStateTracker::new(
            market.clone(),
            ledger,
            config.percentage_of_counter_currency_balance_to_use,
            config.configured_emergency_stop_balance,
        )
        .with_retry_limits(config.retry_limits);
        Self {
            prices: PriceTracker::new(market),
            ledgers,
            open_orders: OpenOrdersCache::new(),
            tracker,
            strategy: build(ledger),
            tick: 0,
            closed_trades: Vec::new(),
        }
    }

    /// Append the current ticker as a bar and run the strategy once.
    ///
    /// A failed ticker query leaves the session untouched.
    pub fn on_tick(&mut self, exchange: &dyn Exchange) -> Result<Option<ClosedTrade>, TradingError> {
        let index = self.prices.update(exchange)?;
        self.tick += 1;
        tracing::trace!(tick = self.tick, index, "tick");

        let mut ctx = TickContext {
            tick: self.tick,
            exchange,
            prices: &self.prices,
            ledgers: &mut self.ledgers,
            open_orders: &mut self.open_orders,
        };
        let closed = execute(&mut self.strategy, &mut self.tracker, &mut ctx)?;
        if let Some(trade) = &closed {
            self.closed_trades.push(trade.clone());
        }
        Ok(closed)
    }

    /// State as of the last tick; `None` until the tracker has resumed.
    pub fn state(&self) -> Option<StrategyState> {
        self.tracker
            .is_resumed()
            .then(|| self.tracker.last_known_state())
    }

    pub fn indicators(&self) -> IndicatorContext<'_> {
        IndicatorContext::new(self.prices.bars(), &self.ledgers)
    }

    pub fn prices(&self) -> &PriceTracker {
        &self.prices
    }

    pub fn ledgers(&self) -> &Ledgers {
        &self.ledgers
    }

    pub fn tracker(&self) -> &OrderStateTracker {
        &self.tracker
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}
