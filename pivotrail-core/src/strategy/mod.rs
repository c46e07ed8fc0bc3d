//! Strategies and the per-tick control flow that drives the order tracker.
//!
//! A [`Strategy`] decides *whether* to enter or exit and supplies the price
//! calculators; [`execute`] runs the fixed ENTER / EXIT / WAIT flow for one
//! tick against an [`OrderStateTracker`].

pub mod lowest_price_rebound;
pub mod session;

pub use lowest_price_rebound::LowestPriceRebound;
pub use session::TradingSession;

use crate::domain::{ClosedTrade, MarketEnterType};
use crate::error::{StrategyError, TradingError};
use crate::indicators::IndicatorContext;
use crate::tracker::{OrderStateTracker, PriceCalculator, StrategyState, TickContext};

pub trait Strategy {
    fn name(&self) -> &str;

    /// Direction of the positions this strategy opens.
    fn enter_type(&self) -> MarketEnterType;

    /// Evaluated on `NeedEnter` ticks.
    fn should_enter(&mut self, ctx: &IndicatorContext<'_>) -> Result<bool, StrategyError>;

    /// Evaluated on `NeedExit` ticks.
    fn should_exit(&mut self, ctx: &IndicatorContext<'_>) -> Result<bool, StrategyError>;

    fn enter_price_calculator(&mut self) -> Box<dyn PriceCalculator + '_>;

    fn exit_price_calculator(&mut self) -> Box<dyn PriceCalculator + '_>;

    fn on_trade_closed(&mut self, _trade: &ClosedTrade) {}
}

/// Run one tick: place or track whichever order the tracker's state calls for.
///
/// Returns the trade closed during this tick, if any.
pub fn execute<S: Strategy + ?Sized>(
    strategy: &mut S,
    tracker: &mut OrderStateTracker,
    ctx: &mut TickContext<'_>,
) -> Result<Option<ClosedTrade>, TradingError> {
    let mut closed = None;
    match tracker.current_state(ctx)? {
        StrategyState::NeedEnter => {
            if strategy.should_enter(&ctx.indicators())? {
                let enter_type = strategy.enter_type();
                let mut calculator = strategy.enter_price_calculator();
                tracker.place_enter_order(ctx, calculator.as_mut(), enter_type)?;
            }
        }
        StrategyState::WaitForEnter => {
            let mut calculator = strategy.enter_price_calculator();
            tracker.track_running_enter_order(ctx, calculator.as_mut())?;
        }
        StrategyState::NeedExit => {
            if strategy.should_exit(&ctx.indicators())? {
                let mut calculator = strategy.exit_price_calculator();
                tracker.place_exit_order(ctx, calculator.as_mut())?;
            }
        }
        StrategyState::WaitForExit => {
            let mut calculator = strategy.exit_price_calculator();
            tracker.track_running_exit_order(ctx, calculator.as_mut(), &mut |trade| {
                closed = Some(trade.clone());
            })?;
        }
    }
    if let Some(trade) = &closed {
        strategy.on_trade_closed(trade);
    }
    Ok(closed)
}
