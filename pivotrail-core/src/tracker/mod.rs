//! Order lifecycle tracking.
//!
//! [`OrderStateTracker`] walks the cycle
//! `NeedEnter -> WaitForEnter -> NeedExit -> WaitForExit -> NeedEnter`,
//! placing and monitoring orders through the [`Exchange`] and recording
//! entries and exits in the trade ledger. Everything it touches for one tick
//! arrives through a [`TickContext`].

pub mod cache;
pub mod calculator;
pub mod order_tracker;
pub mod ratchet;
pub mod sanitize;
pub mod state;

pub use cache::OpenOrdersCache;
pub use calculator::{from_fn, FnPriceCalculator, MarketPrice, PriceCalculator};
pub use order_tracker::OrderStateTracker;
pub use ratchet::StopRatchet;
pub use sanitize::{entry_amount, sanitize_enter_amount};
pub use state::StrategyState;

use crate::error::{StrategyError, TradingError};
use crate::exchange::Exchange;
use crate::indicators::{IndicatorContext, Ledgers};
use crate::market::PriceTracker;
use serde::{Deserialize, Serialize};

/// How many ticks an order may misbehave before it is cancelled.
///
/// A counter triggers once it goes above its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RetryLimits {
    /// Entry fully open while the market moved away from it.
    pub enter_not_executed: u32,
    /// Entry partially filled.
    pub enter_partially_executed: u32,
    /// Exit open while the market is past its price.
    pub exit_crossed: u32,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            enter_not_executed: 3,
            enter_partially_executed: 10,
            exit_crossed: 3,
        }
    }
}

/// Per-tick inputs of the tracker.
pub struct TickContext<'a> {
    /// Logical tick counter, keys the open-orders cache.
    pub tick: u64,
    pub exchange: &'a dyn Exchange,
    pub prices: &'a PriceTracker,
    pub ledgers: &'a mut Ledgers,
    pub open_orders: &'a mut OpenOrdersCache,
}

impl<'a> TickContext<'a> {
    /// Index of the bar of this tick.
    pub fn index(&self) -> Result<usize, TradingError> {
        self.prices
            .last_index()
            .ok_or(TradingError::Strategy(StrategyError::NoMarketData))
    }

    /// Read-only view for price calculators.
    pub fn indicators(&self) -> IndicatorContext<'_> {
        IndicatorContext::new(self.prices.bars(), &*self.ledgers)
    }
}
