//! Open-order list memoized per tick.

use crate::domain::{Market, OpenOrder, OrderId};
use crate::exchange::{Exchange, ExchangeError};
use std::collections::BTreeMap;

const DEFAULT_WINDOW: u64 = 2;

/// Keeps the open-order snapshot of the last `window` ticks.
#[derive(Debug, Clone)]
pub struct OpenOrdersCache {
    window: u64,
    by_tick: BTreeMap<u64, Vec<OpenOrder>>,
}

impl Default for OpenOrdersCache {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOrdersCache {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: u64) -> Self {
        Self {
            window: window.max(1),
            by_tick: BTreeMap::new(),
        }
    }

    /// Open orders at `tick`, fetched at most once per tick.
    pub fn get_or_fetch(
        &mut self,
        tick: u64,
        exchange: &dyn Exchange,
        market: &Market,
    ) -> Result<&[OpenOrder], ExchangeError> {
        if !self.by_tick.contains_key(&tick) {
            let orders = exchange.open_orders(market)?;
            self.by_tick.insert(tick, orders);
            let oldest_kept = tick.saturating_sub(self.window - 1);
            self.by_tick = self.by_tick.split_off(&oldest_kept);
        }
        Ok(self.by_tick.get(&tick).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Look up one order at `tick`; `None` means it is no longer open.
    pub fn find(
        &mut self,
        tick: u64,
        exchange: &dyn Exchange,
        market: &Market,
        id: &OrderId,
    ) -> Result<Option<OpenOrder>, ExchangeError> {
        let orders = self.get_or_fetch(tick, exchange, market)?;
        Ok(orders.iter().find(|o| &o.id == id).cloned())
    }

    /// Drop the snapshot of `tick` after the order book was changed.
    pub fn invalidate(&mut self, tick: u64) {
        self.by_tick.remove(&tick);
    }

    pub fn cached_ticks(&self) -> usize {
        self.by_tick.len()
    }
}
