//! Price tracker: turns one ticker per tick into one bar.

use crate::domain::{Bar, BarError, BarSeries, Market};
use crate::error::TradingError;
use crate::exchange::{Exchange, Ticker};

/// Owns the bar series of one market.
///
/// Each ticker becomes a bar with `open = close = last`, `high = ask` and
/// `low = bid`, spanning from the previous bar's end to the ticker time.
#[derive(Debug, Clone)]
pub struct PriceTracker {
    market: Market,
    bars: BarSeries,
    ticker: Option<Ticker>,
}

impl PriceTracker {
    pub fn new(market: Market) -> Self {
        Self {
            market,
            bars: BarSeries::new(),
            ticker: None,
        }
    }

    /// Query the ticker and append its bar. Returns the new bar index.
    pub fn update(&mut self, exchange: &dyn Exchange) -> Result<usize, TradingError> {
        let ticker = exchange.ticker(&self.market)?;
        Ok(self.record(ticker)?)
    }

    /// Append the bar for `ticker`. Returns the new bar index.
    pub fn record(&mut self, ticker: Ticker) -> Result<usize, BarError> {
        let start = match self.bars.last() {
            Some(prev) if prev.end <= ticker.timestamp => prev.end,
            _ => ticker.timestamp,
        };
        let index = self.bars.push(Bar {
            start,
            end: ticker.timestamp,
            open: ticker.last,
            high: ticker.ask,
            low: ticker.bid,
            close: ticker.last,
        })?;
        self.ticker = Some(ticker);
        Ok(index)
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn bars(&self) -> &BarSeries {
        &self.bars
    }

    pub fn ticker(&self) -> Option<&Ticker> {
        self.ticker.as_ref()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.ticker.map(|t| t.last)
    }

    pub fn ask(&self) -> Option<f64> {
        self.ticker.map(|t| t.ask)
    }

    pub fn bid(&self) -> Option<f64> {
        self.ticker.map(|t| t.bid)
    }

    /// Close of bar `index`, NaN when out of range.
    pub fn close(&self, index: usize) -> f64 {
        self.bars.close(index)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.bars.last_index()
    }
}
