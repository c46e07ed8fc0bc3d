//! Lowest value of a source over a trailing lookback window.
//!
//! Lookback: `count - 1` (first valid value at index `count - 1`).

use super::price::ClosePrice;
use super::{Indicator, IndicatorContext};

#[derive(Debug, Clone)]
pub struct LowestValue<P = ClosePrice> {
    source: P,
    count: usize,
    name: String,
}

impl LowestValue<ClosePrice> {
    pub fn close(count: usize) -> Self {
        Self::new(ClosePrice, count)
    }
}

impl<P: Indicator<Output = f64>> LowestValue<P> {
    /// # Panics
    /// If `count` is zero.
    pub fn new(source: P, count: usize) -> Self {
        assert!(count >= 1, "lookback count must be >= 1");
        let name = format!("lowest_{}_{count}", source.name());
        Self {
            source,
            count,
            name,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl<P: Indicator<Output = f64>> Indicator for LowestValue<P> {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn value(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> f64 {
        if index + 1 < self.count || index >= ctx.bars.len() {
            return f64::NAN;
        }
        let mut lowest = f64::INFINITY;
        for i in (index + 1 - self.count)..=index {
            let v = self.source.value(ctx, i);
            if v.is_nan() {
                return f64::NAN;
            }
            lowest = lowest.min(v);
        }
        lowest
    }
}
