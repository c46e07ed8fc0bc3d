//! Per-index memoization wrapper.

use super::{Indicator, IndicatorContext};

/// Memoizes an indicator's values by index.
///
/// Values for indices strictly below the newest bar are computed once and
/// never again. The newest bar's value is recomputed on every read: the order
/// tracker may still record an entry or exit at that index during the current
/// tick. Once the series grows past it, the value is settled.
///
/// The cache belongs to one bar series; sharing it across series is a misuse.
#[derive(Debug, Clone)]
pub struct Cached<I: Indicator> {
    inner: I,
    memo: Vec<Option<I::Output>>,
}

impl<I: Indicator> Cached<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            memo: Vec::new(),
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    /// Mutable access to the wrapped indicator. Cached values are kept.
    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.inner
    }

    /// Number of settled (memoized) values.
    pub fn settled_count(&self) -> usize {
        self.memo.iter().filter(|v| v.is_some()).count()
    }
}

impl<I: Indicator> Indicator for Cached<I> {
    type Output = I::Output;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn value(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> Self::Output {
        if let Some(Some(cached)) = self.memo.get(index) {
            return *cached;
        }

        let value = self.inner.value(ctx, index);

        let settled = ctx.last_index().is_some_and(|last| index < last);
        if settled {
            if self.memo.len() <= index {
                self.memo.resize(index + 1, None);
            }
            self.memo[index] = Some(value);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::make_close_series;
    use crate::indicators::Ledgers;

    /// Counts how often it is asked to compute.
    struct Counting {
        calls: usize,
    }

    impl Indicator for Counting {
        type Output = f64;

        fn name(&self) -> &str {
            "counting"
        }

        fn value(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> f64 {
            self.calls += 1;
            ctx.bars.close(index)
        }
    }

    #[test]
    fn settled_values_are_computed_once() {
        let bars = make_close_series(&[1.0, 2.0, 3.0]);
        let ledgers = Ledgers::new();
        let ctx = IndicatorContext::new(&bars, &ledgers);
        let mut cached = Cached::new(Counting { calls: 0 });

        assert_eq!(cached.value(&ctx, 0), 1.0);
        assert_eq!(cached.value(&ctx, 0), 1.0);
        assert_eq!(cached.inner().calls, 1);
        assert_eq!(cached.settled_count(), 1);
    }

    #[test]
    fn newest_bar_is_recomputed() {
        let bars = make_close_series(&[1.0, 2.0, 3.0]);
        let ledgers = Ledgers::new();
        let ctx = IndicatorContext::new(&bars, &ledgers);
        let mut cached = Cached::new(Counting { calls: 0 });

        cached.value(&ctx, 2);
        cached.value(&ctx, 2);
        assert_eq!(cached.inner().calls, 2);
        assert_eq!(cached.settled_count(), 0);
    }

    #[test]
    fn value_settles_once_series_grows() {
        let short = make_close_series(&[1.0, 2.0]);
        let long = make_close_series(&[1.0, 2.0, 3.0]);
        let ledgers = Ledgers::new();
        let mut cached = Cached::new(Counting { calls: 0 });

        cached.value(&IndicatorContext::new(&short, &ledgers), 1);
        cached.value(&IndicatorContext::new(&long, &ledgers), 1);
        cached.value(&IndicatorContext::new(&long, &ledgers), 1);
        assert_eq!(cached.inner().calls, 2);
    }
}
