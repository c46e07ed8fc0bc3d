//! Raw price indicators: close, high and low of each bar.

use super::{Indicator, IndicatorContext};

macro_rules! price_indicator {
    ($name:ident, $label:literal, $field:ident) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Indicator for $name {
            type Output = f64;

            fn name(&self) -> &str {
                $label
            }

            fn value(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> f64 {
                ctx.bars.get(index).map_or(f64::NAN, |bar| bar.$field)
            }
        }
    };
}

price_indicator!(ClosePrice, "close", close);
price_indicator!(HighPrice, "high", high);
price_indicator!(LowPrice, "low", low);
