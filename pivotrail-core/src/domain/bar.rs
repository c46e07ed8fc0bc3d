//! One OHLC price sample per strategy tick, and the append-only series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC sample covering `[start, end]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar ending at {end} precedes the last bar ending at {last_end}")]
    OutOfOrder {
        end: DateTime<Utc>,
        last_end: DateTime<Utc>,
    },

    #[error("bar starts at {start} after it ends at {end}")]
    InvertedSpan {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Append-only, time-ordered bar history. Index = position, 0-based.
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bar. Bars are immutable once appended.
    pub fn push(&mut self, bar: Bar) -> Result<usize, BarError> {
        if bar.start > bar.end {
            return Err(BarError::InvertedSpan {
                start: bar.start,
                end: bar.end,
            });
        }
        if let Some(last) = self.bars.last() {
            if bar.end < last.end {
                return Err(BarError::OutOfOrder {
                    end: bar.end,
                    last_end: last.end,
                });
            }
        }
        self.bars.push(bar);
        Ok(self.bars.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Index of the most recent bar, `None` while empty.
    pub fn last_index(&self) -> Option<usize> {
        self.bars.len().checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    /// Close at `index`, NaN when out of range.
    pub fn close(&self, index: usize) -> f64 {
        self.bars.get(index).map_or(f64::NAN, |b| b.close)
    }
}

/// Build a series from (high, low, close) triples, one minute apart. Test helper.
#[cfg(test)]
pub fn make_series(points: &[(f64, f64, f64)]) -> BarSeries {
    use chrono::TimeZone;
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut series = BarSeries::new();
    for (i, &(high, low, close)) in points.iter().enumerate() {
        let start = base + chrono::Duration::minutes(i as i64);
        series
            .push(Bar {
                start,
                end: start + chrono::Duration::seconds(59),
                open: close,
                high,
                low,
                close,
            })
            .unwrap();
    }
    series
}

/// Build a series where high = close + 1 and low = close - 1. Test helper.
#[cfg(test)]
pub fn make_close_series(closes: &[f64]) -> BarSeries {
    let points: Vec<_> = closes.iter().map(|&c| (c + 1.0, c - 1.0, c)).collect();
    make_series(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_at(minute: i64, close: f64) -> Bar {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
            + chrono::Duration::minutes(minute);
        Bar {
            start,
            end: start + chrono::Duration::seconds(59),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
        }
    }

    #[test]
    fn push_returns_index() {
        let mut series = BarSeries::new();
        assert_eq!(series.last_index(), None);
        assert_eq!(series.push(bar_at(0, 10.0)).unwrap(), 0);
        assert_eq!(series.push(bar_at(1, 11.0)).unwrap(), 1);
        assert_eq!(series.last_index(), Some(1));
        assert_eq!(series.close(1), 11.0);
        assert!(series.close(2).is_nan());
    }

    #[test]
    fn rejects_out_of_order_bar() {
        let mut series = BarSeries::new();
        series.push(bar_at(5, 10.0)).unwrap();
        let err = series.push(bar_at(4, 10.0)).unwrap_err();
        assert!(matches!(err, BarError::OutOfOrder { .. }));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn rejects_inverted_span() {
        let mut bar = bar_at(0, 10.0);
        std::mem::swap(&mut bar.start, &mut bar.end);
        let mut series = BarSeries::new();
        assert!(matches!(
            series.push(bar),
            Err(BarError::InvertedSpan { .. })
        ));
    }

    #[test]
    fn detects_void() {
        let mut bar = bar_at(0, 10.0);
        assert!(!bar.is_void());
        bar.low = f64::NAN;
        assert!(bar.is_void());
    }
}
