//! Pivot value as an indicator.

use super::detector::{Direction, PivotDetector, PivotKind};
use super::ReversalError;
use crate::domain::BarSeries;
use crate::indicators::{Indicator, IndicatorContext};

/// Value at the nearest confirmed pivot of one kind at or before the index.
///
/// The detector state is kept across calls: a forward scan only feeds the bars
/// appended since the last sync, a backward scan is rerun whenever the series
/// has grown. The reported value is the pivot bar's high or low unless a
/// substitute source is set.
///
/// A detection failure is fatal: it is kept, every later `sync` returns it and
/// `value` reports NaN.
pub struct ReversalIndicator {
    kind: PivotKind,
    direction: Direction,
    detector: PivotDetector,
    synced_len: usize,
    failure: Option<ReversalError>,
    source: Option<Box<dyn Indicator<Output = f64> + Send>>,
    name: String,
}

impl std::fmt::Debug for ReversalIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReversalIndicator")
            .field("kind", &self.kind)
            .field("direction", &self.direction)
            .field("synced_len", &self.synced_len)
            .field("failure", &self.failure)
            .field("name", &self.name)
            .finish()
    }
}

impl ReversalIndicator {
    pub fn new(kind: PivotKind) -> Self {
        Self::with_direction(kind, Direction::Forward)
    }

    pub fn with_direction(kind: PivotKind, direction: Direction) -> Self {
        let name = match kind {
            PivotKind::High => "reversal_high",
            PivotKind::Low => "reversal_low",
        };
        Self {
            kind,
            direction,
            detector: PivotDetector::new(),
            synced_len: 0,
            failure: None,
            source: None,
            name: name.to_string(),
        }
    }

    /// Report `source` evaluated at the pivot index instead of the raw price.
    pub fn with_source(mut self, source: impl Indicator<Output = f64> + Send + 'static) -> Self {
        self.name = format!("{}_{}", self.name, source.name());
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> PivotKind {
        self.kind
    }

    pub fn detector(&self) -> &PivotDetector {
        &self.detector
    }

    /// The detection error that stopped this indicator, if any.
    pub fn failure(&self) -> Option<&ReversalError> {
        self.failure.as_ref()
    }

    /// Bring the detector up to date with `bars`.
    pub fn sync(&mut self, bars: &BarSeries) -> Result<(), ReversalError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let result = self.feed(bars);
        if let Err(err) = &result {
            self.failure = Some(err.clone());
        }
        result
    }

    fn feed(&mut self, bars: &BarSeries) -> Result<(), ReversalError> {
        if bars.len() == self.synced_len {
            return Ok(());
        }
        match self.direction {
            Direction::Forward => {
                if bars.len() < self.synced_len {
                    self.reset();
                }
                for (index, bar) in bars.as_slice().iter().enumerate().skip(self.synced_len) {
                    self.detector.push(index, bar.high, bar.low)?;
                    self.synced_len = index + 1;
                }
            }
            Direction::Backward => {
                self.reset();
                for (index, bar) in bars.as_slice().iter().enumerate().rev() {
                    self.detector.push(index, bar.high, bar.low)?;
                }
                self.synced_len = bars.len();
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.detector = PivotDetector::new();
        self.synced_len = 0;
    }
}

impl Indicator for ReversalIndicator {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn value(&mut self, ctx: &IndicatorContext<'_>, index: usize) -> f64 {
        if index >= ctx.bars.len() {
            return f64::NAN;
        }
        if self.sync(ctx.bars).is_err() {
            return f64::NAN;
        }
        let Some(pivot) = self.detector.pivot_at_or_before(self.kind, index) else {
            return f64::NAN;
        };
        let pivot_index = pivot.index;
        let raw = pivot.value;
        match self.source.as_mut() {
            Some(source) => source.value(ctx, pivot_index),
            None => raw,
        }
    }
}
