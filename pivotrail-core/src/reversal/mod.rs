//! Confirmation-based pivot (reversal) detection.
//!
//! [`PivotDetector`] is the incremental state machine; [`ReversalIndicator`]
//! runs it over a [`BarSeries`](crate::domain::BarSeries) and answers
//! "value at the nearest confirmed pivot at or before this index".

pub mod detector;
pub mod indicator;

pub use detector::{Direction, Pivot, PivotDetector, PivotKind, SearchMode, CONFIRMATIONS};
pub use indicator::ReversalIndicator;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReversalError {
    #[error("high and low pivots confirmed simultaneously at bar {index}")]
    SimultaneousPivots { index: usize },
}
