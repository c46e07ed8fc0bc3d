//! Pivot detector state machine.
//!
//! Two trackers follow the running highest high and lowest low since the last
//! reversal. A candidate counts as its own first confirmation; every later bar
//! strictly worse than it adds one, an equal bar changes nothing and a
//! strictly better bar replaces it. A candidate with [`CONFIRMATIONS`] is
//! accepted as a pivot when the search mode allows its direction.
//!
//! Confirming a pivot snapshots the whole search state. If a later bar breaks
//! the most recent pivot before the opposite one is confirmed, that pivot is
//! reverted: the snapshot is restored and every bar seen since is folded back
//! in.

use super::ReversalError;
use serde::{Deserialize, Serialize};

/// Confirmations a candidate needs, itself included.
pub const CONFIRMATIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    pub fn opposite(self) -> Self {
        match self {
            PivotKind::High => PivotKind::Low,
            PivotKind::Low => PivotKind::High,
        }
    }

    /// Whether `a` is a more extreme value than `b` for this kind.
    pub fn is_beyond(self, a: f64, b: f64) -> bool {
        match self {
            PivotKind::High => a > b,
            PivotKind::Low => a < b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// No pivot yet; either direction may confirm.
    Both,
    /// Last pivot is a high.
    SearchingLow,
    /// Last pivot is a low.
    SearchingHigh,
}

impl SearchMode {
    fn accepts(self, kind: PivotKind) -> bool {
        matches!(
            (self, kind),
            (SearchMode::Both, _)
                | (SearchMode::SearchingHigh, PivotKind::High)
                | (SearchMode::SearchingLow, PivotKind::Low)
        )
    }

    fn after(kind: PivotKind) -> Self {
        match kind {
            PivotKind::High => SearchMode::SearchingLow,
            PivotKind::Low => SearchMode::SearchingHigh,
        }
    }
}

/// Order in which bars are fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    /// Position in processing order.
    position: usize,
    index: usize,
    value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ExtremeTracker {
    kind: PivotKind,
    candidate: Option<Candidate>,
    confirmations: usize,
}

impl ExtremeTracker {
    fn new(kind: PivotKind) -> Self {
        Self {
            kind,
            candidate: None,
            confirmations: 0,
        }
    }

    fn observe(&mut self, position: usize, index: usize, value: f64) {
        if value.is_nan() {
            return;
        }
        let fresh = Candidate {
            position,
            index,
            value,
        };
        match self.candidate {
            Some(current) if self.kind.is_beyond(current.value, value) => {
                self.confirmations += 1;
            }
            Some(current) if !self.kind.is_beyond(value, current.value) => {}
            _ => {
                self.candidate = Some(fresh);
                self.confirmations = 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Snapshot {
    mode: SearchMode,
    high: ExtremeTracker,
    low: ExtremeTracker,
}

/// A confirmed pivot.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub kind: PivotKind,
    /// Bar index of the pivot itself.
    pub index: usize,
    pub value: f64,
    /// Bar index at which it was confirmed.
    pub confirmed_index: usize,
    position: usize,
    confirmed_at: usize,
    before: Snapshot,
}

#[derive(Debug, Clone, Copy)]
struct Point {
    index: usize,
    high: f64,
    low: f64,
}

#[derive(Debug, Clone)]
pub struct PivotDetector {
    mode: SearchMode,
    high: ExtremeTracker,
    low: ExtremeTracker,
    pivots: Vec<Pivot>,
    points: Vec<Point>,
}

impl Default for PivotDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PivotDetector {
    pub fn new() -> Self {
        Self {
            mode: SearchMode::Both,
            high: ExtremeTracker::new(PivotKind::High),
            low: ExtremeTracker::new(PivotKind::Low),
            pivots: Vec::new(),
            points: Vec::new(),
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Confirmed pivots in confirmation order; kinds alternate.
    pub fn pivots(&self) -> &[Pivot] {
        &self.pivots
    }

    pub fn last_pivot(&self) -> Option<&Pivot> {
        self.pivots.last()
    }

    /// Number of bars fed so far.
    pub fn processed(&self) -> usize {
        self.points.len()
    }

    /// Confirmed pivot of `kind` with the greatest bar index `<= index`.
    pub fn pivot_at_or_before(&self, kind: PivotKind, index: usize) -> Option<&Pivot> {
        self.pivots
            .iter()
            .filter(|p| p.kind == kind && p.index <= index)
            .max_by_key(|p| p.index)
    }

    /// Feed one bar.
    pub fn push(&mut self, index: usize, high: f64, low: f64) -> Result<(), ReversalError> {
        let position = self.points.len();
        self.points.push(Point { index, high, low });
        self.high.observe(position, index, high);
        self.low.observe(position, index, low);

        loop {
            while self.revert_broken_pivot() {}

            let high_ready = self.mode.accepts(PivotKind::High)
                && self.high.confirmations >= CONFIRMATIONS;
            let low_ready =
                self.mode.accepts(PivotKind::Low) && self.low.confirmations >= CONFIRMATIONS;

            match (high_ready, low_ready) {
                (true, true) => return Err(ReversalError::SimultaneousPivots { index }),
                (true, false) => self.confirm(PivotKind::High, index),
                (false, true) => self.confirm(PivotKind::Low, index),
                (false, false) => return Ok(()),
            }
        }
    }

    fn tracker(&self, kind: PivotKind) -> &ExtremeTracker {
        match kind {
            PivotKind::High => &self.high,
            PivotKind::Low => &self.low,
        }
    }

    fn tracker_mut(&mut self, kind: PivotKind) -> &mut ExtremeTracker {
        match kind {
            PivotKind::High => &mut self.high,
            PivotKind::Low => &mut self.low,
        }
    }

    fn confirm(&mut self, kind: PivotKind, index: usize) {
        let Some(candidate) = self.tracker(kind).candidate else {
            return;
        };
        let before = Snapshot {
            mode: self.mode,
            high: self.high,
            low: self.low,
        };
        self.pivots.push(Pivot {
            kind,
            index: candidate.index,
            value: candidate.value,
            confirmed_index: index,
            position: candidate.position,
            confirmed_at: self.points.len() - 1,
            before,
        });
        self.mode = SearchMode::after(kind);

        let opposite = kind.opposite();
        let mut rebuilt = ExtremeTracker::new(opposite);
        for (offset, point) in self.points[candidate.position + 1..].iter().enumerate() {
            let value = match opposite {
                PivotKind::High => point.high,
                PivotKind::Low => point.low,
            };
            rebuilt.observe(candidate.position + 1 + offset, point.index, value);
        }
        *self.tracker_mut(opposite) = rebuilt;

        tracing::debug!(
            ?kind,
            pivot = candidate.index,
            confirmed = index,
            value = candidate.value,
            "pivot confirmed"
        );
    }

    /// Revert the latest pivot if the running extreme has moved beyond it.
    fn revert_broken_pivot(&mut self) -> bool {
        let kind = match self.mode {
            SearchMode::Both => return false,
            SearchMode::SearchingLow => PivotKind::High,
            SearchMode::SearchingHigh => PivotKind::Low,
        };
        let (Some(top), Some(candidate)) = (self.pivots.last(), self.tracker(kind).candidate)
        else {
            return false;
        };
        if top.kind != kind || !kind.is_beyond(candidate.value, top.value) {
            return false;
        }
        let Some(pivot) = self.pivots.pop() else {
            return false;
        };

        self.mode = pivot.before.mode;
        self.high = pivot.before.high;
        self.low = pivot.before.low;
        for position in pivot.confirmed_at + 1..self.points.len() {
            let point = self.points[position];
            self.high.observe(position, point.index, point.high);
            self.low.observe(position, point.index, point.low);
        }

        tracing::debug!(?kind, pivot = pivot.index, "pivot reverted");
        true
    }
}
