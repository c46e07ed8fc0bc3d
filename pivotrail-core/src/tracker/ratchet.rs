//! Stop ratchet: a stop may tighten, never loosen.

use crate::domain::MarketEnterType;

/// Tracks the best stop level accepted so far for one position.
///
/// - Long: the level can only rise.
/// - Short: the level can only fall.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRatchet {
    enter_type: MarketEnterType,
    level: Option<f64>,
}

impl StopRatchet {
    pub fn new(enter_type: MarketEnterType) -> Self {
        Self {
            enter_type,
            level: None,
        }
    }

    pub fn with_level(enter_type: MarketEnterType, level: f64) -> Self {
        Self {
            enter_type,
            level: Some(level),
        }
    }

    /// True if `proposed` is finite and strictly better than the current level.
    pub fn improves(&self, proposed: f64) -> bool {
        if !proposed.is_finite() {
            return false;
        }
        match self.level {
            None => true,
            Some(level) => self.enter_type.is_better_exit(proposed, level),
        }
    }

    /// Apply a proposed level and return the ratcheted one.
    ///
    /// ```
    /// use pivotrail_core::domain::MarketEnterType;
    /// use pivotrail_core::tracker::StopRatchet;
    ///
    /// let mut ratchet = StopRatchet::with_level(MarketEnterType::LongPosition, 95.0);
    /// assert_eq!(ratchet.apply(100.0), 100.0);
    /// assert_eq!(ratchet.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        if self.improves(proposed) {
            self.level = Some(proposed);
        }
        self.level.unwrap_or(proposed)
    }

    /// Force the level, e.g. after a stop was replaced by a market order.
    pub fn reset(&mut self, level: f64) {
        self.level = Some(level);
    }

    pub fn level(&self) -> Option<f64> {
        self.level
    }

    pub fn enter_type(&self) -> MarketEnterType {
        self.enter_type
    }
}
