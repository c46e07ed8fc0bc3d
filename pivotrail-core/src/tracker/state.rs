use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of the order tracker. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyState {
    NeedEnter,
    WaitForEnter,
    NeedExit,
    WaitForExit,
}

impl StrategyState {
    /// Successor in the normal cycle.
    pub fn next(self) -> Self {
        match self {
            Self::NeedEnter => Self::WaitForEnter,
            Self::WaitForEnter => Self::NeedExit,
            Self::NeedExit => Self::WaitForExit,
            Self::WaitForExit => Self::NeedEnter,
        }
    }
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedEnter => write!(f, "NEED_ENTER"),
            Self::WaitForEnter => write!(f, "WAIT_FOR_ENTER"),
            Self::NeedExit => write!(f, "NEED_EXIT"),
            Self::WaitForExit => write!(f, "WAIT_FOR_EXIT"),
        }
    }
}
