//! Error taxonomy of the decision core.
//!
//! Network failures are retryable and surface unchanged. Trading API errors
//! and strategy invariant violations are fatal. Balance insufficiency is not
//! an error at all.

use crate::domain::BarError;
use crate::exchange::ExchangeError;
use crate::indicators::LedgerError;
use crate::reversal::ReversalError;
use crate::tracker::StrategyState;
use thiserror::Error;

/// Invariant violations inside the core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("{operation} requires state {expected}, tracker is in {actual}")]
    WrongState {
        operation: &'static str,
        expected: StrategyState,
        actual: StrategyState,
    },

    #[error("an order is already held for this phase")]
    OrderAlreadyHeld,

    #[error("no order is held for this phase")]
    NoOrderHeld,

    #[error("cannot resume with {open_orders} open orders on the market")]
    AmbiguousResume { open_orders: usize },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("pivot detection error: {0}")]
    Reversal(#[from] ReversalError),

    #[error("bar error: {0}")]
    Bar(#[from] BarError),

    #[error("no market data received yet")]
    NoMarketData,
}

/// Everything a tick can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradingError {
    #[error("network error: {0}")]
    Network(String),

    #[error("trading API error: {0}")]
    TradingApi(String),

    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
}

impl TradingError {
    /// Only network errors may be retried on the next tick.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TradingError::Network(_))
    }
}

impl From<ExchangeError> for TradingError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Network(msg) => TradingError::Network(msg),
            ExchangeError::TradingApi(msg) => TradingError::TradingApi(msg),
        }
    }
}

impl From<LedgerError> for TradingError {
    fn from(err: LedgerError) -> Self {
        TradingError::Strategy(err.into())
    }
}

impl From<ReversalError> for TradingError {
    fn from(err: ReversalError) -> Self {
        TradingError::Strategy(err.into())
    }
}

impl From<BarError> for TradingError {
    fn from(err: BarError) -> Self {
        TradingError::Strategy(err.into())
    }
}
