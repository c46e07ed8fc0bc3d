use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    /// Transport failure; safe to call again next tick.
    #[error("network error: {0}")]
    Network(String),

    /// Venue rejected the request or answered with garbage.
    #[error("trading API error: {0}")]
    TradingApi(String),
}

impl ExchangeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExchangeError::Network(_))
    }
}
