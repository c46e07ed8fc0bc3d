//! Exchange boundary.
//!
//! The core talks to a venue only through [`Exchange`]. Every call is
//! synchronous and may fail with a retryable network error or a fatal trading
//! API error; the core never retries internally.

pub mod error;
pub mod paper;

pub use error::ExchangeError;
pub use paper::PaperExchange;

use crate::domain::{Market, OpenOrder, OrderId, OrderType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-of-book snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub last: f64,
    pub ask: f64,
    pub bid: f64,
    pub timestamp: DateTime<Utc>,
}

pub trait Exchange {
    fn ticker(&self, market: &Market) -> Result<Ticker, ExchangeError>;

    fn open_orders(&self, market: &Market) -> Result<Vec<OpenOrder>, ExchangeError>;

    fn create_order(
        &self,
        market: &Market,
        order_type: OrderType,
        quantity: f64,
        price: f64,
    ) -> Result<OrderId, ExchangeError>;

    /// `Ok(false)` when the venue refused; the order may already be filled.
    fn cancel_order(&self, id: &OrderId, market: &Market) -> Result<bool, ExchangeError>;

    fn available_balance(&self, currency: &str) -> Result<f64, ExchangeError>;

    fn minimum_order_volume(&self, market: &Market) -> Result<f64, ExchangeError>;

    /// Fee as a fraction (0.001 = 0.1 %).
    fn buy_fee_percentage(&self, market: &Market) -> Result<f64, ExchangeError>;

    /// Fee as a fraction (0.001 = 0.1 %).
    fn sell_fee_percentage(&self, market: &Market) -> Result<f64, ExchangeError>;
}
