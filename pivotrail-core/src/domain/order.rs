//! Order-side value types: position direction, order kinds, placed and open orders.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a position. Determines fee and price sign conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketEnterType {
    LongPosition,
    ShortPosition,
}

impl MarketEnterType {
    /// Order type that opens a position of this direction.
    pub fn enter_order_type(self) -> OrderType {
        match self {
            Self::LongPosition => OrderType::Buy,
            Self::ShortPosition => OrderType::ShortEnter,
        }
    }

    /// Order type that closes a position of this direction.
    pub fn exit_order_type(self) -> OrderType {
        match self {
            Self::LongPosition => OrderType::Sell,
            Self::ShortPosition => OrderType::ShortExit,
        }
    }

    /// True when `candidate` is a strictly better exit price than `current`.
    pub fn is_better_exit(self, candidate: f64, current: f64) -> bool {
        match self {
            Self::LongPosition => candidate > current,
            Self::ShortPosition => candidate < current,
        }
    }
}

impl fmt::Display for MarketEnterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongPosition => write!(f, "LONG"),
            Self::ShortPosition => write!(f, "SHORT"),
        }
    }
}

/// Order kinds understood by the exchange abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Buy,
    Sell,
    ShortEnter,
    ShortExit,
}

impl OrderType {
    pub fn is_enter(self) -> bool {
        matches!(self, Self::Buy | Self::ShortEnter)
    }

    pub fn is_exit(self) -> bool {
        !self.is_enter()
    }

    /// Direction of the position this order opens or closes.
    pub fn enter_type(self) -> MarketEnterType {
        match self {
            Self::Buy | Self::Sell => MarketEnterType::LongPosition,
            Self::ShortEnter | Self::ShortExit => MarketEnterType::ShortPosition,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::ShortEnter => write!(f, "SHORT_ENTER"),
            Self::ShortExit => write!(f, "SHORT_EXIT"),
        }
    }
}

/// Exchange-assigned order ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// ID given to entry orders reconstructed on resume; never sent to an exchange.
    pub fn synthetic() -> Self {
        Self("synthetic-entry".to_string())
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An order this bot submitted (or adopted on resume).
///
/// Immutable: counter increments and amount replacement return a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: f64,
    /// Ticks the order sat fully open while the market had moved past it.
    pub not_executed_count: u32,
    /// Ticks the order sat partially filled.
    pub partially_executed_count: u32,
}

impl PlacedOrder {
    pub fn new(id: OrderId, order_type: OrderType, quantity: f64, price: f64) -> Self {
        Self {
            id,
            order_type,
            quantity,
            price,
            not_executed_count: 0,
            partially_executed_count: 0,
        }
    }

    pub fn with_not_executed_incremented(&self) -> Self {
        Self {
            not_executed_count: self.not_executed_count + 1,
            ..self.clone()
        }
    }

    pub fn with_partially_executed_incremented(&self) -> Self {
        Self {
            partially_executed_count: self.partially_executed_count + 1,
            ..self.clone()
        }
    }

    pub fn with_quantity(&self, quantity: f64) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    pub fn enter_type(&self) -> MarketEnterType {
        self.order_type.enter_type()
    }
}

/// An order as reported by the exchange's open-order list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: OrderId,
    pub order_type: OrderType,
    pub price: f64,
    /// Remaining (unfilled) quantity.
    pub quantity: f64,
    pub original_quantity: f64,
}

impl OpenOrder {
    pub fn is_partially_filled(&self) -> bool {
        self.quantity < self.original_quantity
    }

    pub fn filled_quantity(&self) -> f64 {
        (self.original_quantity - self.quantity).max(0.0)
    }
}

/// Result of a completed entry/exit round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub enter_type: MarketEnterType,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    /// Realized gain in counter currency, net of both fees.
    pub gain: f64,
}
