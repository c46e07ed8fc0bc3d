//! Pivotrail Core: decision core of a single-market trading bot.
//!
//! - Domain types (bars, markets, orders, closed trades)
//! - Trade-aware indicator framework: break-even, trailing stop, in-market
//! - Confirmation-based pivot detector with retroactive reversal
//! - Order lifecycle state tracker with resume, partial fills and a stop ratchet
//! - Exchange boundary and an in-memory paper exchange
//! - Strategy trait, per-tick control flow and the lowest-price-rebound strategy

pub mod config;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod market;
pub mod reversal;
pub mod strategy;
pub mod tracker;

pub use config::{ConfigError, StrategyConfig};
pub use error::{StrategyError, TradingError};
