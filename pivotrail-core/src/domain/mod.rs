//! Domain types for pivotrail

pub mod bar;
pub mod market;
pub mod order;

pub use bar::{Bar, BarError, BarSeries};
pub use market::{Market, MarketParseError};
pub use order::{ClosedTrade, MarketEnterType, OpenOrder, OrderId, OrderType, PlacedOrder};
