//! Market identity: one traded pair, base and counter currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single traded market, e.g. `BTC-EUR` (base `BTC`, counter `EUR`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub base: String,
    pub counter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("market id '{0}' is not of the form BASE-COUNTER")]
pub struct MarketParseError(pub String);

impl Market {
    pub fn new(base: impl Into<String>, counter: impl Into<String>) -> Self {
        let base = base.into();
        let counter = counter.into();
        Self {
            id: format!("{base}-{counter}"),
            base,
            counter,
        }
    }
}

impl FromStr for Market {
    type Err = MarketParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((base, counter)) if !base.is_empty() && !counter.is_empty() => {
                Ok(Self::new(base.to_uppercase(), counter.to_uppercase()))
            }
            _ => Err(MarketParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pair() {
        let market: Market = "btc-eur".parse().unwrap();
        assert_eq!(market.base, "BTC");
        assert_eq!(market.counter, "EUR");
        assert_eq!(market.id, "BTC-EUR");
    }

    #[test]
    fn rejects_missing_separator() {
        assert!("BTCEUR".parse::<Market>().is_err());
        assert!("-EUR".parse::<Market>().is_err());
    }
}
