//! Strategy configuration, read from TOML.
//!
//! Every `*-percentage-*` key is a percentage (`2.5` = 2.5 %). Fees reported
//! by the exchange are fractions and never appear here.
//!
//! ```toml
//! percentage-of-counter-currency-balance-to-use = 50.0
//! configured-emergency-stop-balance = 5.0
//! sell-stop-limit-percentage-below-break-even = 5.0
//! sell-stop-limit-percentage-above-break-even = 2.0
//! sell-stop-limit-percentage-minimum-above-break-even = 1.0
//! lowest-price-lookback-count = 20
//! times-above-lowest-price-needed = 3
//! persist-ticker-data = false
//!
//! [retry-limits]
//! enter-not-executed = 3
//! ```

use crate::tracker::RetryLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{key} = {value} is outside {range}")]
    OutOfRange {
        key: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("lowest-price-lookback-count must be at least 1")]
    ZeroLookback,

    #[error(
        "times-above-lowest-price-needed ({needed}) exceeds lowest-price-lookback-count ({lookback})"
    )]
    TimesAboveExceedsLookback { needed: usize, lookback: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StrategyConfig {
    pub percentage_of_counter_currency_balance_to_use: f64,
    /// Counter-currency floor no entry may breach.
    pub configured_emergency_stop_balance: f64,
    pub sell_stop_limit_percentage_below_break_even: f64,
    pub sell_stop_limit_percentage_above_break_even: f64,
    pub sell_stop_limit_percentage_minimum_above_break_even: f64,
    pub lowest_price_lookback_count: usize,
    pub times_above_lowest_price_needed: usize,
    #[serde(default)]
    pub persist_ticker_data: bool,
    #[serde(default)]
    pub retry_limits: RetryLimits,
}

impl StrategyConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pct = self.percentage_of_counter_currency_balance_to_use;
        if !(pct > 0.0 && pct <= 100.0) {
            return Err(ConfigError::OutOfRange {
                key: "percentage-of-counter-currency-balance-to-use",
                value: pct,
                range: "(0, 100]",
            });
        }
        if !(self.configured_emergency_stop_balance >= 0.0) {
            return Err(ConfigError::OutOfRange {
                key: "configured-emergency-stop-balance",
                value: self.configured_emergency_stop_balance,
                range: "[0, inf)",
            });
        }
        for (key, value) in [
            (
                "sell-stop-limit-percentage-below-break-even",
                self.sell_stop_limit_percentage_below_break_even,
            ),
            (
                "sell-stop-limit-percentage-above-break-even",
                self.sell_stop_limit_percentage_above_break_even,
            ),
            (
                "sell-stop-limit-percentage-minimum-above-break-even",
                self.sell_stop_limit_percentage_minimum_above_break_even,
            ),
        ] {
            if !(0.0..100.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    key,
                    value,
                    range: "[0, 100)",
                });
            }
        }
        if self.lowest_price_lookback_count == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        if self.times_above_lowest_price_needed > self.lowest_price_lookback_count {
            return Err(ConfigError::TimesAboveExceedsLookback {
                needed: self.times_above_lowest_price_needed,
                lookback: self.lowest_price_lookback_count,
            });
        }
        Ok(())
    }

    /// A valid config with moderate values.
    pub fn example() -> Self {
        Self {
            percentage_of_counter_currency_balance_to_use: 50.0,
            configured_emergency_stop_balance: 5.0,
            sell_stop_limit_percentage_below_break_even: 5.0,
            sell_stop_limit_percentage_above_break_even: 2.0,
            sell_stop_limit_percentage_minimum_above_break_even: 1.0,
            lowest_price_lookback_count: 20,
            times_above_lowest_price_needed: 3,
            persist_ticker_data: false,
            retry_limits: RetryLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
percentage-of-counter-currency-balance-to-use = 25.0
configured-emergency-stop-balance = 10.0
sell-stop-limit-percentage-below-break-even = 4.0
sell-stop-limit-percentage-above-break-even = 1.5
sell-stop-limit-percentage-minimum-above-break-even = 0.5
lowest-price-lookback-count = 10
times-above-lowest-price-needed = 2
"#;

    #[test]
    fn parses_kebab_case_keys_with_defaults() {
        let config = StrategyConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.percentage_of_counter_currency_balance_to_use, 25.0);
        assert_eq!(config.lowest_price_lookback_count, 10);
        assert!(!config.persist_ticker_data);
        assert_eq!(config.retry_limits, RetryLimits::default());
    }

    #[test]
    fn partial_retry_limits_table() {
        let toml = format!("{MINIMAL}\n[retry-limits]\nexit-crossed = 7\n");
        let config = StrategyConfig::from_toml(&toml).unwrap();
        assert_eq!(config.retry_limits.exit_crossed, 7);
        assert_eq!(
            config.retry_limits.enter_not_executed,
            RetryLimits::default().enter_not_executed
        );
    }

    #[test]
    fn missing_key_is_rejected() {
        let toml = MINIMAL.replace("lowest-price-lookback-count = 10\n", "");
        assert!(matches!(
            StrategyConfig::from_toml(&toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let toml = format!("{MINIMAL}\nbogus-key = 1\n");
        assert!(StrategyConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn times_above_must_fit_lookback() {
        let mut config = StrategyConfig::example();
        config.times_above_lowest_price_needed = config.lowest_price_lookback_count + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimesAboveExceedsLookback { .. })
        ));
    }

    #[test]
    fn percentages_out_of_range() {
        let mut config = StrategyConfig::example();
        config.sell_stop_limit_percentage_below_break_even = 100.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));

        let mut config = StrategyConfig::example();
        config.percentage_of_counter_currency_balance_to_use = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn example_is_valid() {
        StrategyConfig::example().validate().unwrap();
    }
}
