//! Pivotrail CLI: configuration check and ticker replay.
//!
//! Commands:
//! - `check-config`: parse and validate a strategy TOML file
//! - `replay`: feed a CSV of tickers through a paper exchange and the
//!   lowest-price-rebound strategy, printing every closed trade

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pivotrail_core::domain::{ClosedTrade, Market};
use pivotrail_core::exchange::{PaperExchange, Ticker};
use pivotrail_core::indicators::Fees;
use pivotrail_core::strategy::{LowestPriceRebound, TradingSession};
use pivotrail_core::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pivotrail",
    about = "Pivotrail: pivot entries and trailing-stop exits for one market"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a strategy config file.
    CheckConfig {
        /// Path to the strategy TOML file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Replay tickers from CSV (timestamp,last,ask,bid) against a paper exchange.
    Replay {
        /// Path to the strategy TOML file.
        #[arg(long)]
        config: PathBuf,

        /// CSV file with one ticker per row.
        #[arg(long)]
        bars: PathBuf,

        /// Market as BASE-COUNTER, e.g. BTC-EUR.
        #[arg(long)]
        market: String,

        /// Starting counter-currency balance.
        #[arg(long, default_value_t = 1000.0)]
        balance: f64,

        /// Fee per side as a fraction (0.001 = 0.1 %).
        #[arg(long, default_value_t = 0.001)]
        fee: f64,

        /// Minimum order volume in base currency.
        #[arg(long, default_value_t = 0.0001)]
        min_volume: f64,

        /// Where replayed tickers go when persist-ticker-data is set.
        #[arg(long, default_value = "ticker-data.csv")]
        ticker_log: PathBuf,

        /// Optional JSON report of closed trades and final balances.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// One CSV row.
#[derive(Debug, Serialize, Deserialize)]
struct TickerRow {
    timestamp: DateTime<Utc>,
    last: f64,
    ask: f64,
    bid: f64,
}

impl From<&TickerRow> for Ticker {
    fn from(row: &TickerRow) -> Self {
        Ticker {
            last: row.last,
            ask: row.ask,
            bid: row.bid,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplayReport<'a> {
    market: &'a str,
    ticks: u64,
    trades: &'a [ClosedTrade],
    total_gain: f64,
    counter_balance: f64,
    base_balance: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { config } => run_check_config(&config),
        Commands::Replay {
            config,
            bars,
            market,
            balance,
            fee,
            min_volume,
            ticker_log,
            output,
        } => {
            let options = ReplayOptions {
                balance,
                fee,
                min_volume,
                ticker_log,
                output,
            };
            run_replay(&config, &bars, &market, &options)
        }
    }
}

fn run_check_config(path: &Path) -> Result<()> {
    let config = StrategyConfig::from_file(path)
        .with_context(|| format!("invalid config {}", path.display()))?;

    println!("Config OK: {}", path.display());
    println!(
        "  balance to use:        {}%",
        config.percentage_of_counter_currency_balance_to_use
    );
    println!(
        "  emergency stop:        {}",
        config.configured_emergency_stop_balance
    );
    println!(
        "  stop below/above/min:  {}% / {}% / {}%",
        config.sell_stop_limit_percentage_below_break_even,
        config.sell_stop_limit_percentage_above_break_even,
        config.sell_stop_limit_percentage_minimum_above_break_even
    );
    println!(
        "  lookback / times above: {} / {}",
        config.lowest_price_lookback_count, config.times_above_lowest_price_needed
    );
    println!("  persist ticker data:   {}", config.persist_ticker_data);
    Ok(())
}

struct ReplayOptions {
    balance: f64,
    fee: f64,
    min_volume: f64,
    ticker_log: PathBuf,
    output: Option<PathBuf>,
}

fn run_replay(
    config_path: &Path,
    bars_path: &Path,
    market: &str,
    options: &ReplayOptions,
) -> Result<()> {
    let config = StrategyConfig::from_file(config_path)
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    let market: Market = market.parse()?;

    let exchange = PaperExchange::new(market.clone(), options.fee, options.min_volume)
        .with_balance(&market.counter, options.balance);
    let fees = Fees::new(options.fee, options.fee);
    let mut session = TradingSession::new(market.clone(), &config, |ledger| {
        LowestPriceRebound::new(&config, ledger, fees)
    });

    let mut reader = csv::Reader::from_path(bars_path)
        .with_context(|| format!("cannot open {}", bars_path.display()))?;
    let mut ticker_log = if config.persist_ticker_data {
        let writer = csv::Writer::from_path(&options.ticker_log)
            .with_context(|| format!("cannot create {}", options.ticker_log.display()))?;
        Some(writer)
    } else {
        None
    };

    info!(%market, bars = %bars_path.display(), "replay started");
    for (line, row) in reader.deserialize::<TickerRow>().enumerate() {
        let row = row.with_context(|| format!("bad ticker row {}", line + 2))?;
        if let Some(writer) = ticker_log.as_mut() {
            writer.serialize(&row)?;
        }
        exchange.set_ticker(Ticker::from(&row));

        match session.on_tick(&exchange) {
            Ok(Some(trade)) => print_trade(&trade),
            Ok(None) => {}
            Err(err) if err.is_retryable() => {
                warn!(%err, line = line + 2, "retryable error, continuing with next tick");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("fatal error at row {}", line + 2));
            }
        }
    }
    if let Some(mut writer) = ticker_log {
        writer.flush()?;
    }

    let trades = session.closed_trades();
    let report = ReplayReport {
        market: &market.id,
        ticks: session.tick_count(),
        trades,
        total_gain: trades.iter().map(|t| t.gain).sum(),
        counter_balance: exchange.balance(&market.counter),
        base_balance: exchange.balance(&market.base),
    };
    print_summary(&report, session.state());

    if let Some(path) = &options.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("cannot write {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn print_trade(trade: &ClosedTrade) {
    println!(
        "{:<6} entry {:>12.4} exit {:>12.4} qty {:>12.6} gain {:>+12.4}",
        trade.enter_type.to_string(),
        trade.entry_price,
        trade.exit_price,
        trade.quantity,
        trade.gain
    );
}

fn print_summary(
    report: &ReplayReport<'_>,
    state: Option<pivotrail_core::tracker::StrategyState>,
) {
    println!();
    println!("Market:          {}", report.market);
    println!("Ticks:           {}", report.ticks);
    println!("Closed trades:   {}", report.trades.len());
    println!("Total gain:      {:+.4}", report.total_gain);
    println!("Counter balance: {:.4}", report.counter_balance);
    println!("Base balance:    {:.8}", report.base_balance);
    match state {
        Some(state) => println!("Final state:     {state}"),
        None => println!("Final state:     (not resumed)"),
    }
}
