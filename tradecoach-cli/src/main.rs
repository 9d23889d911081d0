//! Trading coach CLI.
//!
//! `coach <SYMBOL> <ENTRY_PRICE> <ENTRY_DATE>` analyzes a single executed
//! trade: entry-timing efficiency against post-entry bars plus behavioral
//! anomalies against the user's stored history.
//!
//! Exit codes: 0 success, 2 validation error, 3 market-data error,
//! 4 store error, 1 anything else.

mod report;

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tradecoach_core::data::{MarketData, MockProvider, TigerProvider};
use tradecoach_core::domain::{BehavioralProfile, RECOGNIZED_HORIZONS};
use tradecoach_core::store::TradeStore;
use tradecoach_core::{CancelToken, Coach, CoachError, CoachRequest, MarketSource};

#[derive(Parser, Debug)]
#[command(
    name = "coach",
    version,
    about = "Analyze trade timing and behavioral patterns"
)]
struct Args {
    /// Stock symbol (e.g. AAPL, TSLA)
    symbol: String,

    /// Entry price of the trade
    entry_price: f64,

    /// Entry date in YYYY-MM-DD format
    entry_date: String,

    /// Position size in currency units (enables behavioral analysis)
    #[arg(short = 'p', long, requires = "stock_beta", requires = "sector")]
    position_size: Option<f64>,

    /// Stock beta
    #[arg(short = 'b', long, requires = "position_size", requires = "sector")]
    stock_beta: Option<f64>,

    /// Stock sector
    #[arg(short = 's', long, requires = "position_size", requires = "stock_beta")]
    sector: Option<String>,

    /// Days of post-entry history to analyze (7, 30 or 90)
    #[arg(short = 'H', long, default_value_t = 30)]
    horizon: u32,

    /// Use deterministic mock data instead of the Tiger API
    #[arg(long)]
    mock: bool,

    /// Analyze without persisting the trade
    #[arg(long)]
    no_save: bool,

    /// Report that the database schema was (re-)initialized
    #[arg(long)]
    init_db: bool,

    /// Database file path
    #[arg(long, default_value = "trading_coach.db")]
    db: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {e}");
            if matches!(e, CoachError::MarketData(_)) {
                eprintln!("hint: pass --mock to analyze against synthetic data");
            }
            std::process::exit(exit_code(&e));
        }
    }
}

fn run(args: Args) -> Result<(), CoachError> {
    let entry_date = NaiveDate::parse_from_str(&args.entry_date, "%Y-%m-%d").map_err(|_| {
        CoachError::InvalidInput(format!(
            "invalid date '{}': expected YYYY-MM-DD",
            args.entry_date
        ))
    })?;

    if !RECOGNIZED_HORIZONS.contains(&args.horizon) {
        warn!(
            horizon = args.horizon,
            "horizon is not one of 7/30/90; history display is unspecified"
        );
    }

    let store = TradeStore::open(&args.db)?;
    store.init()?;
    if args.init_db {
        println!("Database initialized at {}", args.db.display());
    }

    // With --mock the live slot is never reached, and building the Tiger
    // client would demand credentials the user may not have.
    let live: Box<dyn MarketData> = if args.mock {
        Box::new(MockProvider::with_base_price(args.entry_price))
    } else {
        Box::new(TigerProvider::from_env()?)
    };
    let mock = Box::new(MockProvider::with_base_price(args.entry_price));
    let coach = Coach::new(store, live, mock);

    let behavioral = match (args.position_size, args.stock_beta, args.sector) {
        (Some(position_size), Some(stock_beta), Some(sector)) => {
            Some(BehavioralProfile { position_size, stock_beta, sector })
        }
        _ => None,
    };

    let request = CoachRequest {
        symbol: args.symbol,
        entry_price: args.entry_price,
        entry_date,
        horizon: args.horizon,
        behavioral,
        source: if args.mock { MarketSource::Mock } else { MarketSource::Live },
        save: !args.no_save,
    };

    println!(
        "Analyzing {} @ ${} on {} ({} day horizon)...",
        request.symbol,
        report::currency(request.entry_price),
        request.entry_date,
        request.horizon
    );
    if args.mock {
        println!("Using mock market data (--mock)");
    }

    let result = coach.analyze(request, &CancelToken::new())?;

    if !result.persisted_analysis && result.trade_id > 0 {
        eprintln!("warning: trade #{} saved, but analysis rows were not persisted", result.trade_id);
    }

    println!("{}", report::render(&result));
    Ok(())
}

fn exit_code(error: &CoachError) -> i32 {
    match error {
        CoachError::InvalidInput(_) => 2,
        CoachError::MarketData(_) => 3,
        CoachError::Store(_) => 4,
        CoachError::Cancelled | CoachError::Internal(_) => 1,
    }
}
